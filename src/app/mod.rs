use anyhow::{Context, Result};
use clap::Parser;
use std::io::{BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};

use smoq::{CollisionPolicy, Document, QueryInput, TranslateOptions, Translator, TranslatorConfig};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Query expression (reads one query per stdin line when omitted)
    pub query: Option<String>,

    /// JSON or YAML file holding a query string, a clause list, or a list of clause lists
    #[arg(short, long, conflicts_with = "query")]
    pub input: Option<PathBuf>,

    /// Translator configuration file (YAML, JSON or TOML)
    #[arg(short, long, env = "SMOQ_CONFIG")]
    pub config: Option<PathBuf>,

    /// Policy for a field constrained twice in one 'and' group (overrides config)
    #[arg(long, value_enum)]
    pub collision: Option<CollisionPolicy>,

    /// Pretty-print the output document
    #[arg(short, long)]
    pub pretty: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

pub fn build_translator(cli: &Cli) -> Result<Translator> {
    let mut config = match &cli.config {
        Some(path) => TranslatorConfig::load(path)
            .with_context(|| format!("Config: Failed to load {}", path.display()))?,
        None => TranslatorConfig::default(),
    };
    if let Some(policy) = cli.collision {
        config.collision = policy;
    }

    tracing::info!(
        "Translator: collision policy {:?}, {} field aliases",
        config.collision,
        config.aliases.len()
    );
    Ok(Translator::new(TranslateOptions::from(&config)))
}

/// Read a query from a JSON or YAML file, chosen by extension.
pub fn load_input(path: &Path) -> Result<QueryInput> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Input: Failed to read {}", path.display()))?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let input = match ext.as_deref() {
        Some("yaml" | "yml") => serde_yaml::from_str(&text)
            .with_context(|| format!("Input: {} is not a valid YAML query", path.display()))?,
        _ => serde_json::from_str(&text)
            .with_context(|| format!("Input: {} is not a valid JSON query", path.display()))?,
    };
    Ok(input)
}

pub fn render(doc: &Document, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(doc)
    } else {
        serde_json::to_string(doc)
    }
    .context("Output: Failed to serialize document")?;
    Ok(json)
}

/// Translate queries read line by line until an empty line or EOF.
///
/// Errors are reported inline so one bad query does not end the session.
pub fn interactive<R: BufRead, W: Write>(
    translator: &Translator,
    pretty: bool,
    prompt: bool,
    input: R,
    mut out: W,
) -> Result<usize> {
    let mut translated = 0;
    let mut lines = input.lines();

    loop {
        if prompt {
            write!(out, "Enter query: ")?;
            out.flush()?;
        }
        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("CLI: Failed to read query from stdin")?;
        let query = line.trim();
        if query.is_empty() {
            break;
        }

        match translator.translate_query(&QueryInput::from(query)) {
            Ok(doc) => {
                writeln!(out, "{}", render(&doc, pretty)?)?;
                translated += 1;
            }
            Err(e) => writeln!(out, "error: {}", e)?,
        }
    }

    Ok(translated)
}

pub fn run(cli: &Cli) -> Result<()> {
    let translator = build_translator(cli)?;

    let input = match (&cli.query, &cli.input) {
        (Some(query), _) => QueryInput::from(query.as_str()),
        (None, Some(path)) => load_input(path)?,
        (None, None) => {
            let stdin = std::io::stdin();
            let prompt = stdin.is_terminal();
            let count = interactive(
                &translator,
                cli.pretty,
                prompt,
                stdin.lock(),
                std::io::stdout().lock(),
            )?;
            tracing::info!("Translated {} queries", count);
            return Ok(());
        }
    };

    let doc = translator
        .translate_query(&input)
        .context("CLI: Failed to translate query")?;
    println!("{}", render(&doc, cli.pretty)?);
    Ok(())
}

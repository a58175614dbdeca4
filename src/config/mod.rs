use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Translator settings, usually read from a YAML file.
///
/// ```yaml
/// collision: and_wrap
/// aliases:
///   temp: readings.temperature
/// ```
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct TranslatorConfig {
    #[serde(default)]
    pub collision: CollisionPolicy,
    /// Field name → field path substituted during translation
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

impl TranslatorConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

/// What an `and` group does when two operands constrain the same field
/// and their constraints cannot be combined into one operator map.
#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// The later operand replaces the earlier one.
    #[default]
    LastWins,
    /// Fail with a translation error.
    Error,
    /// Keep both by moving the later clause into `$and`.
    AndWrap,
}

//! Lexer/tokenizer for the query DSL.

use std::fmt;

use winnow::ascii::{digit0, digit1, multispace0};
use winnow::combinator::{alt, opt};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{any, one_of, take_till, take_while};

use super::ast::Relation;
use crate::error::LexError;

/// Token types for the DSL.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Field name, or a contextual word such as `exists` or `string`
    Ident(String),
    /// Symbolic comparison operator
    Op(Operator),
    /// Literal, still in its raw lexical form
    Literal(RawLiteral),
    /// Reserved word
    Keyword(Keyword),

    // Punctuation
    LParen, // (
    RParen, // )
    Comma,  // ,

    // End of input
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Rel(Relation),
    Match, // ~
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    And,
    Or,
    Not,
    Type,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawLiteral {
    Number(String),
    Str(String),
    True,
    False,
    Null,
}

/// A token and the byte offset where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(name) => write!(f, "identifier '{}'", name),
            Token::Op(Operator::Rel(rel)) => write!(f, "operator '{}'", rel),
            Token::Op(Operator::Match) => write!(f, "operator '~'"),
            Token::Literal(RawLiteral::Number(n)) => write!(f, "number {}", n),
            Token::Literal(RawLiteral::Str(s)) => write!(f, "string {:?}", s),
            Token::Literal(RawLiteral::True) => write!(f, "'true'"),
            Token::Literal(RawLiteral::False) => write!(f, "'false'"),
            Token::Literal(RawLiteral::Null) => write!(f, "'null'"),
            Token::Keyword(kw) => write!(f, "keyword '{}'", kw),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::Comma => write!(f, "','"),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            Keyword::And => "and",
            Keyword::Or => "or",
            Keyword::Not => "not",
            Keyword::Type => "type",
        };
        f.write_str(word)
    }
}

// Manually define PResult for resilience against winnow version changes
type PResult<T> = Result<T, ErrMode<ContextError>>;

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

/// Lex a word: identifier, keyword, or literal word.
/// Allowed: ASCII alphanumeric, underscore and dot (nested field access)
fn lex_word(input: &mut &str) -> PResult<Token> {
    let word = take_while(1.., is_ident_char).parse_next(input)?;

    let token = match word.to_ascii_lowercase().as_str() {
        "and" => Token::Keyword(Keyword::And),
        "or" => Token::Keyword(Keyword::Or),
        "not" => Token::Keyword(Keyword::Not),
        "type" => Token::Keyword(Keyword::Type),
        "true" => Token::Literal(RawLiteral::True),
        "false" => Token::Literal(RawLiteral::False),
        "null" => Token::Literal(RawLiteral::Null),
        _ => Token::Ident(word.to_string()),
    };
    Ok(token)
}

/// Lex a number: optional sign, digits with an optional decimal point
/// (`5`, `5.`, `.5`, `5.25`), optional exponent.
fn lex_number(input: &mut &str) -> PResult<Token> {
    let text = (
        opt(one_of(['+', '-'])),
        alt(((digit1, opt(('.', digit0))).void(), ('.', digit1).void())),
        opt((one_of(['e', 'E']), opt(one_of(['+', '-'])), digit1)),
    )
        .take()
        .parse_next(input)?;

    // `2nd` or `1.5.x` is a field name, not a number
    if input.starts_with(is_ident_char) {
        return Err(ErrMode::Backtrack(ContextError::new()));
    }
    Ok(Token::Literal(RawLiteral::Number(text.to_string())))
}

/// Lex a quoted string.
///
/// A backslash escapes the delimiter or another backslash; any other
/// backslash is kept as written so regex patterns pass through intact.
fn lex_string(input: &mut &str) -> PResult<Token> {
    let quote = one_of(['\'', '"']).parse_next(input)?;
    let mut value = String::new();

    loop {
        let chunk = take_till(0.., |c: char| c == quote || c == '\\').parse_next(input)?;
        value.push_str(chunk);

        match opt(any).parse_next(input)? {
            None => return Err(ErrMode::Cut(ContextError::new())),
            Some(c) if c == quote => return Ok(Token::Literal(RawLiteral::Str(value))),
            Some(_) => match opt(any).parse_next(input)? {
                None => return Err(ErrMode::Cut(ContextError::new())),
                Some(c) if c == quote || c == '\\' => value.push(c),
                Some(c) => {
                    value.push('\\');
                    value.push(c);
                }
            },
        }
    }
}

/// Lex a single token. Leading whitespace must already be consumed.
fn lex_token(input: &mut &str) -> PResult<Token> {
    if input.is_empty() {
        return Ok(Token::Eof);
    }

    alt((
        // Multi-char operators first
        "!=".value(Token::Op(Operator::Rel(Relation::Ne))),
        "<=".value(Token::Op(Operator::Rel(Relation::Lte))),
        ">=".value(Token::Op(Operator::Rel(Relation::Gte))),
        // Single-char operators
        "=".value(Token::Op(Operator::Rel(Relation::Eq))),
        "<".value(Token::Op(Operator::Rel(Relation::Lt))),
        ">".value(Token::Op(Operator::Rel(Relation::Gt))),
        "~".value(Token::Op(Operator::Match)),
        "(".value(Token::LParen),
        ")".value(Token::RParen),
        ",".value(Token::Comma),
        lex_string,
        // Number before word so signs and digits are claimed first
        lex_number,
        lex_word,
    ))
    .parse_next(input)
}

/// Tokenize the entire input. The result always ends with `Token::Eof`.
pub fn tokenize(input: &str) -> Result<Vec<Spanned>, LexError> {
    let mut remaining = input;
    let mut tokens = Vec::new();

    loop {
        let _ = multispace0::<_, ContextError>.parse_next(&mut remaining);
        let position = input.len() - remaining.len();

        match lex_token(&mut remaining) {
            Ok(Token::Eof) => {
                tokens.push(Spanned {
                    token: Token::Eof,
                    position,
                });
                break;
            }
            Ok(token) => tokens.push(Spanned { token, position }),
            Err(ErrMode::Cut(_)) => return Err(LexError::UnterminatedString { position }),
            Err(_) => {
                let found = input[position..].chars().next().unwrap_or_default();
                return Err(LexError::UnexpectedChar { position, found });
            }
        }
    }

    tracing::trace!("Tokenized {} tokens from {:?}", tokens.len(), input);
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    fn number(text: &str) -> Token {
        Token::Literal(RawLiteral::Number(text.into()))
    }

    #[test]
    fn test_simple_tokens() {
        assert_eq!(
            kinds("a > 0"),
            vec![
                Token::Ident("a".into()),
                Token::Op(Operator::Rel(Relation::Gt)),
                number("0"),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_operators_without_spaces() {
        assert_eq!(
            kinds("lanes>=2"),
            vec![
                Token::Ident("lanes".into()),
                Token::Op(Operator::Rel(Relation::Gte)),
                number("2"),
                Token::Eof,
            ]
        );
        assert_eq!(
            kinds("a!=-1.5e3"),
            vec![
                Token::Ident("a".into()),
                Token::Op(Operator::Rel(Relation::Ne)),
                number("-1.5e3"),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(
            kinds("NOT a = TRUE Or b type Null"),
            vec![
                Token::Keyword(Keyword::Not),
                Token::Ident("a".into()),
                Token::Op(Operator::Rel(Relation::Eq)),
                Token::Literal(RawLiteral::True),
                Token::Keyword(Keyword::Or),
                Token::Ident("b".into()),
                Token::Keyword(Keyword::Type),
                Token::Literal(RawLiteral::Null),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_decimal_point_is_optional_on_either_side() {
        assert_eq!(
            kinds("a > .5 and b < 5. and c = -.5e2"),
            vec![
                Token::Ident("a".into()),
                Token::Op(Operator::Rel(Relation::Gt)),
                number(".5"),
                Token::Keyword(Keyword::And),
                Token::Ident("b".into()),
                Token::Op(Operator::Rel(Relation::Lt)),
                number("5."),
                Token::Keyword(Keyword::And),
                Token::Ident("c".into()),
                Token::Op(Operator::Rel(Relation::Eq)),
                number("-.5e2"),
                Token::Eof,
            ]
        );
        assert_eq!(kinds("5.x"), vec![Token::Ident("5.x".into()), Token::Eof]);
    }

    #[test]
    fn test_dotted_field_and_digit_prefixed_word() {
        assert_eq!(
            kinds("address.city = 2nd"),
            vec![
                Token::Ident("address.city".into()),
                Token::Op(Operator::Rel(Relation::Eq)),
                Token::Ident("2nd".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#"a = 'it\'s' b = "say \"hi\"" c ~ '\d+\\'"#)
                .into_iter()
                .filter_map(|t| match t {
                    Token::Literal(RawLiteral::Str(s)) => Some(s),
                    _ => None,
                })
                .collect::<Vec<_>>(),
            vec!["it's".to_string(), "say \"hi\"".into(), "\\d+\\".into()]
        );
    }

    #[test]
    fn test_positions() {
        let tokens = tokenize("  ab  <= 'x'").unwrap();
        let positions: Vec<usize> = tokens.iter().map(|s| s.position).collect();
        assert_eq!(positions, vec![2, 6, 9, 12]);
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(
            tokenize("a = 'abc"),
            Err(LexError::UnterminatedString { position: 4 })
        );
        assert_eq!(
            tokenize(r#"a = "abc\"#),
            Err(LexError::UnterminatedString { position: 4 })
        );
    }

    #[test]
    fn test_unexpected_character() {
        assert_eq!(
            tokenize("!a"),
            Err(LexError::UnexpectedChar {
                position: 0,
                found: '!'
            })
        );
        assert_eq!(
            tokenize("a = 1 & b = 2"),
            Err(LexError::UnexpectedChar {
                position: 6,
                found: '&'
            })
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(kinds("   "), vec![Token::Eof]);
    }
}

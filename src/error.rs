//! Error types for tokenizing, parsing and translating query expressions.

use thiserror::Error;

/// Any failure produced while turning a query into a document.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Coercion(#[from] CoercionError),
    #[error(transparent)]
    Translation(#[from] TranslationError),
}

/// Tokenizer failures. Positions are byte offsets into the query string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unexpected character '{found}' at {position}")]
    UnexpectedChar { position: usize, found: char },
    #[error("unterminated string starting at {position}")]
    UnterminatedString { position: usize },
}

/// Grammar violation at a token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error at {position}: expected {expected}, found {found}")]
pub struct ParseError {
    pub position: usize,
    pub expected: String,
    pub found: String,
}

impl ParseError {
    pub fn new(position: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        ParseError {
            position,
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// A literal that does not fit the kind its operator requires.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    #[error("invalid type name '{found}' at {position} (expected one of: string, number, bool, null, array, object)")]
    InvalidTypeName { position: usize, found: String },
    #[error("integer literal '{text}' at {position} is out of range")]
    IntegerOutOfRange { position: usize, text: String },
    #[error("numeric literal '{text}' at {position} is not finite")]
    NonFiniteNumber { position: usize, text: String },
    #[error("field '{field}': operator '{op}' needs {expected}, got {found}")]
    ValueKind {
        field: String,
        op: String,
        expected: &'static str,
        found: String,
    },
}

/// Failures while emitting the output document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslationError {
    #[error("field '{field}' is constrained more than once in the same 'and' group")]
    FieldConflict { field: String },
    #[error("cannot combine $where clauses: only JavaScript expression strings can be joined")]
    WhereConflict,
    #[error("field '{field}' cannot be used in a $where expression")]
    UnsafeField { field: String },
    #[error("field '{field}': operator '{op}' cannot take a {kind} value")]
    InvalidOperand {
        field: String,
        op: String,
        kind: &'static str,
    },
}

pub type Result<T, E = QueryError> = std::result::Result<T, E>;

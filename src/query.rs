//! Accepted query inputs and the top-level translation entry point.

use serde::{Deserialize, Serialize};

use crate::Document;
use crate::dsl::{Expr, parse_clauses, parse_expression, parse_groups};
use crate::error::QueryError;
use crate::translate::Translator;

/// A query in one of its accepted shapes.
///
/// Deserializes from a JSON/YAML string, a list of clauses, or a list of
/// clause lists.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum QueryInput {
    /// `"a > 3 and b = 'x' or c type string"`
    Text(String),
    /// `[["a > 3", "b = 'x'"], ["c type string"]]`: groups ORed, clauses ANDed
    Groups(Vec<Vec<Clause>>),
    /// `["a > 3", {"tags": {"$all": ["x"]}}]`: all clauses ANDed
    Clauses(Vec<Clause>),
}

/// One element of list input.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Clause {
    /// Parsed with the DSL grammar
    Text(String),
    /// Pre-built document, passed through unchanged
    Fragment(Document),
}

impl QueryInput {
    /// Parse into an expression tree. Empty input yields `None`.
    pub fn parse(&self) -> Result<Option<Expr>, QueryError> {
        match self {
            QueryInput::Text(text) if text.trim().is_empty() => Ok(None),
            QueryInput::Text(text) => parse_expression(text).map(Some),
            QueryInput::Groups(groups) => parse_groups(groups),
            QueryInput::Clauses(clauses) => parse_clauses(clauses),
        }
    }
}

impl From<&str> for QueryInput {
    fn from(text: &str) -> Self {
        QueryInput::Text(text.to_string())
    }
}

impl From<String> for QueryInput {
    fn from(text: String) -> Self {
        QueryInput::Text(text)
    }
}

impl From<Vec<Clause>> for QueryInput {
    fn from(clauses: Vec<Clause>) -> Self {
        QueryInput::Clauses(clauses)
    }
}

impl From<Vec<Vec<Clause>>> for QueryInput {
    fn from(groups: Vec<Vec<Clause>>) -> Self {
        QueryInput::Groups(groups)
    }
}

impl From<&str> for Clause {
    fn from(text: &str) -> Self {
        Clause::Text(text.to_string())
    }
}

impl From<Document> for Clause {
    fn from(doc: Document) -> Self {
        Clause::Fragment(doc)
    }
}

/// Translate a query into a MongoDB filter document with default options.
///
/// ```
/// let doc = smoq::to_query_document("a > 0 and b = 'x'").unwrap();
/// assert_eq!(
///     serde_json::Value::Object(doc),
///     serde_json::json!({"a": {"$gt": 0}, "b": "x"})
/// );
/// ```
pub fn to_query_document(input: impl Into<QueryInput>) -> Result<Document, QueryError> {
    Translator::default().translate_query(&input.into())
}

//! Simple query DSL.
//!
//! Syntax:
//!   field = value           - equality (value: number, 'string', "string", true, false, null)
//!   field != value          - inequality
//!   field > n, field <= n   - numeric comparison (also >=, <)
//!   field ~ 'pattern'       - regular expression match
//!   field type name         - runtime type (string, number, bool, null, array, object)
//!   field exists true       - field presence
//!   field size n            - array length (also size>, size<, ...)
//!   expr1 and expr2         - AND
//!   expr1 or expr2          - OR (note: lower precedence than and)
//!   not expr                - NOT
//!   (expr)                  - grouping
//!
//! Field names may contain dots to address nested fields (`address.city`).

mod ast;
mod lexer;
mod literal;
mod parser;

pub use ast::*;
pub use lexer::{Keyword, Operator, RawLiteral, Spanned, Token, tokenize};
pub use literal::{coerce_literal, coerce_type_name};
pub use parser::{parse_clauses, parse_expression, parse_groups};

//! Coercion of raw literal tokens into typed values.
//!
//! The type of a literal is decided by its lexical form alone: quoted text is
//! always a string, even when it looks numeric.

use super::ast::{Literal, TypeName};
use super::lexer::{RawLiteral, Token};
use crate::error::CoercionError;

/// Convert a raw literal token into a typed [`Literal`].
pub fn coerce_literal(raw: &RawLiteral, position: usize) -> Result<Literal, CoercionError> {
    match raw {
        RawLiteral::Number(text) => coerce_number(text, position),
        RawLiteral::Str(s) => Ok(Literal::String(s.clone())),
        RawLiteral::True => Ok(Literal::Bool(true)),
        RawLiteral::False => Ok(Literal::Bool(false)),
        RawLiteral::Null => Ok(Literal::Null),
    }
}

fn coerce_number(text: &str, position: usize) -> Result<Literal, CoercionError> {
    let is_float = text.contains(['.', 'e', 'E']);

    if is_float {
        return match text.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(Literal::Float(n)),
            _ => Err(CoercionError::NonFiniteNumber {
                position,
                text: text.to_string(),
            }),
        };
    }

    text.parse::<i64>()
        .map(Literal::Int)
        .map_err(|_| CoercionError::IntegerOutOfRange {
            position,
            text: text.to_string(),
        })
}

/// Convert the token after `type` into a type name.
///
/// Bare words, `null` and quoted names are accepted; anything else is not a
/// type name.
pub fn coerce_type_name(token: &Token, position: usize) -> Result<Literal, CoercionError> {
    let name = match token {
        Token::Ident(word) => word.clone(),
        Token::Literal(RawLiteral::Str(s)) => s.clone(),
        Token::Literal(RawLiteral::Null) => "null".to_string(),
        other => other.to_string(),
    };

    TypeName::from_name(&name)
        .map(Literal::TypeName)
        .ok_or(CoercionError::InvalidTypeName {
            position,
            found: name,
        })
}

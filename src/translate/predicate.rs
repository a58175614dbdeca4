//! `$where` predicate rendering.
//!
//! Field names are never interpolated verbatim: each path segment must be a
//! JavaScript identifier (`.seg`) or an array index (`[n]`).

use crate::dsl::{Relation, TypeName};
use crate::error::TranslationError;

/// Render `a.b.0` as `this.a.b[0]`.
pub fn js_path(field: &str) -> Result<String, TranslationError> {
    let mut path = String::from("this");

    for segment in field.split('.') {
        if is_js_identifier(segment) {
            path.push('.');
            path.push_str(segment);
        } else if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
            path.push('[');
            path.push_str(segment);
            path.push(']');
        } else {
            return Err(TranslationError::UnsafeField {
                field: field.to_string(),
            });
        }
    }

    Ok(path)
}

fn is_js_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Runtime type check for `field type name`.
pub fn type_predicate(field: &str, ty: TypeName) -> Result<String, TranslationError> {
    let path = js_path(field)?;
    let predicate = match ty {
        TypeName::String => format!("typeof {path} == \"string\""),
        TypeName::Number => format!("typeof {path} == \"number\""),
        TypeName::Bool => format!("typeof {path} == \"boolean\""),
        TypeName::Object => format!("typeof {path} == \"object\""),
        // typeof reports "object" for both of these
        TypeName::Null => format!("{path} === null"),
        TypeName::Array => format!("Array.isArray({path})"),
    };
    Ok(predicate)
}

/// Array length comparison for `field size<op> n`.
pub fn size_predicate(field: &str, rel: Relation, size: i64) -> Result<String, TranslationError> {
    let path = js_path(field)?;
    Ok(format!("{path}.length {} {size}", rel.js_symbol()))
}

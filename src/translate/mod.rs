//! Translation of query expressions into MongoDB filter documents.
//!
//! | expression            | document                                   |
//! |-----------------------|--------------------------------------------|
//! | `a = 1`               | `{"a": 1}`                                 |
//! | `a > 1`               | `{"a": {"$gt": 1}}` (also `$gte $lt $lte $ne`) |
//! | `a ~ 'x'`             | `{"a": {"$regex": "x"}}`                   |
//! | `a exists true`       | `{"a": {"$exists": true}}`                 |
//! | `a size 2`            | `{"a": {"$size": 2}}`                      |
//! | `a size > 2`          | `{"$where": "this.a.length > 2"}`          |
//! | `a type string`       | `{"$where": "typeof this.a == \"string\""}`|
//! | `x and y`             | merged documents                           |
//! | `x or y`              | `{"$or": [x, y]}`                          |
//!
//! `not` is pushed down to the comparisons instead of being emitted.

mod merge;
mod predicate;

use serde_json::Value;
use std::collections::HashMap;

use crate::Document;
use crate::config::{CollisionPolicy, TranslatorConfig};
use crate::dsl::{Comparison, ComparisonOp, Expr, Literal, Relation};
use crate::error::{QueryError, TranslationError};
use crate::query::QueryInput;
use merge::AndMerger;

pub use predicate::{js_path, size_predicate, type_predicate};

/// Key of the raw JavaScript predicate clause.
pub const WHERE_KEY: &str = "$where";
pub const OR_KEY: &str = "$or";
pub const AND_KEY: &str = "$and";
pub const NOR_KEY: &str = "$nor";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslateOptions {
    pub collision: CollisionPolicy,
    /// Field name → field path substituted before emission
    pub aliases: HashMap<String, String>,
}

impl From<&TranslatorConfig> for TranslateOptions {
    fn from(config: &TranslatorConfig) -> Self {
        TranslateOptions {
            collision: config.collision,
            aliases: config.aliases.clone(),
        }
    }
}

/// Stateless translator; one instance can serve any number of queries.
#[derive(Debug, Clone, Default)]
pub struct Translator {
    options: TranslateOptions,
}

impl Translator {
    pub fn new(options: TranslateOptions) -> Self {
        Translator { options }
    }

    pub fn options(&self) -> &TranslateOptions {
        &self.options
    }

    /// Parse and translate a query. Empty input translates to `{}`.
    pub fn translate_query(&self, input: &QueryInput) -> Result<Document, QueryError> {
        let doc = match input.parse()? {
            Some(expr) => self.translate(&expr)?,
            None => Document::new(),
        };
        tracing::debug!("Translated {:?} into {} top-level keys", input, doc.len());
        Ok(doc)
    }

    /// Translate an expression tree.
    pub fn translate(&self, expr: &Expr) -> Result<Document, TranslationError> {
        self.emit(expr, false)
    }

    fn emit(&self, expr: &Expr, negated: bool) -> Result<Document, TranslationError> {
        match expr {
            Expr::Comparison(cmp) => self.emit_comparison(cmp, negated),
            Expr::Not(inner) => self.emit(inner, !negated),
            // De Morgan
            Expr::And(operands) if negated => self.emit_or(operands, true),
            Expr::And(operands) => self.emit_and(operands, false),
            Expr::Or(operands) if negated => self.emit_and(operands, true),
            Expr::Or(operands) => self.emit_or(operands, false),
            Expr::Fragment(doc) if negated => Ok(single(
                NOR_KEY.to_string(),
                Value::Array(vec![Value::Object(doc.clone())]),
            )),
            Expr::Fragment(doc) => Ok(doc.clone()),
        }
    }

    fn emit_and(&self, operands: &[Expr], negated: bool) -> Result<Document, TranslationError> {
        let mut merger = AndMerger::new(self.options.collision);
        for operand in operands {
            let doc = self.emit(operand, negated)?;
            match operand {
                Expr::Fragment(_) if !negated => merger.add_fragment(doc)?,
                _ => merger.add(doc)?,
            }
        }
        Ok(merger.finish())
    }

    fn emit_or(&self, operands: &[Expr], negated: bool) -> Result<Document, TranslationError> {
        let mut branches = Vec::with_capacity(operands.len());
        for operand in operands {
            let mut doc = self.emit(operand, negated)?;
            // a negated `and` inside an `or` yields a nested `$or`; splice it
            if doc.len() == 1 {
                if let Some(Value::Array(inner)) = doc.get_mut(OR_KEY) {
                    branches.append(inner);
                    continue;
                }
            }
            branches.push(Value::Object(doc));
        }
        Ok(single(OR_KEY.to_string(), Value::Array(branches)))
    }

    fn emit_comparison(
        &self,
        cmp: &Comparison,
        negated: bool,
    ) -> Result<Document, TranslationError> {
        let field = self.resolve(&cmp.field);

        match (cmp.op, &cmp.value) {
            (ComparisonOp::Type, Literal::TypeName(ty)) => {
                let clause = type_predicate(field, *ty)?;
                let clause = if negated { format!("!({clause})") } else { clause };
                Ok(single(WHERE_KEY.to_string(), Value::String(clause)))
            }
            (ComparisonOp::Exists, Literal::Bool(present)) => {
                Ok(field_op(field, "$exists", Value::Bool(*present != negated)))
            }
            (ComparisonOp::Regex, Literal::String(pattern)) => {
                let regex = Value::Object(single("$regex".to_string(), pattern.clone().into()));
                if negated {
                    Ok(field_op(field, "$not", regex))
                } else {
                    Ok(single(field.to_string(), regex))
                }
            }
            (ComparisonOp::Size(rel), Literal::Int(size)) => {
                let rel = if negated { rel.complement() } else { rel };
                match rel {
                    Relation::Eq => Ok(field_op(field, "$size", Value::from(*size))),
                    other => {
                        let clause = size_predicate(field, other, *size)?;
                        Ok(single(WHERE_KEY.to_string(), Value::String(clause)))
                    }
                }
            }
            (op, value) => match op.relation() {
                Some(rel) => {
                    let rel = if negated { rel.complement() } else { rel };
                    let value = literal_value(value);
                    match operator_key(rel) {
                        Some(key) => Ok(field_op(field, key, value)),
                        None => Ok(single(field.to_string(), value)),
                    }
                }
                None => Err(TranslationError::InvalidOperand {
                    field: cmp.field.clone(),
                    op: op.to_string(),
                    kind: value.kind(),
                }),
            },
        }
    }

    fn resolve<'a>(&'a self, field: &'a str) -> &'a str {
        self.options
            .aliases
            .get(field)
            .map(String::as_str)
            .unwrap_or(field)
    }
}

/// Structured operator for a relation; equality is implicit.
fn operator_key(rel: Relation) -> Option<&'static str> {
    match rel {
        Relation::Eq => None,
        Relation::Ne => Some("$ne"),
        Relation::Gt => Some("$gt"),
        Relation::Gte => Some("$gte"),
        Relation::Lt => Some("$lt"),
        Relation::Lte => Some("$lte"),
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Int(n) => Value::from(*n),
        Literal::Float(n) => Value::from(*n),
        Literal::String(s) => Value::String(s.clone()),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Null => Value::Null,
        Literal::TypeName(ty) => Value::String(ty.to_string()),
    }
}

pub(crate) fn single(key: String, value: Value) -> Document {
    let mut doc = Document::new();
    doc.insert(key, value);
    doc
}

fn field_op(field: &str, op: &str, value: Value) -> Document {
    single(
        field.to_string(),
        Value::Object(single(op.to_string(), value)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::{TypeName, parse_expression};
    use serde_json::json;

    fn translate(input: &str) -> Value {
        let expr = parse_expression(input).unwrap();
        Value::Object(Translator::default().translate(&expr).unwrap())
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(translate("a = 1"), json!({"a": 1}));
        assert_eq!(translate("a > 0"), json!({"a": {"$gt": 0}}));
        assert_eq!(translate("a >= 1.5"), json!({"a": {"$gte": 1.5}}));
        assert_eq!(translate("a < -2"), json!({"a": {"$lt": -2}}));
        assert_eq!(translate("a <= 3"), json!({"a": {"$lte": 3}}));
        assert_eq!(translate("a != 'x'"), json!({"a": {"$ne": "x"}}));
        assert_eq!(translate("a = null"), json!({"a": null}));
    }

    #[test]
    fn test_keyword_operators() {
        assert_eq!(
            translate("c type string"),
            json!({"$where": "typeof this.c == \"string\""})
        );
        assert_eq!(translate("t exists false"), json!({"t": {"$exists": false}}));
        assert_eq!(translate("t size 3"), json!({"t": {"$size": 3}}));
        assert_eq!(
            translate("t size < 3"),
            json!({"$where": "this.t.length < 3"})
        );
        assert_eq!(
            translate("name ~ '^foo|bar.*'"),
            json!({"name": {"$regex": "^foo|bar.*"}})
        );
    }

    #[test]
    fn test_negation() {
        assert_eq!(translate("not a = 1"), json!({"a": {"$ne": 1}}));
        assert_eq!(translate("not a != 1"), json!({"a": 1}));
        assert_eq!(translate("not a > 1"), json!({"a": {"$lte": 1}}));
        assert_eq!(translate("not a >= 1"), json!({"a": {"$lt": 1}}));
        assert_eq!(translate("not not a > 1"), json!({"a": {"$gt": 1}}));
        assert_eq!(
            translate("not c type number"),
            json!({"$where": "!(typeof this.c == \"number\")"})
        );
        assert_eq!(translate("not t exists true"), json!({"t": {"$exists": false}}));
        assert_eq!(
            translate("not n ~ 'x'"),
            json!({"n": {"$not": {"$regex": "x"}}})
        );
        assert_eq!(
            translate("not t size 2"),
            json!({"$where": "this.t.length != 2"})
        );
    }

    #[test]
    fn test_de_morgan() {
        assert_eq!(
            translate("not (a = 1 and b > 2)"),
            json!({"$or": [{"a": {"$ne": 1}}, {"b": {"$lte": 2}}]})
        );
        assert_eq!(
            translate("not (a = 1 or b > 2)"),
            json!({"a": {"$ne": 1}, "b": {"$lte": 2}})
        );
    }

    #[test]
    fn test_nested_or_is_spliced() {
        assert_eq!(
            translate("a = 1 or not (b = 2 and c = 3)"),
            json!({"$or": [{"a": 1}, {"b": {"$ne": 2}}, {"c": {"$ne": 3}}]})
        );
    }

    #[test]
    fn test_aliases() {
        let mut options = TranslateOptions::default();
        options
            .aliases
            .insert("temp".into(), "readings.temperature".into());
        let translator = Translator::new(options);

        let expr = parse_expression("temp > 20 and temp type number").unwrap();
        assert_eq!(
            Value::Object(translator.translate(&expr).unwrap()),
            json!({
                "readings.temperature": {"$gt": 20},
                "$where": "typeof this.readings.temperature == \"number\""
            })
        );
    }

    #[test]
    fn test_unsafe_field_in_where() {
        let expr = parse_expression("2nd type string").unwrap();
        assert_eq!(
            Translator::default().translate(&expr),
            Err(TranslationError::UnsafeField {
                field: "2nd".into()
            })
        );
    }

    #[test]
    fn test_mismatched_operand() {
        let expr = Expr::Comparison(Comparison {
            field: "a".into(),
            op: ComparisonOp::Type,
            value: Literal::Int(1),
        });
        assert!(matches!(
            Translator::default().translate(&expr),
            Err(TranslationError::InvalidOperand { .. })
        ));

        let expr = Expr::Comparison(Comparison {
            field: "a".into(),
            op: ComparisonOp::Eq,
            value: Literal::TypeName(TypeName::Array),
        });
        assert_eq!(
            Value::Object(Translator::default().translate(&expr).unwrap()),
            json!({"a": "array"})
        );
    }

    #[test]
    fn test_negated_fragment() {
        let expr = Expr::Not(Box::new(Expr::Fragment(single(
            "a".into(),
            json!({"$in": [1, 2]}),
        ))));
        assert_eq!(
            Value::Object(Translator::default().translate(&expr).unwrap()),
            json!({"$nor": [{"a": {"$in": [1, 2]}}]})
        );
    }
}

//! Merging of `and` operands into a single document.

use serde_json::Value;

use super::{AND_KEY, WHERE_KEY, single};
use crate::Document;
use crate::config::CollisionPolicy;
use crate::error::TranslationError;

/// Accumulates the documents of an `and` group.
pub(crate) struct AndMerger {
    policy: CollisionPolicy,
    doc: Document,
    /// Clauses that could not share a key with an earlier one
    deferred: Vec<Value>,
    /// The pending `$where` came verbatim from a document fragment
    raw_where: bool,
}

impl AndMerger {
    pub(crate) fn new(policy: CollisionPolicy) -> Self {
        AndMerger {
            policy,
            doc: Document::new(),
            deferred: Vec::new(),
            raw_where: false,
        }
    }

    /// Add a clause built by the translator.
    pub(crate) fn add(&mut self, clause: Document) -> Result<(), TranslationError> {
        self.add_clause(clause, false)
    }

    /// Add a caller-supplied document; its `$where` is treated as opaque.
    pub(crate) fn add_fragment(&mut self, clause: Document) -> Result<(), TranslationError> {
        self.add_clause(clause, true)
    }

    fn add_clause(&mut self, clause: Document, raw: bool) -> Result<(), TranslationError> {
        for (key, value) in clause {
            self.add_entry(key, value, raw)?;
        }
        Ok(())
    }

    fn add_entry(&mut self, key: String, value: Value, raw: bool) -> Result<(), TranslationError> {
        let Some(existing) = self.doc.get_mut(&key) else {
            if key == WHERE_KEY {
                self.raw_where = raw;
            }
            self.doc.insert(key, value);
            return Ok(());
        };

        if key == WHERE_KEY {
            let left = Predicate {
                value: existing,
                raw: self.raw_where,
            };
            let right = Predicate { value: &value, raw };
            *existing = Value::String(conjoin_where(left, right)?);
            self.raw_where = false;
            return Ok(());
        }

        if key.starts_with('$') {
            // logical operators never overwrite each other
            self.deferred.push(Value::Object(single(key, value)));
            return Ok(());
        }

        if let Some(union) = union_operator_maps(existing, &value) {
            *existing = union;
            return Ok(());
        }

        match self.policy {
            CollisionPolicy::LastWins => {
                tracing::debug!("Field '{}' constrained twice; keeping the later constraint", key);
                *existing = value;
            }
            CollisionPolicy::Error => return Err(TranslationError::FieldConflict { field: key }),
            CollisionPolicy::AndWrap => self.deferred.push(Value::Object(single(key, value))),
        }
        Ok(())
    }

    pub(crate) fn finish(self) -> Document {
        let AndMerger {
            mut doc, deferred, ..
        } = self;

        if deferred.is_empty() {
            return doc;
        }

        let mut items = match doc.shift_remove(AND_KEY) {
            Some(Value::Array(items)) => items,
            Some(other) => vec![Value::Object(single(AND_KEY.to_string(), other))],
            None => Vec::new(),
        };
        items.extend(deferred);
        doc.insert(AND_KEY.to_string(), Value::Array(items));
        doc
    }
}

/// One side of a `$where` conjunction.
struct Predicate<'a> {
    value: &'a Value,
    /// Arbitrary JavaScript rather than a predicate built by the translator
    raw: bool,
}

/// Join two `$where` predicates with `&&`.
///
/// Only expression strings can be joined; function bodies and non-string
/// values are rejected.
fn conjoin_where(left: Predicate<'_>, right: Predicate<'_>) -> Result<String, TranslationError> {
    let (Value::String(l), Value::String(r)) = (left.value, right.value) else {
        return Err(TranslationError::WhereConflict);
    };
    if is_function(l) || is_function(r) {
        return Err(TranslationError::WhereConflict);
    }
    Ok(format!("{} && {}", guard(l, left.raw), guard(r, right.raw)))
}

fn is_function(predicate: &str) -> bool {
    predicate
        .trim_start()
        .strip_prefix("function")
        .is_some_and(|rest| !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_' || c == '$'))
}

/// Parenthesize anything that could bind looser than `&&`.
fn guard(predicate: &str, raw: bool) -> String {
    if raw || predicate.contains("||") {
        format!("({predicate})")
    } else {
        predicate.to_string()
    }
}

/// Union of two operator maps (`{"$gt": 1}` and `{"$lt": 5}`) when their
/// operators are disjoint.
fn union_operator_maps(existing: &Value, incoming: &Value) -> Option<Value> {
    let (Value::Object(left), Value::Object(right)) = (existing, incoming) else {
        return None;
    };

    let is_operator_map = |map: &Document| !map.is_empty() && map.keys().all(|k| k.starts_with('$'));
    if !is_operator_map(left) || !is_operator_map(right) {
        return None;
    }
    if right.keys().any(|k| left.contains_key(k)) {
        return None;
    }

    let mut union = left.clone();
    union.extend(right.clone());
    Some(Value::Object(union))
}

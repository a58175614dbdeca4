//! smoq - simple MongoDB queries
//!
//! Translates human-readable filter expressions into MongoDB filter documents.
//!
//! ```
//! use serde_json::json;
//!
//! let doc = smoq::to_query_document("a > 3 and b = 'hello' or c type int").unwrap();
//! assert_eq!(
//!     serde_json::Value::Object(doc),
//!     json!({"$or": [
//!         {"a": {"$gt": 3}, "b": "hello"},
//!         {"$where": "typeof this.c == \"number\""}
//!     ]})
//! );
//! ```
//!
//! List input ANDs its items; a list of lists ORs the groups. Items that are
//! already documents are passed through unchanged:
//!
//! ```
//! use serde_json::json;
//! use smoq::{Clause, QueryInput};
//!
//! let input: QueryInput = serde_json::from_value(json!([
//!     "a > 3",
//!     {"tags": {"$all": ["x", "y"]}},
//! ])).unwrap();
//! let doc = smoq::to_query_document(input).unwrap();
//! assert_eq!(
//!     serde_json::Value::Object(doc),
//!     json!({"a": {"$gt": 3}, "tags": {"$all": ["x", "y"]}})
//! );
//! # let _ = Clause::from("a = 1");
//! ```

pub mod config;
pub mod dsl;
pub mod error;
pub mod query;
pub mod translate;

/// A MongoDB filter document, keys in insertion order.
pub type Document = serde_json::Map<String, serde_json::Value>;

pub use config::{CollisionPolicy, TranslatorConfig};
pub use error::{CoercionError, LexError, ParseError, QueryError, TranslationError};
pub use query::{Clause, QueryInput, to_query_document};
pub use translate::{TranslateOptions, Translator};

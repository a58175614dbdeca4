//! AST types for the query DSL.

use std::fmt;

use crate::Document;

/// Root query expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Single constraint: `a > 3`, `name = "x"`, `tags type array`
    Comparison(Comparison),

    /// Boolean AND: `expr1 and expr2`
    And(Vec<Expr>),

    /// Boolean OR: `expr1 or expr2`
    Or(Vec<Expr>),

    /// Boolean NOT: `not expr`
    Not(Box<Expr>),

    /// Pre-built document from list input, emitted as-is.
    Fragment(Document),
}

/// `field op value`
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub field: String,
    pub op: ComparisonOp,
    pub value: Literal,
}

/// Comparison operator of a single constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// `type`: runtime type check
    Type,
    /// `exists`: field presence
    Exists,
    /// `~`: regular expression match
    Regex,
    /// `size`, `size >`, ...: array length
    Size(Relation),
}

/// Plain relational operator, also used as the suffix of `size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Eq, // =
    Ne, // !=
    Gt, // >
    Gte, // >=
    Lt, // <
    Lte, // <=
}

impl Relation {
    /// The relation that holds exactly when `self` does not.
    pub fn complement(self) -> Self {
        match self {
            Relation::Eq => Relation::Ne,
            Relation::Ne => Relation::Eq,
            Relation::Gt => Relation::Lte,
            Relation::Gte => Relation::Lt,
            Relation::Lt => Relation::Gte,
            Relation::Lte => Relation::Gt,
        }
    }

    /// Spelling inside a `$where` JavaScript predicate.
    pub fn js_symbol(self) -> &'static str {
        match self {
            Relation::Eq => "==",
            Relation::Ne => "!=",
            Relation::Gt => ">",
            Relation::Gte => ">=",
            Relation::Lt => "<",
            Relation::Lte => "<=",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::Eq => write!(f, "="),
            other => write!(f, "{}", other.js_symbol()),
        }
    }
}

impl From<Relation> for ComparisonOp {
    fn from(rel: Relation) -> Self {
        match rel {
            Relation::Eq => ComparisonOp::Eq,
            Relation::Ne => ComparisonOp::Ne,
            Relation::Gt => ComparisonOp::Gt,
            Relation::Gte => ComparisonOp::Gte,
            Relation::Lt => ComparisonOp::Lt,
            Relation::Lte => ComparisonOp::Lte,
        }
    }
}

impl ComparisonOp {
    /// The relational view of a plain comparison, `None` for the keyword operators.
    pub fn relation(self) -> Option<Relation> {
        match self {
            ComparisonOp::Eq => Some(Relation::Eq),
            ComparisonOp::Ne => Some(Relation::Ne),
            ComparisonOp::Gt => Some(Relation::Gt),
            ComparisonOp::Gte => Some(Relation::Gte),
            ComparisonOp::Lt => Some(Relation::Lt),
            ComparisonOp::Lte => Some(Relation::Lte),
            _ => None,
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonOp::Type => write!(f, "type"),
            ComparisonOp::Exists => write!(f, "exists"),
            ComparisonOp::Regex => write!(f, "~"),
            ComparisonOp::Size(Relation::Eq) => write!(f, "size"),
            ComparisonOp::Size(rel) => write!(f, "size{}", rel),
            plain => match plain.relation() {
                Some(rel) => write!(f, "{}", rel),
                None => Ok(()),
            },
        }
    }
}

/// Typed right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Null,
    TypeName(TypeName),
}

impl Literal {
    /// Short description of the literal's kind, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Literal::Int(_) => "integer",
            Literal::Float(_) => "float",
            Literal::String(_) => "string",
            Literal::Bool(_) => "boolean",
            Literal::Null => "null",
            Literal::TypeName(_) => "type name",
        }
    }
}

/// Type names accepted on the right of `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeName {
    String,
    Number,
    Bool,
    Null,
    Array,
    Object,
}

impl TypeName {
    /// Resolve a DSL spelling, case-insensitively, including the legacy aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        let ty = match name.as_str() {
            "string" | "str" => TypeName::String,
            "number" | "int" | "integer" | "float" => TypeName::Number,
            "bool" | "boolean" => TypeName::Bool,
            "null" => TypeName::Null,
            "array" => TypeName::Array,
            "object" => TypeName::Object,
            _ => return None,
        };
        Some(ty)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeName::String => "string",
            TypeName::Number => "number",
            TypeName::Bool => "bool",
            TypeName::Null => "null",
            TypeName::Array => "array",
            TypeName::Object => "object",
        };
        f.write_str(name)
    }
}

impl Expr {
    /// Flatten nested And/Or and collapse single-operand groups.
    pub fn simplify(self) -> Self {
        match self {
            Expr::And(exprs) => {
                let mut flat = Vec::new();
                for expr in exprs {
                    match expr.simplify() {
                        Expr::And(inner) => flat.extend(inner),
                        other => flat.push(other),
                    }
                }
                collapse(flat, Expr::And)
            }
            Expr::Or(exprs) => {
                let mut flat = Vec::new();
                for expr in exprs {
                    match expr.simplify() {
                        Expr::Or(inner) => flat.extend(inner),
                        other => flat.push(other),
                    }
                }
                collapse(flat, Expr::Or)
            }
            Expr::Not(inner) => Expr::Not(Box::new(inner.simplify())),
            other => other,
        }
    }
}

fn collapse(mut exprs: Vec<Expr>, group: fn(Vec<Expr>) -> Expr) -> Expr {
    if exprs.len() == 1 {
        if let Some(only) = exprs.pop() {
            return only;
        }
    }
    group(exprs)
}

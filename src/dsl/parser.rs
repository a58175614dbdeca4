//! Parser for the query DSL.
//!
//! Grammar (in rough EBNF):
//!
//! query      = or_expr
//! or_expr    = and_expr ("or" and_expr)*
//! and_expr   = unary_expr ("and" unary_expr)*
//! unary_expr = "not" unary_expr | primary
//! primary    = "(" query ")" | comparison
//! comparison = IDENT compare_op literal
//!            | IDENT "type" TYPENAME
//!            | IDENT "~" STRING
//!            | IDENT "exists" BOOL
//!            | IDENT "size" compare_op? INT
//! compare_op = "=" | "!=" | "<" | "<=" | ">" | ">="
//! literal    = NUMBER | STRING | "true" | "false" | "null"

use super::ast::{Comparison, ComparisonOp, Expr, Literal, Relation};
use super::lexer::{Keyword, Operator, Spanned, Token, tokenize};
use super::literal::{coerce_literal, coerce_type_name};
use crate::error::{CoercionError, ParseError, QueryError};
use crate::query::Clause;

static EOF: Spanned = Spanned {
    token: Token::Eof,
    position: 0,
};

/// Maximum nesting of parentheses and `not`.
const MAX_DEPTH: usize = 128;

/// Parser state.
struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Spanned>) -> Self {
        Parser {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> &Spanned {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .unwrap_or(&EOF)
    }

    fn peek_token(&self) -> &Token {
        &self.peek().token
    }

    fn advance(&mut self) -> Spanned {
        let tok = self.peek().clone();
        self.pos += 1;
        tok
    }

    fn error(&self, expected: &str) -> QueryError {
        let next = self.peek();
        ParseError::new(next.position, expected, next.token.to_string()).into()
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), QueryError> {
        if *self.peek_token() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.error(what))
        }
    }

    fn enter(&mut self) -> Result<(), QueryError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error(&format!("nesting depth <= {}", MAX_DEPTH)));
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Parse the top-level query expression.
    fn parse_query(&mut self) -> Result<Expr, QueryError> {
        self.parse_or_expr()
    }

    /// Parse OR expression: and_expr ("or" and_expr)*
    fn parse_or_expr(&mut self) -> Result<Expr, QueryError> {
        let mut operands = vec![self.parse_and_expr()?];

        while matches!(self.peek_token(), Token::Keyword(Keyword::Or)) {
            self.advance(); // consume or
            operands.push(self.parse_and_expr()?);
        }

        Ok(Expr::Or(operands).simplify())
    }

    /// Parse AND expression: unary_expr ("and" unary_expr)*
    fn parse_and_expr(&mut self) -> Result<Expr, QueryError> {
        let mut operands = vec![self.parse_unary_expr()?];

        while matches!(self.peek_token(), Token::Keyword(Keyword::And)) {
            self.advance(); // consume and
            operands.push(self.parse_unary_expr()?);
        }

        Ok(Expr::And(operands).simplify())
    }

    /// Parse unary expression: "not" unary_expr | primary
    fn parse_unary_expr(&mut self) -> Result<Expr, QueryError> {
        if matches!(self.peek_token(), Token::Keyword(Keyword::Not)) {
            self.enter()?;
            self.advance(); // consume not
            let inner = self.parse_unary_expr()?;
            self.leave();
            Ok(Expr::Not(Box::new(inner)))
        } else {
            self.parse_primary()
        }
    }

    /// Parse primary expression: "(" query ")" | comparison
    fn parse_primary(&mut self) -> Result<Expr, QueryError> {
        match self.peek_token() {
            Token::LParen => {
                self.enter()?;
                self.advance(); // consume (
                let inner = self.parse_query()?;
                self.expect(Token::RParen, "')'")?;
                self.leave();
                Ok(inner)
            }
            Token::Ident(_) => self.parse_comparison(),
            Token::Comma => Err(self.error("a comparison (',' is only valid between list items)")),
            _ => Err(self.error("field name, 'not' or '('")),
        }
    }

    /// Parse a single constraint: IDENT operator value
    fn parse_comparison(&mut self) -> Result<Expr, QueryError> {
        let start = self.advance();
        let field = match start.token {
            Token::Ident(field) => field,
            other => {
                return Err(ParseError::new(start.position, "field name", other.to_string()).into());
            }
        };
        validate_field_path(&field, start.position)?;

        let op = match self.peek_token().clone() {
            Token::Op(Operator::Rel(rel)) => {
                self.advance();
                ComparisonOp::from(rel)
            }
            Token::Op(Operator::Match) => {
                self.advance();
                ComparisonOp::Regex
            }
            Token::Keyword(Keyword::Type) => {
                self.advance();
                return self.parse_type_name(field);
            }
            Token::Ident(word) if word.eq_ignore_ascii_case("exists") => {
                self.advance();
                ComparisonOp::Exists
            }
            Token::Ident(word) if word.eq_ignore_ascii_case("size") => {
                self.advance();
                self.parse_size_relation()?
            }
            _ => return Err(self.error("comparison operator")),
        };

        let value = self.parse_literal()?;
        Ok(Expr::Comparison(build_comparison(field, op, value)?))
    }

    fn parse_size_relation(&mut self) -> Result<ComparisonOp, QueryError> {
        match self.peek_token() {
            Token::Op(Operator::Rel(rel)) => {
                let rel = *rel;
                self.advance();
                Ok(ComparisonOp::Size(rel))
            }
            Token::Op(Operator::Match) => Err(self.error("size relation or integer")),
            _ => Ok(ComparisonOp::Size(Relation::Eq)),
        }
    }

    fn parse_type_name(&mut self, field: String) -> Result<Expr, QueryError> {
        let next = self.peek();
        if matches!(
            next.token,
            Token::Eof
                | Token::LParen
                | Token::RParen
                | Token::Comma
                | Token::Op(_)
                | Token::Keyword(Keyword::And | Keyword::Or)
        ) {
            return Err(self.error("type name"));
        }

        let next = self.advance();
        let value = coerce_type_name(&next.token, next.position)?;
        Ok(Expr::Comparison(Comparison {
            field,
            op: ComparisonOp::Type,
            value,
        }))
    }

    fn parse_literal(&mut self) -> Result<Literal, QueryError> {
        match self.peek_token() {
            Token::Literal(_) => {
                let next = self.advance();
                let Token::Literal(raw) = &next.token else {
                    return Err(self.error("literal"));
                };
                Ok(coerce_literal(raw, next.position)?)
            }
            Token::Ident(_) => Err(self.error("literal (quote string values)")),
            _ => Err(self.error("literal")),
        }
    }
}

/// Reject field paths with empty segments such as `a..b` or `.a`.
fn validate_field_path(field: &str, position: usize) -> Result<(), ParseError> {
    if field.split('.').any(str::is_empty) {
        return Err(ParseError::new(
            position,
            "field name without empty path segments",
            format!("'{}'", field),
        ));
    }
    Ok(())
}

/// Check that the value kind suits the operator.
fn build_comparison(
    field: String,
    op: ComparisonOp,
    value: Literal,
) -> Result<Comparison, CoercionError> {
    let expected = match (op, &value) {
        (ComparisonOp::Gt | ComparisonOp::Gte | ComparisonOp::Lt | ComparisonOp::Lte, v) => {
            match v {
                Literal::Int(_) | Literal::Float(_) => None,
                _ => Some("a number"),
            }
        }
        (ComparisonOp::Regex, Literal::String(_)) => None,
        (ComparisonOp::Regex, _) => Some("a quoted pattern"),
        (ComparisonOp::Exists, Literal::Bool(_)) => None,
        (ComparisonOp::Exists, _) => Some("true or false"),
        (ComparisonOp::Size(Relation::Lt), Literal::Int(0)) => Some("a positive integer"),
        (ComparisonOp::Size(_), Literal::Int(n)) if *n >= 0 => None,
        (ComparisonOp::Size(_), _) => Some("a non-negative integer"),
        _ => None,
    };

    match expected {
        Some(expected) => Err(CoercionError::ValueKind {
            found: describe(&value),
            field,
            op: op.to_string(),
            expected,
        }),
        None => Ok(Comparison { field, op, value }),
    }
}

fn describe(value: &Literal) -> String {
    match value {
        Literal::Int(n) => format!("{} {}", value.kind(), n),
        Literal::Float(n) => format!("{} {}", value.kind(), n),
        Literal::String(s) => format!("{} {:?}", value.kind(), s),
        Literal::Bool(b) => format!("{} {}", value.kind(), b),
        other => other.kind().to_string(),
    }
}

/// Parse a query DSL string into an AST.
pub fn parse_expression(input: &str) -> Result<Expr, QueryError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser::new(tokens);
    let ast = parser.parse_query()?;

    // Ensure we consumed all tokens
    if !matches!(parser.peek_token(), Token::Eof) {
        return Err(parser.error("'and', 'or' or end of input"));
    }

    Ok(ast)
}

/// Parse list input: each clause on its own, all of them ANDed.
///
/// Returns `None` for an empty list.
pub fn parse_clauses(clauses: &[Clause]) -> Result<Option<Expr>, QueryError> {
    let mut operands = Vec::with_capacity(clauses.len());

    for (i, clause) in clauses.iter().enumerate() {
        let expr = match clause {
            Clause::Text(text) => parse_expression(text).inspect_err(|e| {
                tracing::debug!("List item {} ({:?}) rejected: {}", i, text, e);
            })?,
            Clause::Fragment(doc) => Expr::Fragment(doc.clone()),
        };
        operands.push(expr);
    }

    if operands.is_empty() {
        return Ok(None);
    }
    Ok(Some(Expr::And(operands).simplify()))
}

/// Parse grouped list input: each group is ANDed, the groups are ORed.
///
/// An empty group matches everything; an empty list of groups yields `None`.
pub fn parse_groups(groups: &[Vec<Clause>]) -> Result<Option<Expr>, QueryError> {
    let mut operands = Vec::with_capacity(groups.len());

    for group in groups {
        let expr = parse_clauses(group)?.unwrap_or_else(|| Expr::Fragment(Default::default()));
        operands.push(expr);
    }

    if operands.is_empty() {
        return Ok(None);
    }
    Ok(Some(Expr::Or(operands).simplify()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::ast::TypeName;

    fn cmp(field: &str, op: ComparisonOp, value: Literal) -> Expr {
        Expr::Comparison(Comparison {
            field: field.into(),
            op,
            value,
        })
    }

    fn parse_err(input: &str) -> ParseError {
        match parse_expression(input) {
            Err(QueryError::Parse(e)) => e,
            other => panic!("expected parse error for {:?}, got {:?}", input, other),
        }
    }

    #[test]
    fn test_simple_comparison() {
        assert_eq!(
            parse_expression("a > 0").unwrap(),
            cmp("a", ComparisonOp::Gt, Literal::Int(0))
        );
    }

    #[test]
    fn test_literal_kinds() {
        assert_eq!(
            parse_expression("name = 'bob'").unwrap(),
            cmp("name", ComparisonOp::Eq, Literal::String("bob".into()))
        );
        assert_eq!(
            parse_expression("ok != false").unwrap(),
            cmp("ok", ComparisonOp::Ne, Literal::Bool(false))
        );
        assert_eq!(
            parse_expression("x = null").unwrap(),
            cmp("x", ComparisonOp::Eq, Literal::Null)
        );
        assert_eq!(
            parse_expression("x <= 2.5").unwrap(),
            cmp("x", ComparisonOp::Lte, Literal::Float(2.5))
        );
    }

    #[test]
    fn test_precedence_and_binds_tighter_than_or() {
        let ast = parse_expression("a = 1 or b = 2 and c = 3").unwrap();
        assert_eq!(
            ast,
            Expr::Or(vec![
                cmp("a", ComparisonOp::Eq, Literal::Int(1)),
                Expr::And(vec![
                    cmp("b", ComparisonOp::Eq, Literal::Int(2)),
                    cmp("c", ComparisonOp::Eq, Literal::Int(3)),
                ]),
            ])
        );
    }

    #[test]
    fn test_parentheses_override_precedence() {
        let ast = parse_expression("(a = 1 or b = 2) and c = 3").unwrap();
        assert!(matches!(&ast, Expr::And(ops) if matches!(ops[0], Expr::Or(_))));
    }

    #[test]
    fn test_not_binds_tighter_than_and() {
        let ast = parse_expression("not a = 1 and b = 2").unwrap();
        assert_eq!(
            ast,
            Expr::And(vec![
                Expr::Not(Box::new(cmp("a", ComparisonOp::Eq, Literal::Int(1)))),
                cmp("b", ComparisonOp::Eq, Literal::Int(2)),
            ])
        );
    }

    #[test]
    fn test_flattening_of_chains() {
        let ast = parse_expression("a = 1 and (b = 2 and c = 3)").unwrap();
        assert!(matches!(ast, Expr::And(ref ops) if ops.len() == 3));
    }

    #[test]
    fn test_keyword_operators() {
        assert_eq!(
            parse_expression("c type STRING").unwrap(),
            cmp("c", ComparisonOp::Type, Literal::TypeName(TypeName::String))
        );
        assert_eq!(
            parse_expression("tags exists true").unwrap(),
            cmp("tags", ComparisonOp::Exists, Literal::Bool(true))
        );
        assert_eq!(
            parse_expression("tags size 3").unwrap(),
            cmp("tags", ComparisonOp::Size(Relation::Eq), Literal::Int(3))
        );
        assert_eq!(
            parse_expression("tags size> 3").unwrap(),
            cmp("tags", ComparisonOp::Size(Relation::Gt), Literal::Int(3))
        );
        assert_eq!(
            parse_expression("name ~ '^foo'").unwrap(),
            cmp("name", ComparisonOp::Regex, Literal::String("^foo".into()))
        );
    }

    #[test]
    fn test_contextual_words_as_field_names() {
        assert_eq!(
            parse_expression("size = 3").unwrap(),
            cmp("size", ComparisonOp::Eq, Literal::Int(3))
        );
        assert_eq!(
            parse_expression("exists exists false").unwrap(),
            cmp("exists", ComparisonOp::Exists, Literal::Bool(false))
        );
    }

    #[test]
    fn test_missing_operand() {
        let err = parse_err("a >");
        assert_eq!(err.position, 3);
        assert_eq!(err.found, "end of input");
    }

    #[test]
    fn test_unbalanced_parentheses() {
        let err = parse_err("(a = 1");
        assert_eq!(err.expected, "')'");
        parse_err("a = 1)");
    }

    #[test]
    fn test_reserved_word_as_field() {
        let err = parse_err("and = 1");
        assert_eq!(err.found, "keyword 'and'");
        assert_eq!(err.position, 0);
    }

    #[test]
    fn test_malformed_inputs() {
        for input in ["a <>2", "and or and", ",,,", "a = 1 b = 2", "a = b", "a.. = 1", "a type"] {
            assert!(
                matches!(parse_expression(input), Err(QueryError::Parse(_))),
                "{input}"
            );
        }
    }

    #[test]
    fn test_value_kind_errors() {
        for input in ["a > 'x'", "a ~ 3", "a exists 1", "a size -1", "a size 'x'"] {
            assert!(
                matches!(
                    parse_expression(input),
                    Err(QueryError::Coercion(CoercionError::ValueKind { .. }))
                ),
                "{input}"
            );
        }
    }

    #[test]
    fn test_nesting_depth_is_limited() {
        let nested = |n: usize| format!("{}a = 1{}", "(".repeat(n), ")".repeat(n));
        assert!(parse_expression(&nested(MAX_DEPTH)).is_ok());

        let err = parse_err(&nested(2000));
        assert_eq!(err.expected, "nesting depth <= 128");
        assert_eq!(err.position, MAX_DEPTH);

        let nots = format!("{}a = 1", "not ".repeat(2000));
        assert_eq!(parse_err(&nots).expected, "nesting depth <= 128");
    }

    #[test]
    fn test_size_below_zero_is_rejected() {
        assert!(matches!(
            parse_expression("a size < 0"),
            Err(QueryError::Coercion(CoercionError::ValueKind { .. }))
        ));
        assert!(parse_expression("a size <= 0").is_ok());
        assert!(parse_expression("a size < 1").is_ok());
    }

    #[test]
    fn test_missing_type_name_is_a_parse_error() {
        for input in ["a type (b)", "a type , b", "a type = 1", "a type"] {
            let err = parse_err(input);
            assert_eq!(err.expected, "type name", "{input}");
        }
    }

    #[test]
    fn test_unknown_type_name() {
        assert!(matches!(
            parse_expression("a type foo"),
            Err(QueryError::Coercion(CoercionError::InvalidTypeName { .. }))
        ));
    }

    #[test]
    fn test_clauses_are_anded() {
        let clauses = vec![Clause::Text("a > 1".into()), Clause::Text("b < 2".into())];
        let ast = parse_clauses(&clauses).unwrap().unwrap();
        assert!(matches!(ast, Expr::And(ref ops) if ops.len() == 2));
        assert_eq!(parse_clauses(&[]).unwrap(), None);
    }

    #[test]
    fn test_groups_are_ored() {
        let groups = vec![
            vec![Clause::Text("a > 1".into())],
            vec![Clause::Text("b < 2".into()), Clause::Text("c = 3".into())],
        ];
        let ast = parse_groups(&groups).unwrap().unwrap();
        assert!(matches!(ast, Expr::Or(ref ops) if ops.len() == 2));
    }
}

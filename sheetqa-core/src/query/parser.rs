//! Parser for the pandas-style expression subset.
//!
//! Recognizes exactly the forms the query grammar supports and nothing else.
//! The input has already been through [`crate::sanitize`], so it is a single
//! trimmed line; the parser is a plain left-to-right cursor over it.

use super::{Aggregate, CmpOp, Filter, Literal, QueryExpr};
use crate::error::QueryError;
use crate::sanitize::SanitizedExpression;

/// Parse a sanitized expression into a query.
///
/// The sanitizer's invalid marker parses to [`QueryExpr::Invalid`], which
/// defers the error signal to evaluation.
pub fn parse(expr: &SanitizedExpression) -> Result<QueryExpr, QueryError> {
    match expr {
        SanitizedExpression::Invalid => Ok(QueryExpr::Invalid),
        SanitizedExpression::Code(code) => parse_code(code),
    }
}

fn parse_code(code: &str) -> Result<QueryExpr, QueryError> {
    let mut cur = Cursor::new(code.trim());

    if !cur.eat("df") {
        return Err(unsupported(code));
    }
    if cur.done() {
        return Ok(QueryExpr::Table);
    }

    if cur.eat(".shape[0]") {
        return finish(cur, QueryExpr::RowCount { filter: None }, code);
    }

    if cur.eat(".groupby(") {
        return parse_groupby(cur, code);
    }

    if cur.starts_with("[df[") {
        return parse_filtered(cur, code);
    }

    if cur.starts_with("['") || cur.starts_with("[\"") {
        return parse_column(cur, code);
    }

    Err(unsupported(code))
}

/// `df.groupby('g').size()` or `df.groupby('g')['t'].<agg>()`.
fn parse_groupby(mut cur: Cursor<'_>, code: &str) -> Result<QueryExpr, QueryError> {
    let group = cur.quoted().ok_or_else(|| unsupported(code))?;
    if !cur.eat(")") {
        return Err(unsupported(code));
    }

    if cur.eat(".size()") {
        return finish(cur, QueryExpr::GroupCount { column: group }, code);
    }

    if cur.eat("[") {
        let target = cur.quoted().ok_or_else(|| unsupported(code))?;
        if !cur.eat("]") {
            return Err(unsupported(code));
        }
        let agg = cur.aggregate().ok_or_else(|| unsupported(code))?;
        return finish(
            cur,
            QueryExpr::GroupAgg {
                group,
                target,
                agg,
            },
            code,
        );
    }

    Err(unsupported(code))
}

/// `df[df['c'] <op> <lit>]` with an optional `.shape[0]` or `['col']` suffix.
fn parse_filtered(mut cur: Cursor<'_>, code: &str) -> Result<QueryExpr, QueryError> {
    if !cur.eat("[") {
        return Err(unsupported(code));
    }
    cur.skip_ws();
    if !(cur.eat("df") && cur.eat("[")) {
        return Err(unsupported(code));
    }
    let column = cur.quoted().ok_or_else(|| unsupported(code))?;
    if !cur.eat("]") {
        return Err(unsupported(code));
    }
    cur.skip_ws();
    let op = cur.cmp_op().ok_or_else(|| unsupported(code))?;
    cur.skip_ws();
    let value = cur.literal().ok_or_else(|| unsupported(code))?;
    cur.skip_ws();
    if !cur.eat("]") {
        return Err(unsupported(code));
    }

    let filter = Filter { column, op, value };

    if cur.done() {
        return Ok(QueryExpr::FilterRows(filter));
    }
    if cur.eat(".shape[0]") {
        return finish(
            cur,
            QueryExpr::RowCount {
                filter: Some(filter),
            },
            code,
        );
    }
    if cur.eat("[") {
        let column = cur.quoted().ok_or_else(|| unsupported(code))?;
        if !cur.eat("]") {
            return Err(unsupported(code));
        }
        return finish(
            cur,
            QueryExpr::ColumnSelect {
                column,
                filter: Some(filter),
            },
            code,
        );
    }

    Err(unsupported(code))
}

/// `df['c']` with an optional aggregate or `.value_counts()` suffix.
fn parse_column(mut cur: Cursor<'_>, code: &str) -> Result<QueryExpr, QueryError> {
    if !cur.eat("[") {
        return Err(unsupported(code));
    }
    let column = cur.quoted().ok_or_else(|| unsupported(code))?;
    if !cur.eat("]") {
        return Err(unsupported(code));
    }

    if cur.done() {
        return Ok(QueryExpr::ColumnSelect {
            column,
            filter: None,
        });
    }
    if cur.eat(".value_counts()") {
        return finish(cur, QueryExpr::GroupCount { column }, code);
    }
    if let Some(agg) = cur.aggregate() {
        return finish(cur, QueryExpr::ColumnAgg { column, agg }, code);
    }

    Err(unsupported(code))
}

/// Accept the parsed query only if the cursor consumed the whole expression.
fn finish(cur: Cursor<'_>, expr: QueryExpr, code: &str) -> Result<QueryExpr, QueryError> {
    if cur.done() {
        Ok(expr)
    } else {
        Err(unsupported(code))
    }
}

fn unsupported(code: &str) -> QueryError {
    QueryError::Unsupported {
        text: code.to_string(),
    }
}

/// A left-to-right cursor over the expression text.
struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self { rest: text }
    }

    fn done(&self) -> bool {
        self.rest.is_empty()
    }

    fn starts_with(&self, token: &str) -> bool {
        self.rest.starts_with(token)
    }

    fn eat(&mut self, token: &str) -> bool {
        if let Some(remaining) = self.rest.strip_prefix(token) {
            self.rest = remaining;
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        self.rest = self.rest.trim_start();
    }

    /// A single- or double-quoted string. No escape handling; column names
    /// with embedded quotes are outside the grammar.
    fn quoted(&mut self) -> Option<String> {
        let quote = self.rest.chars().next()?;
        if quote != '\'' && quote != '"' {
            return None;
        }
        let body = &self.rest[1..];
        let end = body.find(quote)?;
        let value = body[..end].to_string();
        self.rest = &body[end + 1..];
        Some(value)
    }

    fn cmp_op(&mut self) -> Option<CmpOp> {
        // Two-character operators first.
        for (token, op) in [
            ("==", CmpOp::Eq),
            ("!=", CmpOp::Ne),
            (">=", CmpOp::Ge),
            ("<=", CmpOp::Le),
            (">", CmpOp::Gt),
            ("<", CmpOp::Lt),
        ] {
            if self.eat(token) {
                return Some(op);
            }
        }
        None
    }

    /// A quoted string literal or a bare numeric literal.
    fn literal(&mut self) -> Option<Literal> {
        if let Some(text) = self.quoted() {
            return Some(Literal::Text(text));
        }
        let end = self
            .rest
            .char_indices()
            .find(|(_, c)| !(c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E')))
            .map(|(i, _)| i)
            .unwrap_or(self.rest.len());
        if end == 0 {
            return None;
        }
        let number: f64 = self.rest[..end].parse().ok()?;
        self.rest = &self.rest[end..];
        Some(Literal::Number(number))
    }

    fn aggregate(&mut self) -> Option<Aggregate> {
        for (token, agg) in [
            (".sum()", Aggregate::Sum),
            (".mean()", Aggregate::Mean),
            (".min()", Aggregate::Min),
            (".max()", Aggregate::Max),
            (".count()", Aggregate::Count),
            (".nunique()", Aggregate::Nunique),
        ] {
            if self.eat(token) {
                return Some(agg);
            }
        }
        None
    }
}

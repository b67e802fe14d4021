//! Text predicate compiler.
//!
//! Turns a single comparison written as text into an [`Expr`]:
//!
//! | Text | Predicate |
//! |---|---|
//! | `k == v` | `k` equals `v` |
//! | `k != v` | `k` does not equal `v` |
//! | `k > v`, `k < v`, `k >= v`, `k <= v` | ordered comparisons |
//! | `k in v` | `k` is one of the values in `v` |
//! | `k not in v` | `k` is none of the values in `v` |
//! | `k re: pattern` | `k` matches `pattern`, taken verbatim |
//! | `k contains v` | array `k` has an element equal to `v` |
//!
//! Operator tokens are space padded and tried in the fixed order of [`FieldOp::ALL`];
//! the first token found anywhere in the text wins, and the text is split at that
//! token's first occurrence. `not in` is tried right before `in`, since every
//! `not in` query also contains ` in `.
//!
//! Right-hand sides go through [`parse_literal`], which only accepts literals.
//! Text with no operator token is forwarded as [`Expr::Native`].

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    literal::parse_literal,
    query::{Expr, FieldOp, QueryInput},
};

/// Compiles an optional text predicate.
///
/// `None` and the empty string both compile to the match-all predicate.
///
/// # Example
///
/// ```ignore
/// use docquery_core::{predicate::compile, query::Filter};
///
/// assert_eq!(compile(Some("score >= 10"))?, Filter::gte("score", 10));
/// ```
pub fn compile(text: Option<&str>) -> DocumentStoreResult<Expr> {
    let Some(text) = text.filter(|text| !text.is_empty()) else {
        return Ok(Expr::all());
    };

    let Some((op, index)) = find_operator(text) else {
        tracing::warn!(query = text, "no operator token found, forwarding as native filter");
        return Ok(Expr::Native(text.to_string()));
    };

    let field = &text[..index];
    let fragment = &text[index + op.token().len()..];

    if field.trim().is_empty() {
        return Err(DocumentStoreError::MalformedQuery(format!(
            "missing field before {:?} in {text:?}",
            op.token().trim()
        )));
    }
    if fragment.trim().is_empty() {
        return Err(DocumentStoreError::MalformedQuery(format!(
            "missing value after {:?} in {text:?}",
            op.token().trim()
        )));
    }

    let value = if op.takes_raw_value() {
        bson::Bson::String(fragment.to_string())
    } else {
        parse_literal(fragment)?
    };

    tracing::debug!(field, op = ?op, value = %value, "compiled text predicate");

    Ok(Expr::Field { field: field.to_string(), op, value })
}

/// Resolves any query input to a predicate.
///
/// Structured predicates pass through unchanged; text is compiled.
pub fn compile_input(input: QueryInput) -> DocumentStoreResult<Expr> {
    match input {
        QueryInput::Empty => Ok(Expr::all()),
        QueryInput::Predicate(expr) => Ok(expr),
        QueryInput::Text(text) => compile(Some(&text)),
    }
}

/// Finds the winning operator and the byte index of its first occurrence.
fn find_operator(text: &str) -> Option<(FieldOp, usize)> {
    FieldOp::ALL
        .into_iter()
        .find_map(|op| text.find(op.token()).map(|index| (op, index)))
}

//! Query construction and filtering API for document stores.
//!
//! This module provides the predicate tree ([`Expr`]) shared by the text compiler
//! and by hand-built filters, the find options (pagination, sort, projection), and a
//! visitor used by backends to execute or translate predicates.
//!
//! # Query Building
//!
//! ```ignore
//! use docquery::query::{Query, Filter, SortDirection};
//!
//! let query = Query::builder()
//!     .filter(Filter::eq("name", "Alice"))
//!     .limit(10)
//!     .offset(0)
//!     .sort("created_at", SortDirection::Desc)
//!     .build();
//! ```
//!
//! # Filter Expression API
//!
//! The [`Filter`] struct provides static methods for building filter expressions:
//!
//! - Comparison: `eq`, `ne`, `gt`, `gte`, `lt`, `lte`
//! - Membership: `any_of`, `none_of`, `contains`
//! - Pattern: `regex`
//! - Logical: `and`, `or`, `all`
//!
//! The text mini-language ([`crate::predicate`]) has no logical connectives, so
//! `and`/`or`/`not` are the only way to combine comparisons.

use bson::Bson;

use crate::error::DocumentStoreError;

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

/// Sort specification for query results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    /// The field name to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

/// Field comparison operators for filter expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldOp {
    /// Equal to.
    Eq,
    /// Not equal to.
    Ne,
    /// Greater than.
    Gt,
    /// Less than.
    Lt,
    /// Greater than or equal to.
    Gte,
    /// Less than or equal to.
    Lte,
    /// Field value is one of the listed values.
    In,
    /// Field value is none of the listed values.
    NotIn,
    /// String field matches a regular expression.
    Regex,
    /// Array field has an element equal to the value.
    ElemEq,
}

impl FieldOp {
    /// Every operator, in the order the text compiler tries their tokens.
    pub const ALL: [FieldOp; 10] = [
        FieldOp::Eq,
        FieldOp::Ne,
        FieldOp::Gt,
        FieldOp::Lt,
        FieldOp::Gte,
        FieldOp::Lte,
        FieldOp::NotIn,
        FieldOp::In,
        FieldOp::Regex,
        FieldOp::ElemEq,
    ];

    /// The delimiter that denotes this operator in a text predicate.
    pub const fn token(self) -> &'static str {
        match self {
            FieldOp::Eq => " == ",
            FieldOp::Ne => " != ",
            FieldOp::Gt => " > ",
            FieldOp::Lt => " < ",
            FieldOp::Gte => " >= ",
            FieldOp::Lte => " <= ",
            FieldOp::In => " in ",
            FieldOp::NotIn => " not in ",
            FieldOp::Regex => " re: ",
            FieldOp::ElemEq => " contains ",
        }
    }

    /// Whether the right-hand side is taken verbatim instead of literal-parsed.
    pub const fn takes_raw_value(self) -> bool {
        matches!(self, FieldOp::Regex)
    }
}

/// A filter expression for querying documents.
///
/// # Example
///
/// ```ignore
/// use docquery::query::{Expr, Filter};
///
/// let adults = Filter::and(vec![
///     Filter::eq("status", "active"),
///     Filter::gte("age", 18),
/// ]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Logical AND of multiple expressions (all must match). Empty matches everything.
    And(Vec<Expr>),
    /// Logical OR of multiple expressions (any must match).
    Or(Vec<Expr>),
    /// Logical NOT of an expression (inverts the result).
    Not(Box<Expr>),
    /// Field comparison expression.
    Field {
        /// The field path to compare; dots address nested fields.
        field: String,
        /// The comparison operator.
        op: FieldOp,
        /// The value to compare against.
        value: Bson,
    },
    /// Filter text in the backend's own syntax, forwarded unmodified.
    Native(String),
}

impl Expr {
    /// Creates a field comparison expression.
    pub fn field(field: impl Into<String>, op: FieldOp, value: impl Into<Bson>) -> Self {
        Expr::Field { field: field.into(), op, value: value.into() }
    }

    /// The predicate every document satisfies.
    pub fn all() -> Self {
        Expr::And(Vec::new())
    }

    /// Whether this is the match-all predicate.
    pub fn is_match_all(&self) -> bool {
        matches!(self, Expr::And(list) if list.is_empty())
    }

    /// Splits a comparison back into its field path, operator and value.
    pub fn as_comparison(&self) -> Option<(&str, FieldOp, &Bson)> {
        match self {
            Expr::Field { field, op, value } => Some((field.as_str(), *op, value)),
            _ => None,
        }
    }

    /// Combines this expression with another using logical AND.
    ///
    /// If this expression is already an AND, the other expression is appended
    /// to the list. Otherwise, a new AND expression is created.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    /// Combines this expression with another using logical OR.
    ///
    /// If this expression is already an OR, the other expression is appended
    /// to the list. Otherwise, a new OR expression is created.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut list) => {
                list.push(other);
                Expr::Or(list)
            }
            _ => Expr::Or(vec![self, other]),
        }
    }

    /// Negates this expression (logical NOT).
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }
}

/// Helper struct for constructing filter expressions.
///
/// All methods accept field names and values as `Into<String>` and `Into<Bson>` for ergonomics.
pub struct Filter;

impl Filter {
    /// Matches documents where the field equals the value.
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field, FieldOp::Eq, value)
    }

    /// Matches documents where the field does not equal the value.
    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field, FieldOp::Ne, value)
    }

    /// Matches documents where the field is greater than the value.
    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field, FieldOp::Gt, value)
    }

    /// Matches documents where the field is greater than or equal to the value.
    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field, FieldOp::Gte, value)
    }

    /// Matches documents where the field is less than the value.
    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field, FieldOp::Lt, value)
    }

    /// Matches documents where the field is less than or equal to the value.
    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field, FieldOp::Lte, value)
    }

    /// Matches documents where the field equals one of `values`.
    pub fn any_of(field: impl Into<String>, values: impl Into<Bson>) -> Expr {
        Expr::field(field, FieldOp::In, values)
    }

    /// Matches documents where the field equals none of `values`.
    pub fn none_of(field: impl Into<String>, values: impl Into<Bson>) -> Expr {
        Expr::field(field, FieldOp::NotIn, values)
    }

    /// Matches documents where the string field matches `pattern`.
    pub fn regex(field: impl Into<String>, pattern: impl Into<String>) -> Expr {
        Expr::field(field, FieldOp::Regex, Bson::String(pattern.into()))
    }

    /// Matches documents where the array field has an element equal to the value.
    pub fn contains(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field, FieldOp::ElemEq, value)
    }

    /// Combines expressions such that all must match.
    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }

    /// Combines expressions such that any can match.
    pub fn or(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(exprs.into_iter().collect())
    }

    /// Matches every document.
    pub fn all() -> Expr {
        Expr::all()
    }
}

/// Store-native options that accompany a predicate: pagination, sort and projection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
    /// Number of documents to skip.
    pub offset: Option<usize>,
    /// Sort keys, most significant first.
    pub sort: Vec<Sort>,
    /// Fields to return. `_id` is always included.
    pub projection: Option<Vec<String>>,
}

impl FindOptions {
    /// Creates empty options: no limit, no offset, natural order, whole documents.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of documents to return.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the number of documents to skip.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Appends a sort key.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.push(Sort { field: field.into(), direction });
        self
    }

    /// Restricts returned documents to the given fields.
    pub fn projection<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(fields.into_iter().map(Into::into).collect());
        self
    }
}

/// A structured query: an optional predicate plus find options.
///
/// A missing filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Optional filter expression to match documents.
    pub filter: Option<Expr>,
    /// Pagination, sort and projection.
    pub options: FindOptions,
}

impl Query {
    /// Creates a new empty query with no filters or limits.
    pub fn new() -> Self {
        Query { filter: None, options: FindOptions::default() }
    }

    /// Creates a query from a predicate and options.
    pub fn with_options(filter: Expr, options: FindOptions) -> Self {
        let filter = if filter.is_match_all() { None } else { Some(filter) };

        Query { filter, options }
    }

    /// Creates a new query builder for fluent construction.
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    /// Creates a new query builder.
    pub fn new() -> Self {
        QueryBuilder { query: Query::default() }
    }

    /// Sets the filter expression for this query.
    pub fn filter(mut self, filter: Expr) -> Self {
        self.query.filter = Some(filter);
        self
    }

    /// Sets the maximum number of documents to return.
    pub fn limit(mut self, limit: usize) -> Self {
        self.query.options.limit = Some(limit);
        self
    }

    /// Sets the number of documents to skip (for pagination).
    pub fn offset(mut self, offset: usize) -> Self {
        self.query.options.offset = Some(offset);
        self
    }

    /// Appends a sort key.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.query.options = self.query.options.sort(field, direction);
        self
    }

    /// Restricts returned documents to the given fields.
    pub fn projection<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query.options = self.query.options.projection(fields);
        self
    }

    /// Builds and returns the final query.
    pub fn build(self) -> Query {
        self.query
    }
}

/// What a caller hands to a find operation, resolved once at the facade.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum QueryInput {
    /// No predicate: match every document.
    #[default]
    Empty,
    /// An already structured predicate, used unchanged.
    Predicate(Expr),
    /// A text predicate to compile.
    Text(String),
}

impl From<Expr> for QueryInput {
    fn from(expr: Expr) -> Self {
        QueryInput::Predicate(expr)
    }
}

impl From<&str> for QueryInput {
    fn from(text: &str) -> Self {
        QueryInput::Text(text.to_string())
    }
}

impl From<String> for QueryInput {
    fn from(text: String) -> Self {
        QueryInput::Text(text)
    }
}

impl From<()> for QueryInput {
    fn from(_: ()) -> Self {
        QueryInput::Empty
    }
}

impl<T: Into<QueryInput>> From<Option<T>> for QueryInput {
    fn from(input: Option<T>) -> Self {
        input.map_or(QueryInput::Empty, Into::into)
    }
}

pub trait QueryVisitor {
    type Output;
    type Error: Into<DocumentStoreError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_native(&mut self, text: &str) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Not(expr) => self.visit_not(expr),
            Expr::Field { field, op, value } => self.visit_field(field, *op, value),
            Expr::Native(text) => self.visit_native(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combinators_flatten() {
        let expr = Filter::eq("a", 1).and(Filter::eq("b", 2)).and(Filter::eq("c", 3));
        assert!(matches!(&expr, Expr::And(list) if list.len() == 3));

        let expr = Filter::eq("a", 1).or(Filter::eq("b", 2)).or(Filter::eq("c", 3));
        assert!(matches!(&expr, Expr::Or(list) if list.len() == 3));
    }

    #[test]
    fn match_all_query_has_no_filter() {
        let query = Query::with_options(Filter::all(), FindOptions::new().limit(5));
        assert_eq!(query.filter, None);
        assert_eq!(query.options.limit, Some(5));
    }

    #[test]
    fn tokens_are_space_padded() {
        for op in FieldOp::ALL {
            let token = op.token();
            assert!(token.starts_with(' ') && token.ends_with(' '), "{token:?}");
        }
    }

    #[test]
    fn input_conversions() {
        assert_eq!(QueryInput::from(()), QueryInput::Empty);
        assert_eq!(QueryInput::from(None::<&str>), QueryInput::Empty);
        assert_eq!(QueryInput::from("a == 1"), QueryInput::Text("a == 1".into()));
        assert_eq!(
            QueryInput::from(Filter::eq("a", 1)),
            QueryInput::Predicate(Filter::eq("a", 1))
        );
    }

    #[test]
    fn builder_collects_options() {
        let query = Query::builder()
            .filter(Filter::gt("age", 18))
            .limit(10)
            .offset(20)
            .sort("age", SortDirection::Desc)
            .sort("name", SortDirection::Asc)
            .projection(["name", "age"])
            .build();

        assert_eq!(query.options.sort.len(), 2);
        assert_eq!(query.options.offset, Some(20));
        assert_eq!(
            query.options.projection,
            Some(vec!["name".to_string(), "age".to_string()])
        );
    }
}

//! Query expression evaluation for in-memory document filtering.
//!
//! Follows MongoDB's matching rules closely enough for tests and development:
//! dotted paths descend into documents and fan out over arrays, numbers compare
//! across integer and float types, ordered comparisons only match values of the
//! same type bracket, and an equality on an array field matches any element.

use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};
use regex::Regex;
use std::cmp::Ordering;

use docquery_core::{
    error::{DocumentStoreError, DocumentStoreResult},
    id::ID_FIELD,
    query::{Expr, FieldOp, QueryVisitor, Sort, SortDirection},
};

/// Comparable view of a BSON value. Integers and floats compare with each other.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Int(i64),
    Double(f64),
    String(&'a str),
    Document(Vec<(&'a str, Comparable<'a>)>),
    Array(Vec<Comparable<'a>>),
    ObjectId(ObjectId),
    Bool(bool),
    DateTime(DateTime),
    /// Anything else: compared by exact BSON equality, never ordered.
    Other(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Int32(value) => Comparable::Int(i64::from(*value)),
            Bson::Int64(value) => Comparable::Int(*value),
            Bson::Double(value) => Comparable::Double(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Document(doc) => Comparable::Document(
                doc.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect(),
            ),
            Bson::Array(items) => Comparable::Array(items.iter().map(Comparable::from).collect()),
            Bson::ObjectId(oid) => Comparable::ObjectId(*oid),
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            other => Comparable::Other(other),
        }
    }
}

impl Comparable<'_> {
    /// Position in MongoDB's cross-type sort order.
    fn type_rank(&self) -> u8 {
        match self {
            Comparable::Null => 1,
            Comparable::Int(_) | Comparable::Double(_) => 2,
            Comparable::String(_) => 3,
            Comparable::Document(_) => 4,
            Comparable::Array(_) => 5,
            Comparable::Other(_) => 6,
            Comparable::ObjectId(_) => 7,
            Comparable::Bool(_) => 8,
            Comparable::DateTime(_) => 9,
        }
    }

    /// Orders any two values: by type bracket first, then by value.
    pub(crate) fn total_cmp(&self, other: &Self) -> Ordering {
        self.type_rank()
            .cmp(&other.type_rank())
            .then_with(|| self.partial_cmp(other).unwrap_or(Ordering::Equal))
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Int(a), Comparable::Int(b)) => a == b,
            (Comparable::Int(a), Comparable::Double(b)) | (Comparable::Double(b), Comparable::Int(a)) => {
                (*a as f64) == *b
            }
            (Comparable::Double(a), Comparable::Double(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Document(a), Comparable::Document(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::Other(a), Comparable::Other(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
    /// Orders values of the same type bracket. Mixed brackets are unordered.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Some(Ordering::Equal),
            (Comparable::Int(a), Comparable::Int(b)) => a.partial_cmp(b),
            (Comparable::Int(a), Comparable::Double(b)) => (*a as f64).partial_cmp(b),
            (Comparable::Double(a), Comparable::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Comparable::Double(a), Comparable::Double(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Collects every value a dotted path reaches, fanning out over arrays.
pub(crate) fn resolve<'a>(document: &'a Document, path: &str) -> Vec<&'a Bson> {
    let segments = path.split('.').collect::<Vec<_>>();
    let mut found = Vec::new();

    if let Some((head, rest)) = segments.split_first() {
        if let Some(value) = document.get(*head) {
            descend(value, rest, &mut found);
        }
    }

    found
}

fn descend<'a>(value: &'a Bson, segments: &[&str], found: &mut Vec<&'a Bson>) {
    let Some((head, rest)) = segments.split_first() else {
        found.push(value);
        return;
    };

    match value {
        Bson::Document(document) => {
            if let Some(child) = document.get(*head) {
                descend(child, rest, found);
            }
        }
        Bson::Array(items) => {
            if let Some(item) = head.parse::<usize>().ok().and_then(|index| items.get(index)) {
                descend(item, rest, found);
            }
            for item in items.iter().filter(|item| matches!(item, Bson::Document(_))) {
                descend(item, segments, found);
            }
        }
        _ => {}
    }
}

/// Evaluates predicates against one document.
pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> DocumentStoreResult<bool> {
        self.visit_expr(expr)
    }

    /// Keeps the documents matching `expr`. The first evaluation error aborts the scan.
    pub fn filter_documents(
        documents: impl IntoIterator<Item = &'a Document>,
        expr: &Expr,
    ) -> DocumentStoreResult<Vec<&'a Document>> {
        let mut matched = Vec::new();

        for document in documents {
            if DocumentEvaluator::new(document).evaluate(expr)? {
                matched.push(document);
            }
        }

        Ok(matched)
    }

    /// Whether a candidate, or any element of an array candidate, satisfies `test`.
    fn any_value(&self, field: &str, test: impl Fn(&Comparable<'_>) -> bool) -> bool {
        resolve(self.document, field).into_iter().any(|value| {
            let value = Comparable::from(value);

            test(&value)
                || matches!(&value, Comparable::Array(items) if items.iter().any(|item| test(item)))
        })
    }

    fn equals(&self, field: &str, value: &Bson) -> bool {
        let expected = Comparable::from(value);
        let candidates = resolve(self.document, field);

        if candidates.is_empty() {
            return expected == Comparable::Null;
        }

        self.any_value(field, |actual| actual == &expected)
    }

    fn ordered(&self, field: &str, value: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
        let expected = Comparable::from(value);

        self.any_value(field, |actual| actual.partial_cmp(&expected).is_some_and(&accept))
    }

    fn one_of(&self, field: &str, op: FieldOp, values: &Bson) -> DocumentStoreResult<bool> {
        let Bson::Array(values) = values else {
            return Err(DocumentStoreError::Backend(format!(
                "{op:?} on {field:?} needs a list of values, got {values}"
            )));
        };

        Ok(values.iter().any(|value| self.equals(field, value)))
    }

    fn matches_pattern(&self, field: &str, pattern: &Bson) -> DocumentStoreResult<bool> {
        let Bson::String(pattern) = pattern else {
            return Err(DocumentStoreError::Backend(format!(
                "pattern for {field:?} must be a string, got {pattern}"
            )));
        };
        let regex = Regex::new(pattern)
            .map_err(|e| DocumentStoreError::Backend(format!("invalid pattern {pattern:?}: {e}")))?;

        Ok(self.any_value(field, |actual| matches!(actual, Comparable::String(s) if regex.is_match(s))))
    }

    fn has_element(&self, field: &str, value: &Bson) -> bool {
        let expected = Comparable::from(value);

        resolve(self.document, field).into_iter().any(|candidate| {
            matches!(
                Comparable::from(candidate),
                Comparable::Array(items) if items.iter().any(|item| item == &expected)
            )
        })
    }
}

impl QueryVisitor for DocumentEvaluator<'_> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_field(&mut self, field: &str, op: FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        match op {
            FieldOp::Eq => Ok(self.equals(field, value)),
            FieldOp::Ne => Ok(!self.equals(field, value)),
            FieldOp::Gt => Ok(self.ordered(field, value, Ordering::is_gt)),
            FieldOp::Gte => Ok(self.ordered(field, value, Ordering::is_ge)),
            FieldOp::Lt => Ok(self.ordered(field, value, Ordering::is_lt)),
            FieldOp::Lte => Ok(self.ordered(field, value, Ordering::is_le)),
            FieldOp::In => self.one_of(field, op, value),
            FieldOp::NotIn => Ok(!self.one_of(field, op, value)?),
            FieldOp::Regex => self.matches_pattern(field, value),
            FieldOp::ElemEq => Ok(self.has_element(field, value)),
        }
    }

    fn visit_native(&mut self, text: &str) -> Result<Self::Output, Self::Error> {
        Err(DocumentStoreError::Backend(format!(
            "the in-memory store cannot run native filters: {text:?}"
        )))
    }
}

/// Orders documents by the given sort keys. Missing fields sort as null.
pub(crate) fn sort_documents(documents: &mut [&Document], keys: &[Sort]) {
    documents.sort_by(|a, b| {
        keys.iter().fold(Ordering::Equal, |ordering, key| {
            ordering.then_with(|| {
                let left = sort_value(a, &key.field);
                let right = sort_value(b, &key.field);

                match key.direction {
                    SortDirection::Asc => left.total_cmp(&right),
                    SortDirection::Desc => right.total_cmp(&left),
                }
            })
        })
    });
}

fn sort_value<'a>(document: &'a Document, field: &str) -> Comparable<'a> {
    resolve(document, field)
        .into_iter()
        .next()
        .map(Comparable::from)
        .unwrap_or(Comparable::Null)
}

/// Copies `_id` and the listed paths into a new document.
pub(crate) fn project(document: &Document, fields: &[String]) -> Document {
    let mut projected = Document::new();

    if let Some(id) = document.get(ID_FIELD) {
        projected.insert(ID_FIELD, id.clone());
    }
    for field in fields {
        copy_path(document, &mut projected, &field.split('.').collect::<Vec<_>>());
    }

    projected
}

fn copy_path(source: &Document, target: &mut Document, segments: &[&str]) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };
    let Some(value) = source.get(*head) else {
        return;
    };

    if rest.is_empty() {
        target.insert(*head, value.clone());
        return;
    }

    if let Bson::Document(child) = value {
        if !matches!(target.get(*head), Some(Bson::Document(_))) {
            target.insert(*head, Document::new());
        }
        if let Some(Bson::Document(nested)) = target.get_mut(*head) {
            copy_path(child, nested, rest);
            if nested.is_empty() {
                target.remove(*head);
            }
        }
    }
}

/// Applies `$set`-style changes: each key, possibly dotted, overwrites its path.
pub(crate) fn merge(document: &mut Document, changes: Document) {
    for (key, value) in changes {
        let segments = key.split('.').collect::<Vec<_>>();
        set_path(document, &segments, value);
    }
}

fn set_path(document: &mut Document, segments: &[&str], value: Bson) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };

    if rest.is_empty() {
        document.insert(*head, value);
        return;
    }

    if !matches!(document.get(*head), Some(Bson::Document(_))) {
        document.insert(*head, Document::new());
    }
    if let Some(Bson::Document(nested)) = document.get_mut(*head) {
        set_path(nested, rest, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docquery_core::{predicate::compile, query::Filter};

    fn person() -> Document {
        doc! {
            "_id": 1,
            "name": "Alice",
            "age": 31,
            "score": 7.5,
            "tags": ["admin", "ops"],
            "address": { "city": "Oslo", "zip": "0150" },
            "jobs": [{ "title": "dev" }, { "title": "lead" }],
        }
    }

    fn matches(text: &str) -> bool {
        let document = person();
        DocumentEvaluator::new(&document)
            .evaluate(&compile(Some(text)).unwrap())
            .unwrap()
    }

    #[test]
    fn comparisons() {
        assert!(matches("name == 'Alice'"));
        assert!(!matches("name != 'Alice'"));
        assert!(matches("age > 30"));
        assert!(!matches("age < 31"));
        assert!(matches("age >= 31"));
        assert!(matches("age <= 31.0"));
        assert!(matches("score > 7"));
    }

    #[test]
    fn ordered_comparisons_stay_within_type() {
        assert!(!matches("name > 1"));
        assert!(!matches("age < 'z'"));
    }

    #[test]
    fn membership() {
        assert!(matches("age in [30, 31]"));
        assert!(!matches("age not in [30, 31]"));
        assert!(matches("name not in ['Bob']"));
        assert!(matches("tags in ['ops', 'x']"));
    }

    #[test]
    fn membership_needs_a_list() {
        let document = person();
        let result = DocumentEvaluator::new(&document).evaluate(&Filter::any_of("age", 31));
        assert!(matches!(result, Err(DocumentStoreError::Backend(_))));
    }

    #[test]
    fn patterns() {
        assert!(matches("name re: ^Al"));
        assert!(!matches("name re: ^al"));
        assert!(matches("tags re: ^op"));
        assert!(!matches("age re: 3"));
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        let document = person();
        let result = DocumentEvaluator::new(&document).evaluate(&Filter::regex("name", "("));
        assert!(matches!(result, Err(DocumentStoreError::Backend(_))));
    }

    #[test]
    fn element_match() {
        assert!(matches("tags contains 'admin'"));
        assert!(!matches("tags contains 'root'"));
        assert!(!matches("name contains 'Alice'"));
    }

    #[test]
    fn dotted_paths() {
        assert!(matches("address.city == 'Oslo'"));
        assert!(matches("jobs.title == 'lead'"));
        assert!(matches("jobs.1.title == 'lead'"));
        assert!(matches("tags == 'ops'"));
    }

    #[test]
    fn missing_fields_equal_null() {
        assert!(matches("nickname == None"));
        assert!(!matches("nickname == 'x'"));
        assert!(matches("nickname != 'x'"));
    }

    #[test]
    fn logical_composition() {
        let document = person();
        let expr = Filter::or([Filter::eq("name", "Bob"), Filter::gt("age", 30)])
            .and(Filter::contains("tags", "ops").not());
        assert!(!DocumentEvaluator::new(&document).evaluate(&expr).unwrap());
        assert!(DocumentEvaluator::new(&document).evaluate(&Filter::all()).unwrap());
        assert!(!DocumentEvaluator::new(&document).evaluate(&Expr::Or(vec![])).unwrap());
    }

    #[test]
    fn native_filters_are_rejected() {
        let document = person();
        let result = DocumentEvaluator::new(&document).evaluate(&Expr::Native("{}".into()));
        assert!(matches!(result, Err(DocumentStoreError::Backend(_))));
    }

    #[test]
    fn projection_keeps_id() {
        let projected = project(&person(), &["name".to_string(), "address.city".to_string()]);
        assert_eq!(projected, doc! { "_id": 1, "name": "Alice", "address": { "city": "Oslo" } });
    }

    #[test]
    fn merge_sets_dotted_paths() {
        let mut document = doc! { "a": 1, "b": { "c": 2 } };
        merge(&mut document, doc! { "a": 5, "b.d": 3, "e.f": true });
        assert_eq!(document, doc! { "a": 5, "b": { "c": 2, "d": 3 }, "e": { "f": true } });
    }

    #[test]
    fn sorts_across_types() {
        let (a, b, c) = (doc! { "v": "x" }, doc! { "v": 2 }, doc! {});
        let mut documents = vec![&a, &b, &c];
        sort_documents(&mut documents, &[Sort { field: "v".into(), direction: SortDirection::Asc }]);
        assert_eq!(documents, vec![&c, &b, &a]);
    }
}

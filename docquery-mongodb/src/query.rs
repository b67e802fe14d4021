//! Query translation from predicate trees to MongoDB filter documents.
//!
//! | Predicate | Filter |
//! |---|---|
//! | `Eq` | `{k: v}` |
//! | `Ne`, `Gt`, `Lt`, `Gte`, `Lte` | `{k: {$ne: v}}`, `{k: {$gt: v}}`, ... |
//! | `In`, `NotIn` | `{k: {$in: v}}`, `{k: {$nin: v}}` |
//! | `Regex` | `{k: {$regex: v}}` |
//! | `ElemEq` | `{k: {$elemMatch: {$eq: v}}}` |
//! | match-all | `{}` |
//! | native text | the text, parsed as a JSON object |

use bson::{Bson, Document, doc};

use docquery_core::{
    error::DocumentStoreError,
    id::ID_FIELD,
    query::{Expr, FieldOp, QueryVisitor},
};

/// Translates predicates into MongoDB's native filter syntax.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    /// Translates a whole filter. `None` matches every document.
    pub(crate) fn translate(filter: Option<&Expr>) -> Result<Document, DocumentStoreError> {
        match filter {
            Some(expr) => MongoQueryTranslator.visit_expr(expr),
            None => Ok(doc! {}),
        }
    }

    fn visit_all(&mut self, exprs: &[Expr]) -> Result<Vec<Document>, DocumentStoreError> {
        exprs
            .iter()
            .map(|expr| self.visit_expr(expr))
            .collect()
    }
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        if exprs.is_empty() {
            return Ok(doc! {});
        }

        Ok(doc! { "$and": self.visit_all(exprs)? })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        // `$or` rejects an empty list; nothing has an `_id` in an empty set.
        if exprs.is_empty() {
            return Ok(doc! { ID_FIELD: { "$in": [] } });
        }

        Ok(doc! { "$or": self.visit_all(exprs)? })
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(doc! { "$nor": [self.visit_expr(expr)?] })
    }

    fn visit_field(&mut self, field: &str, op: FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let value = value.clone();

        Ok(match op {
            FieldOp::Eq => doc! { field: value },
            FieldOp::Ne => doc! { field: { "$ne": value } },
            FieldOp::Gt => doc! { field: { "$gt": value } },
            FieldOp::Lt => doc! { field: { "$lt": value } },
            FieldOp::Gte => doc! { field: { "$gte": value } },
            FieldOp::Lte => doc! { field: { "$lte": value } },
            FieldOp::In => doc! { field: { "$in": value } },
            FieldOp::NotIn => doc! { field: { "$nin": value } },
            FieldOp::Regex => doc! { field: { "$regex": value } },
            FieldOp::ElemEq => doc! { field: { "$elemMatch": { "$eq": value } } },
        })
    }

    fn visit_native(&mut self, text: &str) -> Result<Self::Output, Self::Error> {
        let json = serde_json::from_str::<serde_json::Value>(text)
            .map_err(|e| DocumentStoreError::Backend(format!("native filter is not valid JSON: {e}")))?;

        // Extended JSON wrappers such as `{"$oid": ..}` decode to their BSON types.
        let filter = Bson::try_from(json)
            .map_err(|e| DocumentStoreError::Backend(format!("native filter is not valid extended JSON: {e}")))?;

        match filter {
            Bson::Document(filter) => Ok(filter),
            other => Err(DocumentStoreError::Backend(format!(
                "native filter must be a JSON object, got {other}"
            ))),
        }
    }
}

//! Convenient re-exports of commonly used types from docquery.
//!
//! ```ignore
//! use docquery::prelude::*;
//! ```

pub use docquery_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    collection::{Collection, Opened},
    document::{Document, DocumentExt},
    entity::Entity,
    error::{DocumentStoreError, DocumentStoreResult},
    id::DocumentId,
    namespace::Namespace,
    query::{Expr, FieldOp, Filter, FindOptions, Query, QueryBuilder, QueryInput, Sort, SortDirection},
    store::DocumentStore,
};

//! Storage backend abstraction for the document store.
//!
//! [`StoreBackend`] is the async interface every store implements. Collections are
//! addressed by [`Namespace`] and documents by [`DocumentId`]; payloads are raw
//! [`bson::Document`] values whose `_id` field holds the identifier.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The core trait for storage backends
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances
//!
//! # Examples
//!
//! ```ignore
//! use docquery::{backend::StoreBackend, namespace::Namespace};
//! use bson::doc;
//!
//! let backend = MyBackendImpl::new();
//! let users: Namespace = "app.users".parse()?;
//!
//! backend.insert_documents(&users, vec![doc! { "_id": 1, "name": "Alice" }]).await?;
//! ```

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::DocumentStoreResult,
    id::DocumentId,
    namespace::Namespace,
    query::{Expr, Query},
};

/// Abstract interface for document storage backends.
///
/// # Thread Safety
///
/// All implementations must be thread-safe and support concurrent access from multiple
/// async tasks. The concurrency model is implementation-specific.
///
/// # Error Handling
///
/// A backend reports its own rejections as
/// [`DocumentStoreError::Backend`](crate::error::DocumentStoreError::Backend) carrying the
/// store's message. Nothing is retried.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts new documents. Every document must carry an `_id`.
    ///
    /// The collection is created implicitly when it does not exist yet.
    async fn insert_documents(
        &self,
        namespace: &Namespace,
        documents: Vec<bson::Document>,
    ) -> DocumentStoreResult<()>;

    /// Merges fields into existing documents, leaving unnamed fields untouched.
    ///
    /// Keys may be dotted paths into nested documents. Returns the number of documents matched.
    async fn update_documents(
        &self,
        namespace: &Namespace,
        changes: Vec<(DocumentId, bson::Document)>,
    ) -> DocumentStoreResult<u64>;

    /// Replaces the whole body of existing documents, keeping their `_id`.
    ///
    /// Returns the number of documents matched.
    async fn replace_documents(
        &self,
        namespace: &Namespace,
        replacements: Vec<(DocumentId, bson::Document)>,
    ) -> DocumentStoreResult<u64>;

    /// Deletes documents by identifier. Missing identifiers are skipped.
    ///
    /// Returns the number of documents deleted.
    async fn delete_documents(
        &self,
        namespace: &Namespace,
        ids: Vec<DocumentId>,
    ) -> DocumentStoreResult<u64>;

    /// Retrieves documents by identifier. Missing identifiers are omitted.
    async fn get_documents(
        &self,
        namespace: &Namespace,
        ids: Vec<DocumentId>,
    ) -> DocumentStoreResult<Vec<bson::Document>>;

    /// Runs a structured query: predicate, then sort, offset, limit and projection.
    async fn query_documents(
        &self,
        namespace: &Namespace,
        query: Query,
    ) -> DocumentStoreResult<Vec<bson::Document>>;

    /// Counts the documents matching `filter`. `None` counts every document.
    async fn count_documents(
        &self,
        namespace: &Namespace,
        filter: Option<Expr>,
    ) -> DocumentStoreResult<u64>;

    /// Creates an empty collection.
    async fn create_collection(&self, namespace: &Namespace) -> DocumentStoreResult<()>;

    /// Drops a collection and every document in it.
    async fn drop_collection(&self, namespace: &Namespace) -> DocumentStoreResult<()>;

    /// Lists the collection names of one database.
    async fn list_collections(&self, database: &str) -> DocumentStoreResult<Vec<String>>;

    /// Releases the backend's resources. The default does nothing.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<B> StoreBackend for &B
where
    B: StoreBackend,
{
    async fn insert_documents(
        &self,
        namespace: &Namespace,
        documents: Vec<bson::Document>,
    ) -> DocumentStoreResult<()> {
        (*self).insert_documents(namespace, documents).await
    }

    async fn update_documents(
        &self,
        namespace: &Namespace,
        changes: Vec<(DocumentId, bson::Document)>,
    ) -> DocumentStoreResult<u64> {
        (*self).update_documents(namespace, changes).await
    }

    async fn replace_documents(
        &self,
        namespace: &Namespace,
        replacements: Vec<(DocumentId, bson::Document)>,
    ) -> DocumentStoreResult<u64> {
        (*self).replace_documents(namespace, replacements).await
    }

    async fn delete_documents(
        &self,
        namespace: &Namespace,
        ids: Vec<DocumentId>,
    ) -> DocumentStoreResult<u64> {
        (*self).delete_documents(namespace, ids).await
    }

    async fn get_documents(
        &self,
        namespace: &Namespace,
        ids: Vec<DocumentId>,
    ) -> DocumentStoreResult<Vec<bson::Document>> {
        (*self).get_documents(namespace, ids).await
    }

    async fn query_documents(
        &self,
        namespace: &Namespace,
        query: Query,
    ) -> DocumentStoreResult<Vec<bson::Document>> {
        (*self).query_documents(namespace, query).await
    }

    async fn count_documents(
        &self,
        namespace: &Namespace,
        filter: Option<Expr>,
    ) -> DocumentStoreResult<u64> {
        (*self).count_documents(namespace, filter).await
    }

    async fn create_collection(&self, namespace: &Namespace) -> DocumentStoreResult<()> {
        (*self).create_collection(namespace).await
    }

    async fn drop_collection(&self, namespace: &Namespace) -> DocumentStoreResult<()> {
        (*self).drop_collection(namespace).await
    }

    async fn list_collections(&self, database: &str) -> DocumentStoreResult<Vec<String>> {
        (*self).list_collections(database).await
    }
}

/// Builds a backend, typically by connecting to the store.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}

//! Main document store interface for interacting with document backends.
//!
//! [`DocumentStore`] owns a backend and hands out [`Collection`]s that borrow it.
//! Collection names are compound `database.collection` names and are validated before
//! any backend call.
//!
//! # Example
//!
//! ```ignore
//! use docquery::{store::DocumentStore, memory::InMemoryStore};
//!
//! let store = DocumentStore::new(InMemoryStore::new());
//! let opened = store.open_collection("shop.orders").await?;
//! if opened.created {
//!     // first use of shop.orders
//! }
//! let pending = opened.collection.find("status == 'pending'").await?;
//! ```

use crate::{
    backend::StoreBackend,
    collection::{Collection, Opened},
    error::DocumentStoreResult,
    namespace::Namespace,
};

/// A document store bound to a specific backend implementation.
///
/// # Type Parameters
///
/// * `B` - The backend implementation type
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
}

impl<B: StoreBackend> DocumentStore<B> {
    /// Creates a new document store with the given backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Returns the backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Gets the collection named `database.collection` without touching the store.
    ///
    /// # Errors
    ///
    /// [`DocumentStoreError::Configuration`](crate::error::DocumentStoreError::Configuration)
    /// if the name is malformed.
    pub fn collection(&self, name: &str) -> DocumentStoreResult<Collection<&B>> {
        Ok(Collection::new(Namespace::parse(name)?, &self.backend))
    }

    /// Opens the collection named `database.collection`, creating it when missing.
    ///
    /// [`Opened::created`] reports whether it had to be created.
    pub async fn open_collection(&self, name: &str) -> DocumentStoreResult<Opened<&B>> {
        let collection = self.collection(name)?;
        let created = collection.ensure_exists().await?;

        Ok(Opened { collection, created })
    }

    /// Creates an empty collection.
    pub async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.backend
            .create_collection(&Namespace::parse(name)?)
            .await
    }

    /// Drops a collection and every document in it.
    pub async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.backend
            .drop_collection(&Namespace::parse(name)?)
            .await
    }

    /// Lists the collection names of `database`.
    pub async fn list_collections(&self, database: &str) -> DocumentStoreResult<Vec<String>> {
        self.backend.list_collections(database).await
    }

    /// Shuts down the store and releases backend resources.
    ///
    /// This consumes the store and should be called when no longer needed.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.backend.shutdown().await?;

        Ok(())
    }
}

//! Handles on single documents.

use bson::Bson;
use std::fmt;

use crate::{
    backend::StoreBackend,
    collection::Collection,
    error::DocumentStoreResult,
    id::DocumentId,
};

/// A document addressed by identifier within a collection.
///
/// Creating a handle does not touch the store; every method is a round trip.
#[derive(Debug)]
pub struct Entity<'a, B: StoreBackend> {
    collection: &'a Collection<B>,
    id: DocumentId,
}

impl<'a, B: StoreBackend> Entity<'a, B> {
    pub(crate) fn new(collection: &'a Collection<B>, id: DocumentId) -> Self {
        Self { collection, id }
    }

    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    /// Fetches the whole document.
    pub async fn get(&self) -> DocumentStoreResult<Option<bson::Document>> {
        self.collection.get(self.id.clone()).await
    }

    /// Fetches one top-level field. `None` if the document or the field is missing.
    pub async fn field(&self, name: &str) -> DocumentStoreResult<Option<Bson>> {
        Ok(self
            .get()
            .await?
            .and_then(|mut document| document.remove(name)))
    }

    /// Merges `changes` into the document. See [`Collection::update`].
    pub async fn update(&self, changes: bson::Document) -> DocumentStoreResult<u64> {
        self.collection.update(self.id.clone(), changes).await
    }

    /// Replaces the document body. See [`Collection::replace`].
    pub async fn replace(&self, data: bson::Document) -> DocumentStoreResult<u64> {
        self.collection.replace(self.id.clone(), data).await
    }

    pub async fn delete(&self) -> DocumentStoreResult<u64> {
        self.collection.delete(self.id.clone()).await
    }
}

impl<B: StoreBackend> fmt::Display for Entity<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.collection.namespace(), self.id)
    }
}

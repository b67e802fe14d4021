//! Collection facade: CRUD and queries against one named collection.
//!
//! A [`Collection`] pairs a [`Namespace`] with a backend. It either borrows the backend
//! of a [`DocumentStore`](crate::store::DocumentStore) (`Collection<&B>`) or owns one
//! it connected itself (`Collection<B>`, see [`Collection::connect`]).
//!
//! Queries accept anything convertible into a [`QueryInput`]: nothing (`()`), a text
//! predicate such as `"age >= 18"`, or a structured [`Expr`](crate::query::Expr).
//!
//! # Example
//!
//! ```ignore
//! use docquery::{collection::Collection, memory::InMemoryStore};
//! use bson::doc;
//!
//! let users = Collection::connect("app.users", InMemoryStore::builder()).await?.collection;
//!
//! users.insert(1, doc! { "name": "Alice", "age": 31 }).await?;
//! let adults = users.find("age >= 18").await?;
//! users.update(1, doc! { "age": 32 }).await?;
//! ```

use std::fmt;

use crate::{
    backend::{StoreBackend, StoreBackendBuilder},
    document::{Document, DocumentExt},
    entity::Entity,
    error::{DocumentStoreError, DocumentStoreResult},
    id::{DocumentId, ID_FIELD},
    namespace::Namespace,
    predicate::compile_input,
    query::{FindOptions, Query, QueryInput, SortDirection},
};

/// A collection opened by name, reporting whether opening it created it.
#[derive(Debug)]
pub struct Opened<B: StoreBackend> {
    /// The opened collection.
    pub collection: Collection<B>,
    /// `true` when the collection did not exist and was created.
    pub created: bool,
}

/// A named collection bound to a backend.
#[derive(Debug)]
pub struct Collection<B: StoreBackend> {
    namespace: Namespace,
    backend: B,
}

impl<B: StoreBackend> Collection<B> {
    /// Binds a namespace to a backend without touching the store.
    pub fn new(namespace: Namespace, backend: B) -> Self {
        Self { namespace, backend }
    }

    /// Builds a backend and opens the `database.collection` named by `name`.
    ///
    /// The name is validated before the builder runs, so a bad name never causes a
    /// connection attempt. A missing collection is created.
    ///
    /// # Errors
    ///
    /// [`DocumentStoreError::Configuration`] for a malformed name, or whatever the builder
    /// or the store reports.
    pub async fn connect<Bd>(name: &str, builder: Bd) -> DocumentStoreResult<Opened<B>>
    where
        Bd: StoreBackendBuilder<Backend = B>,
    {
        let namespace = Namespace::parse(name)?;
        let collection = Collection::new(namespace, builder.build().await?);
        let created = collection.ensure_exists().await?;

        Ok(Opened { collection, created })
    }

    /// Returns the collection's namespace.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Returns the backend this collection runs on.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Creates the collection when it is missing. Returns `true` if it was created.
    pub(crate) async fn ensure_exists(&self) -> DocumentStoreResult<bool> {
        let existing = self
            .backend
            .list_collections(self.namespace.database())
            .await?;

        if existing.iter().any(|name| name == self.namespace.collection()) {
            return Ok(false);
        }

        self.backend.create_collection(&self.namespace).await?;
        tracing::info!(namespace = %self.namespace, "collection not found, created it");

        Ok(true)
    }

    /// Retrieves one document by identifier.
    pub async fn get(&self, id: impl Into<DocumentId>) -> DocumentStoreResult<Option<bson::Document>> {
        Ok(self
            .backend
            .get_documents(&self.namespace, vec![id.into()])
            .await?
            .into_iter()
            .next())
    }

    /// Retrieves one document by identifier and deserializes it.
    pub async fn get_typed<D: Document>(&self, id: impl Into<DocumentId>) -> DocumentStoreResult<Option<D>> {
        self.get(id)
            .await?
            .map(D::from_bson_document)
            .transpose()
    }

    /// Whether a document with this identifier exists.
    pub async fn contains(&self, id: impl Into<DocumentId>) -> DocumentStoreResult<bool> {
        Ok(self.get(id).await?.is_some())
    }

    /// Stores `data` under `id`.
    ///
    /// # Errors
    ///
    /// [`DocumentStoreError::ImmutableIdentifier`] if `data` carries a different `_id`.
    /// A duplicate identifier is rejected by the store.
    pub async fn insert(
        &self,
        id: impl Into<DocumentId>,
        data: bson::Document,
    ) -> DocumentStoreResult<DocumentId> {
        let id = id.into();
        let mut document = strip_identifier(&id, data)?;
        document.insert(ID_FIELD, id.to_bson());

        self.backend
            .insert_documents(&self.namespace, vec![document])
            .await?;

        Ok(id)
    }

    /// Stores a document under its own `_id`, generating an object id when it has none.
    pub async fn insert_document(&self, mut document: bson::Document) -> DocumentStoreResult<DocumentId> {
        let id = match DocumentId::from_document(&document)? {
            Some(id) => id,
            None => {
                let id = DocumentId::generate();
                document.insert(ID_FIELD, id.to_bson());
                id
            }
        };

        self.backend
            .insert_documents(&self.namespace, vec![document])
            .await?;

        Ok(id)
    }

    /// Serializes and stores a typed document.
    pub async fn insert_typed<D: Document>(&self, document: &D) -> DocumentStoreResult<DocumentId> {
        let stored = document.to_bson_document()?;

        self.backend
            .insert_documents(&self.namespace, vec![stored])
            .await?;

        Ok(document.id())
    }

    /// Merges the fields of `changes` into the document `id`.
    ///
    /// Returns the number of documents matched, `0` or `1`.
    ///
    /// # Errors
    ///
    /// [`DocumentStoreError::ImmutableIdentifier`] if `changes` carries a different `_id`.
    pub async fn update(
        &self,
        id: impl Into<DocumentId>,
        changes: bson::Document,
    ) -> DocumentStoreResult<u64> {
        let id = id.into();
        let changes = strip_identifier(&id, changes)?;

        Ok(self
            .backend
            .update_documents(&self.namespace, vec![(id, changes)])
            .await?)
    }

    /// Merges a document into the stored document with the same `_id`.
    pub async fn update_document(&self, document: bson::Document) -> DocumentStoreResult<u64> {
        let id = required_identifier(&document)?;

        self.update(id, document).await
    }

    /// Replaces the body of the document `id`, keeping its identifier.
    ///
    /// # Errors
    ///
    /// [`DocumentStoreError::ImmutableIdentifier`] if `data` carries a different `_id`.
    pub async fn replace(
        &self,
        id: impl Into<DocumentId>,
        data: bson::Document,
    ) -> DocumentStoreResult<u64> {
        let id = id.into();
        let data = strip_identifier(&id, data)?;

        Ok(self
            .backend
            .replace_documents(&self.namespace, vec![(id, data)])
            .await?)
    }

    /// Replaces the stored document with the same `_id`.
    pub async fn replace_document(&self, document: bson::Document) -> DocumentStoreResult<u64> {
        let id = required_identifier(&document)?;

        self.replace(id, document).await
    }

    /// Deletes the document `id`. Returns the number of documents deleted.
    pub async fn delete(&self, id: impl Into<DocumentId>) -> DocumentStoreResult<u64> {
        Ok(self
            .backend
            .delete_documents(&self.namespace, vec![id.into()])
            .await?)
    }

    /// Returns every document matching `input`.
    ///
    /// # Errors
    ///
    /// Compilation errors for text predicates, and whatever the store reports.
    pub async fn find(&self, input: impl Into<QueryInput>) -> DocumentStoreResult<Vec<bson::Document>> {
        self.find_with(input, FindOptions::default()).await
    }

    /// Returns the documents matching `input`, shaped by `options`.
    pub async fn find_with(
        &self,
        input: impl Into<QueryInput>,
        options: FindOptions,
    ) -> DocumentStoreResult<Vec<bson::Document>> {
        let query = Query::with_options(compile_input(input.into())?, options);

        tracing::debug!(namespace = %self.namespace, ?query, "running query");

        Ok(self
            .backend
            .query_documents(&self.namespace, query)
            .await?)
    }

    /// Like [`Collection::find_with`], deserializing each result.
    pub async fn find_typed<D: Document>(
        &self,
        input: impl Into<QueryInput>,
        options: FindOptions,
    ) -> DocumentStoreResult<Vec<D>> {
        self.find_with(input, options)
            .await?
            .into_iter()
            .map(D::from_bson_document)
            .collect()
    }

    /// Counts the documents matching `input`.
    pub async fn count(&self, input: impl Into<QueryInput>) -> DocumentStoreResult<u64> {
        let filter = compile_input(input.into())?;
        let filter = (!filter.is_match_all()).then_some(filter);

        Ok(self
            .backend
            .count_documents(&self.namespace, filter)
            .await?)
    }

    /// Returns every document ordered by `key`, descending when `reverse` is set.
    pub async fn sort(&self, key: &str, reverse: bool) -> DocumentStoreResult<Vec<bson::Document>> {
        let direction = if reverse { SortDirection::Desc } else { SortDirection::Asc };

        self.find_with(QueryInput::Empty, FindOptions::new().sort(key, direction))
            .await
    }

    /// Returns a handle on the document `id`. The store is not consulted.
    pub fn entity(&self, id: impl Into<DocumentId>) -> Entity<'_, B> {
        Entity::new(self, id.into())
    }

    /// Shuts down the backend. Closing a collection that borrows its backend does nothing.
    pub async fn close(self) -> DocumentStoreResult<()> {
        self.backend.shutdown().await
    }
}

impl<B: StoreBackend> fmt::Display for Collection<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DB '{}'", self.namespace)
    }
}

/// Removes `_id` from a payload keyed by `id`, rejecting a conflicting one.
fn strip_identifier(id: &DocumentId, mut data: bson::Document) -> DocumentStoreResult<bson::Document> {
    if let Some(found) = data.remove(ID_FIELD) {
        let found_id = DocumentId::try_from(&found).map_err(|_| DocumentStoreError::ImmutableIdentifier {
            expected: id.to_string(),
            found: found.to_string(),
        })?;

        if &found_id != id {
            return Err(DocumentStoreError::ImmutableIdentifier {
                expected: id.to_string(),
                found: found_id.to_string(),
            });
        }
    }

    Ok(data)
}

fn required_identifier(document: &bson::Document) -> DocumentStoreResult<DocumentId> {
    DocumentId::from_document(document)?
        .ok_or_else(|| DocumentStoreError::InvalidDocument(format!("document has no {ID_FIELD} field")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn matching_identifier_is_stripped() {
        let id = DocumentId::from(7);
        let data = strip_identifier(&id, doc! { "_id": 7, "name": "x" }).unwrap();
        assert_eq!(data, doc! { "name": "x" });
    }

    #[test]
    fn conflicting_identifier_is_rejected() {
        let id = DocumentId::from("alice");
        let err = strip_identifier(&id, doc! { "_id": "bob" }).unwrap_err();
        assert!(matches!(
            err,
            DocumentStoreError::ImmutableIdentifier { ref expected, ref found }
                if expected == "alice" && found == "bob"
        ));
    }

    #[test]
    fn unsupported_identifier_is_a_conflict() {
        let id = DocumentId::from(1);
        assert!(matches!(
            strip_identifier(&id, doc! { "_id": 1.5 }),
            Err(DocumentStoreError::ImmutableIdentifier { .. })
        ));
    }

    #[test]
    fn documents_without_identifier_are_invalid() {
        assert!(matches!(
            required_identifier(&doc! { "name": "x" }),
            Err(DocumentStoreError::InvalidDocument(_))
        ));
    }
}

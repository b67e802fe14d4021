//! In-memory storage implementation for document stores.
//!
//! Documents live in per-namespace hash maps behind an async-aware read-write lock.
//! Each document remembers when it was inserted so unsorted queries return documents
//! in insertion order.

use async_trait::async_trait;
use bson::Document;
use mea::rwlock::RwLock;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use docquery_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    id::{DocumentId, ID_FIELD},
    namespace::Namespace,
    query::{Expr, Query},
};

use crate::evaluator::{DocumentEvaluator, merge, project, sort_documents};

#[derive(Debug, Default)]
struct StoredCollection {
    next_sequence: u64,
    documents: HashMap<DocumentId, (u64, Document)>,
}

impl StoredCollection {
    /// Documents in insertion order.
    fn ordered(&self) -> Vec<&Document> {
        let mut entries = self.documents.values().collect::<Vec<_>>();
        entries.sort_by_key(|(sequence, _)| *sequence);

        entries.into_iter().map(|(_, document)| document).collect()
    }

    fn matching(&self, filter: Option<&Expr>) -> DocumentStoreResult<Vec<&Document>> {
        match filter {
            Some(expr) => DocumentEvaluator::filter_documents(self.ordered(), expr),
            None => Ok(self.ordered()),
        }
    }
}

type StoreMap = HashMap<Namespace, StoredCollection>;

/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing
/// it to be safely shared across async tasks. Multiple clones of the same instance
/// share the same underlying data.
///
/// Queries scan every document of a collection; there are no indexes. Native filter
/// text is not understood and is rejected with a backend error.
///
/// # Example
///
/// ```ignore
/// use docquery_memory::InMemoryStore;
/// use docquery::{backend::StoreBackend, namespace::Namespace};
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// let users: Namespace = "app.users".parse()?;
///
/// store.insert_documents(&users, vec![doc! { "_id": 1, "name": "Alice" }]).await?;
/// let found = store.get_documents(&users, vec![1.into()]).await?;
/// assert_eq!(found.len(), 1);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self { store: Arc::new(RwLock::new(StoreMap::new())) }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_documents(&self, namespace: &Namespace, documents: Vec<Document>) -> DocumentStoreResult<()> {
        tracing::debug!(%namespace, count = documents.len(), "inserting documents");

        let mut keyed = Vec::with_capacity(documents.len());
        for document in documents {
            let id = DocumentId::from_document(&document)?.ok_or_else(|| {
                DocumentStoreError::InvalidDocument(format!("document has no {ID_FIELD} field"))
            })?;
            keyed.push((id, document));
        }

        let mut store = self.store.write().await;
        let collection = store.entry(namespace.clone()).or_default();

        let mut batch = HashSet::with_capacity(keyed.len());
        for (id, _) in &keyed {
            if collection.documents.contains_key(id) || !batch.insert(id) {
                return Err(DocumentStoreError::DocumentAlreadyExists(id.to_string(), namespace.to_string()));
            }
        }

        for (id, document) in keyed {
            let sequence = collection.next_sequence;
            collection.next_sequence += 1;
            collection.documents.insert(id, (sequence, document));
        }

        Ok(())
    }

    async fn update_documents(
        &self,
        namespace: &Namespace,
        changes: Vec<(DocumentId, Document)>,
    ) -> DocumentStoreResult<u64> {
        tracing::debug!(%namespace, count = changes.len(), "updating documents");

        let mut store = self.store.write().await;
        let Some(collection) = store.get_mut(namespace) else {
            return Ok(0);
        };

        let mut matched = 0;
        for (id, change) in changes {
            if let Some((_, document)) = collection.documents.get_mut(&id) {
                merge(document, change);
                matched += 1;
            }
        }

        Ok(matched)
    }

    async fn replace_documents(
        &self,
        namespace: &Namespace,
        replacements: Vec<(DocumentId, Document)>,
    ) -> DocumentStoreResult<u64> {
        tracing::debug!(%namespace, count = replacements.len(), "replacing documents");

        let mut store = self.store.write().await;
        let Some(collection) = store.get_mut(namespace) else {
            return Ok(0);
        };

        let mut matched = 0;
        for (id, replacement) in replacements {
            if let Some((_, document)) = collection.documents.get_mut(&id) {
                let stored_id = document.get(ID_FIELD).cloned().unwrap_or_else(|| id.to_bson());
                let mut body = Document::new();
                body.insert(ID_FIELD, stored_id);
                for (key, value) in replacement {
                    if key != ID_FIELD {
                        body.insert(key, value);
                    }
                }

                *document = body;
                matched += 1;
            }
        }

        Ok(matched)
    }

    async fn delete_documents(&self, namespace: &Namespace, ids: Vec<DocumentId>) -> DocumentStoreResult<u64> {
        tracing::debug!(%namespace, count = ids.len(), "deleting documents");

        let mut store = self.store.write().await;
        let Some(collection) = store.get_mut(namespace) else {
            return Ok(0);
        };

        Ok(ids
            .iter()
            .filter(|id| collection.documents.remove(*id).is_some())
            .count() as u64)
    }

    async fn get_documents(&self, namespace: &Namespace, ids: Vec<DocumentId>) -> DocumentStoreResult<Vec<Document>> {
        let store = self.store.read().await;
        let Some(collection) = store.get(namespace) else {
            return Ok(vec![]);
        };

        Ok(ids
            .iter()
            .filter_map(|id| collection.documents.get(id))
            .map(|(_, document)| document.clone())
            .collect())
    }

    async fn query_documents(&self, namespace: &Namespace, query: Query) -> DocumentStoreResult<Vec<Document>> {
        tracing::debug!(%namespace, ?query, "querying documents");

        let store = self.store.read().await;
        let Some(collection) = store.get(namespace) else {
            return Ok(vec![]);
        };

        let mut documents = collection.matching(query.filter.as_ref())?;
        let options = query.options;

        if !options.sort.is_empty() {
            sort_documents(&mut documents, &options.sort);
        }

        Ok(documents
            .into_iter()
            .skip(options.offset.unwrap_or(0))
            .take(options.limit.unwrap_or(usize::MAX))
            .map(|document| match &options.projection {
                Some(fields) => project(document, fields),
                None => document.clone(),
            })
            .collect())
    }

    async fn count_documents(&self, namespace: &Namespace, filter: Option<Expr>) -> DocumentStoreResult<u64> {
        let store = self.store.read().await;
        let Some(collection) = store.get(namespace) else {
            return Ok(0);
        };

        Ok(collection.matching(filter.as_ref())?.len() as u64)
    }

    async fn create_collection(&self, namespace: &Namespace) -> DocumentStoreResult<()> {
        self.store
            .write()
            .await
            .entry(namespace.clone())
            .or_default();

        Ok(())
    }

    async fn drop_collection(&self, namespace: &Namespace) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;

        if store.remove(namespace).is_none() {
            return Err(DocumentStoreError::CollectionNotFound(namespace.to_string()));
        }

        Ok(())
    }

    async fn list_collections(&self, database: &str) -> DocumentStoreResult<Vec<String>> {
        let mut names = self
            .store
            .read()
            .await
            .keys()
            .filter(|namespace| namespace.database() == database)
            .map(|namespace| namespace.collection().to_string())
            .collect::<Vec<_>>();
        names.sort();

        Ok(names)
    }
}

/// Builder for constructing [`InMemoryStore`] instances. There is nothing to configure.
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docquery_core::query::{Filter, FindOptions, SortDirection};

    fn users() -> Namespace {
        Namespace::parse("app.users").unwrap()
    }

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .insert_documents(
                &users(),
                vec![
                    doc! { "_id": 1, "name": "Alice", "age": 31 },
                    doc! { "_id": 2, "name": "Bob", "age": 25 },
                    doc! { "_id": 3, "name": "Carol", "age": 42 },
                ],
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn rejects_duplicates_without_partial_writes() {
        let store = seeded().await;
        let result = store
            .insert_documents(&users(), vec![doc! { "_id": 9 }, doc! { "_id": 1 }])
            .await;

        assert!(matches!(result, Err(DocumentStoreError::DocumentAlreadyExists(..))));
        assert!(store.get_documents(&users(), vec![9.into()]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_duplicates_within_a_batch() {
        let store = InMemoryStore::new();
        let result = store
            .insert_documents(&users(), vec![doc! { "_id": 5 }, doc! { "_id": 5_i64 }])
            .await;

        assert!(matches!(result, Err(DocumentStoreError::DocumentAlreadyExists(..))));
        assert_eq!(store.count_documents(&users(), None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn requires_identifier_on_insert() {
        let store = InMemoryStore::new();
        let result = store.insert_documents(&users(), vec![doc! { "name": "x" }]).await;
        assert!(matches!(result, Err(DocumentStoreError::InvalidDocument(_))));
    }

    #[tokio::test]
    async fn unsorted_queries_keep_insertion_order() {
        let store = seeded().await;
        let names = store
            .query_documents(&users(), Query::new())
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.get_str("name").unwrap().to_string())
            .collect::<Vec<_>>();

        assert_eq!(names, ["Alice", "Bob", "Carol"]);
    }

    #[tokio::test]
    async fn sort_offset_limit_projection() {
        let store = seeded().await;
        let query = Query::with_options(
            Filter::gt("age", 20),
            FindOptions::new()
                .sort("age", SortDirection::Desc)
                .offset(1)
                .limit(1)
                .projection(["name"]),
        );

        let found = store.query_documents(&users(), query).await.unwrap();
        assert_eq!(found, vec![doc! { "_id": 1, "name": "Alice" }]);
    }

    #[tokio::test]
    async fn merge_and_replace() {
        let store = seeded().await;

        let matched = store
            .update_documents(&users(), vec![(1.into(), doc! { "age": 32 }), (7.into(), doc! { "age": 1 })])
            .await
            .unwrap();
        assert_eq!(matched, 1);

        store
            .replace_documents(&users(), vec![(2.into(), doc! { "nick": "bobby" })])
            .await
            .unwrap();

        let found = store.get_documents(&users(), vec![1.into(), 2.into()]).await.unwrap();
        assert_eq!(found[0], doc! { "_id": 1, "name": "Alice", "age": 32 });
        assert_eq!(found[1], doc! { "_id": 2, "nick": "bobby" });
    }

    #[tokio::test]
    async fn replace_keeps_stored_identifier_type() {
        let store = seeded().await;

        store
            .replace_documents(&users(), vec![(DocumentId::from(1_i64), doc! { "_id": 1_i64, "y": 2 })])
            .await
            .unwrap();

        let found = store.get_documents(&users(), vec![1.into()]).await.unwrap();
        assert_eq!(found[0].get(ID_FIELD), Some(&bson::Bson::Int32(1)));
        assert_eq!(found[0].get_i32("y").unwrap(), 2);
        assert_eq!(found[0].len(), 2);
    }

    #[tokio::test]
    async fn counts_and_deletes() {
        let store = seeded().await;

        assert_eq!(store.count_documents(&users(), None).await.unwrap(), 3);
        assert_eq!(store.count_documents(&users(), Some(Filter::lt("age", 40))).await.unwrap(), 2);
        assert_eq!(store.delete_documents(&users(), vec![2.into(), 8.into()]).await.unwrap(), 1);
        assert_eq!(store.count_documents(&users(), None).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn collections_are_scoped_by_database() {
        let store = InMemoryStore::new();
        store.create_collection(&"app.users".parse().unwrap()).await.unwrap();
        store.create_collection(&"app.orders".parse().unwrap()).await.unwrap();
        store.create_collection(&"other.users".parse().unwrap()).await.unwrap();

        assert_eq!(store.list_collections("app").await.unwrap(), ["orders", "users"]);

        store.drop_collection(&"app.orders".parse().unwrap()).await.unwrap();
        assert!(matches!(
            store.drop_collection(&"app.orders".parse().unwrap()).await,
            Err(DocumentStoreError::CollectionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn native_filters_fail() {
        let store = seeded().await;
        let query = Query::with_options(Expr::Native("{\"age\": 1}".into()), FindOptions::new());
        assert!(matches!(
            store.query_documents(&users(), query).await,
            Err(DocumentStoreError::Backend(_))
        ));
    }
}

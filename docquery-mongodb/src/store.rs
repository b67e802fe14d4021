use async_trait::async_trait;
use bson::{Bson, Document, doc};
use futures::TryStreamExt;
use mongodb::{
    Client, Collection as MongoCollection,
    options::{ClientOptions, FindOptions},
};

use docquery_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    id::{DocumentId, ID_FIELD},
    namespace::Namespace,
    query::{Expr, Query, SortDirection},
};

use crate::query::MongoQueryTranslator;

/// Address used when no connection string or port is configured.
pub const DEFAULT_DSN: &str = "mongodb://localhost:27017";

#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
}

impl MongoDbStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn builder() -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::default()
    }

    fn get_collection(&self, namespace: &Namespace) -> MongoCollection<Document> {
        self.client
            .database(namespace.database())
            .collection(namespace.collection())
    }
}

fn store_error(e: mongodb::error::Error) -> DocumentStoreError {
    DocumentStoreError::Backend(e.to_string())
}

/// MongoDB reads a negative limit as "single batch", so oversized limits saturate.
fn find_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn id_filter(ids: Vec<DocumentId>) -> Document {
    doc! { ID_FIELD: { "$in": ids.into_iter().map(Bson::from).collect::<Vec<_>>() } }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn insert_documents(&self, namespace: &Namespace, documents: Vec<Document>) -> DocumentStoreResult<()> {
        tracing::debug!(%namespace, count = documents.len(), "inserting documents");

        self.get_collection(namespace)
            .insert_many(documents)
            .await
            .map_err(store_error)?;

        Ok(())
    }

    async fn update_documents(
        &self,
        namespace: &Namespace,
        changes: Vec<(DocumentId, Document)>,
    ) -> DocumentStoreResult<u64> {
        tracing::debug!(%namespace, count = changes.len(), "updating documents");

        let collection = self.get_collection(namespace);
        let mut matched = 0;

        for (id, change) in changes {
            let filter = doc! { ID_FIELD: id.to_bson() };

            // `$set` rejects an empty document
            matched += if change.is_empty() {
                collection.count_documents(filter).await.map_err(store_error)?
            } else {
                collection
                    .update_one(filter, doc! { "$set": change })
                    .await
                    .map_err(store_error)?
                    .matched_count
            };
        }

        Ok(matched)
    }

    async fn replace_documents(
        &self,
        namespace: &Namespace,
        replacements: Vec<(DocumentId, Document)>,
    ) -> DocumentStoreResult<u64> {
        tracing::debug!(%namespace, count = replacements.len(), "replacing documents");

        let collection = self.get_collection(namespace);
        let mut matched = 0;

        for (id, replacement) in replacements {
            matched += collection
                .replace_one(doc! { ID_FIELD: id.to_bson() }, replacement)
                .await
                .map_err(store_error)?
                .matched_count;
        }

        Ok(matched)
    }

    async fn delete_documents(&self, namespace: &Namespace, ids: Vec<DocumentId>) -> DocumentStoreResult<u64> {
        tracing::debug!(%namespace, count = ids.len(), "deleting documents");

        Ok(self
            .get_collection(namespace)
            .delete_many(id_filter(ids))
            .await
            .map_err(store_error)?
            .deleted_count)
    }

    async fn get_documents(&self, namespace: &Namespace, ids: Vec<DocumentId>) -> DocumentStoreResult<Vec<Document>> {
        let mut found = self
            .get_collection(namespace)
            .find(id_filter(ids.clone()))
            .await
            .map_err(store_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(store_error)?;

        // Results come back in natural order; callers expect request order.
        found.sort_by_key(|document| {
            DocumentId::from_document(document)
                .ok()
                .flatten()
                .and_then(|id| ids.iter().position(|wanted| *wanted == id))
                .unwrap_or(usize::MAX)
        });

        Ok(found)
    }

    async fn query_documents(&self, namespace: &Namespace, query: Query) -> DocumentStoreResult<Vec<Document>> {
        let filter = MongoQueryTranslator::translate(query.filter.as_ref())?;
        let options = query.options;

        tracing::debug!(%namespace, %filter, "querying documents");

        let mut find_options = FindOptions::default();

        find_options.limit = options.limit.map(find_limit);
        find_options.skip = options.offset.map(|skip| u64::try_from(skip).unwrap_or(u64::MAX));
        if !options.sort.is_empty() {
            find_options.sort = Some(
                options
                    .sort
                    .iter()
                    .map(|sort| {
                        let direction = match sort.direction {
                            SortDirection::Asc => 1,
                            SortDirection::Desc => -1,
                        };
                        (sort.field.clone(), Bson::Int32(direction))
                    })
                    .collect(),
            );
        }
        if let Some(fields) = &options.projection {
            find_options.projection = Some(
                fields
                    .iter()
                    .map(|field| (field.clone(), Bson::Int32(1)))
                    .collect(),
            );
        }

        self.get_collection(namespace)
            .find(filter)
            .with_options(find_options)
            .await
            .map_err(store_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(store_error)
    }

    async fn count_documents(&self, namespace: &Namespace, filter: Option<Expr>) -> DocumentStoreResult<u64> {
        self.get_collection(namespace)
            .count_documents(MongoQueryTranslator::translate(filter.as_ref())?)
            .await
            .map_err(store_error)
    }

    async fn create_collection(&self, namespace: &Namespace) -> DocumentStoreResult<()> {
        self.client
            .database(namespace.database())
            .create_collection(namespace.collection())
            .await
            .map_err(store_error)
    }

    async fn drop_collection(&self, namespace: &Namespace) -> DocumentStoreResult<()> {
        self.get_collection(namespace)
            .drop()
            .await
            .map_err(store_error)
    }

    async fn list_collections(&self, database: &str) -> DocumentStoreResult<Vec<String>> {
        self.client
            .database(database)
            .list_collection_names()
            .await
            .map_err(store_error)
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

/// Connection settings for [`MongoDbStore`].
///
/// Defaults to [`DEFAULT_DSN`]. A full connection string set with
/// [`MongoDbStoreBuilder::with_dsn`] wins over a port set with
/// [`MongoDbStoreBuilder::with_port`].
#[derive(Debug, Clone, Default)]
pub struct MongoDbStoreBuilder {
    dsn: Option<String>,
    port: Option<u16>,
}

impl MongoDbStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects to `localhost` on `port`.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Connects with a full connection string.
    pub fn with_dsn(mut self, dsn: impl Into<String>) -> Self {
        self.dsn = Some(dsn.into());
        self
    }

    /// The connection string `build` will use.
    pub fn dsn(&self) -> String {
        match (&self.dsn, self.port) {
            (Some(dsn), _) => dsn.clone(),
            (None, Some(port)) => format!("mongodb://localhost:{port}"),
            (None, None) => DEFAULT_DSN.to_string(),
        }
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        let dsn = self.dsn();
        tracing::debug!(%dsn, "connecting to MongoDB");

        Ok(MongoDbStore::new(
            Client::with_options(
                ClientOptions::parse(&dsn)
                    .await
                    .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            )
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_to_local_server() {
        assert_eq!(MongoDbStore::builder().dsn(), "mongodb://localhost:27017");
    }

    #[test]
    fn builder_port_and_dsn() {
        assert_eq!(MongoDbStoreBuilder::new().with_port(27018).dsn(), "mongodb://localhost:27018");
        assert_eq!(
            MongoDbStoreBuilder::new()
                .with_port(1)
                .with_dsn("mongodb://db.internal:27017/?replicaSet=rs0")
                .dsn(),
            "mongodb://db.internal:27017/?replicaSet=rs0"
        );
    }

    #[test]
    fn limits_never_turn_negative() {
        assert_eq!(find_limit(10), 10);
        assert_eq!(find_limit(usize::MAX), i64::MAX);
    }

    #[test]
    fn identifier_filters() {
        assert_eq!(
            id_filter(vec![DocumentId::from(1), DocumentId::from("a")]),
            doc! { "_id": { "$in": [1_i64, "a"] } }
        );
    }
}

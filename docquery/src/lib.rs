//! Main docquery crate providing a unified interface for document storage.
//!
//! This crate is the primary entry point for users of docquery. It re-exports the
//! core types from the sub-crates and gives access to the storage backends.
//!
//! # Features
//!
//! - **Text predicates** - Query with `field == value` style strings, compiled safely
//! - **Structured predicates** - Compose comparisons with `and`, `or` and `not`
//! - **Collections and entities** - CRUD by identifier with immutable `_id`s
//! - **Multiple backends** - In-memory and MongoDB storage behind one trait
//!
//! # Quick Start
//!
//! ```ignore
//! use docquery::{prelude::*, memory::InMemoryStore};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let people = docquery::connect("crm.people", InMemoryStore::builder())
//!         .await?
//!         .collection;
//!
//!     people.insert("ada", doc! { "name": "Ada", "age": 36, "langs": ["en", "fr"] }).await?;
//!     people.insert("alan", doc! { "name": "Alan", "age": 41, "langs": ["en"] }).await?;
//!
//!     // Text predicates
//!     let over_40 = people.find("age > 40").await?;
//!     let french = people.find("langs contains 'fr'").await?;
//!     let a_names = people.find("name re: ^A").await?;
//!
//!     // Structured predicates with find options
//!     let page = people
//!         .find_with(
//!             Filter::gte("age", 30).and(Filter::none_of("name", bson::bson!(["Bob"]))),
//!             FindOptions::new().sort("age", SortDirection::Desc).limit(10),
//!         )
//!         .await?;
//!
//!     // Single documents
//!     let ada = people.entity("ada");
//!     ada.update(doc! { "age": 37 }).await?;
//!     println!("{ada}: {:?}", ada.field("age").await?);
//!
//!     people.close().await
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - [`mongodb`] - MongoDB backend (requires `mongodb` feature)

pub mod prelude;

pub use docquery_core::{
    backend, collection, document, entity, error, id, literal, namespace, predicate, query, store,
};

// Re-export BSON types for convenience
pub use bson;

use docquery_core::{
    backend::StoreBackendBuilder,
    collection::{Collection, Opened},
    error::DocumentStoreResult,
};

/// Builds a backend and opens the collection `database.collection` on it.
///
/// Shorthand for [`Collection::connect`].
pub async fn connect<Bd>(name: &str, builder: Bd) -> DocumentStoreResult<Opened<Bd::Backend>>
where
    Bd: StoreBackendBuilder,
{
    Collection::connect(name, builder).await
}

/// In-memory storage backend implementations.
pub mod memory {
    pub use docquery_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docquery_mongodb::{DEFAULT_DSN, MongoDbStore, MongoDbStoreBuilder};
}

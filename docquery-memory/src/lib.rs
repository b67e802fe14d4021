//! In-memory document storage backend for docquery.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is meant for development
//! and testing.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Every predicate shape** - Comparisons, membership, patterns and element matches,
//!   with dotted paths into nested documents and arrays
//! - **Find options** - Sorting, offset, limit and projection
//!
//! # Quick Start
//!
//! ```ignore
//! use docquery::{store::DocumentStore, memory::InMemoryStore};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//!     let users = store.open_collection("app.users").await?.collection;
//!
//!     users.insert(1, doc! { "name": "Alice" }).await?;
//!     assert_eq!(users.find("name == 'Alice'").await?.len(), 1);
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docquery_memory;

pub mod evaluator;
pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};

//! MongoDB backend implementation for docquery.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait.
//! Predicates are translated into MongoDB's own filter documents and executed by the
//! server; text that is not a docquery predicate is parsed as a JSON filter and
//! forwarded as-is.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docquery = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Connection
//!
//! The builder connects to `mongodb://localhost:27017` unless told otherwise.
//!
//! # Example
//!
//! ```ignore
//! use docquery::{collection::Collection, mongodb::MongoDbStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orders = Collection::connect("shop.orders", MongoDbStore::builder().with_port(27018))
//!         .await?
//!         .collection;
//!
//!     let open = orders.find("status in ['new', 'paid']").await?;
//!     let raw = orders.find(r#"{"total": {"$gt": 100}}"#).await?;
//!
//!     orders.close().await?;
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docquery_mongodb;

pub mod query;
pub mod store;

pub use store::{DEFAULT_DSN, MongoDbStore, MongoDbStoreBuilder};

//! Document store access layer with a textual predicate mini-language.
//!
//! This crate is the core of the docquery project and provides:
//!
//! - **Literal parser** ([`literal`]) - Safe parsing of literal values written as text
//! - **Predicate compiler** ([`predicate`]) - Turns `field == value` style text into predicates
//! - **Query and filtering API** ([`query`]) - The predicate tree, find options and query input
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing different storage backends
//! - **Document store** ([`store`]) - Opens collections by `database.collection` name
//! - **Collections interface** ([`collection`]) - CRUD and queries against one collection
//! - **Entity handles** ([`entity`]) - Operations on a single document
//! - **Identity and naming** ([`id`], [`namespace`]) - Document identifiers and compound names
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! # Example
//!
//! ```ignore
//! use docquery::{store::DocumentStore, memory::InMemoryStore};
//! use bson::doc;
//!
//! let store = DocumentStore::new(InMemoryStore::new());
//! let users = store.open_collection("app.users").await?.collection;
//!
//! users.insert("alice", doc! { "age": 31, "tags": ["admin"] }).await?;
//!
//! let admins = users.find("tags contains 'admin'").await?;
//! let seniors = users.find("age >= 30").await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docquery_core;

pub mod backend;
pub mod collection;
pub mod document;
pub mod entity;
pub mod error;
pub mod id;
pub mod literal;
pub mod namespace;
pub mod predicate;
pub mod query;
pub mod store;

//! Error types and result types for document store operations.
//!
//! This module provides the error taxonomy shared by the predicate compiler,
//! the collection facade and every storage backend.
//! Use [`DocumentStoreResult<T>`] as the return type for fallible operations.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

use crate::literal::LiteralError;

/// Represents all possible errors that can occur when interacting with a document store.
///
/// Errors are surfaced to the caller as-is. Nothing here is retried: a malformed
/// predicate or a bad collection name is a programming error, not a transient condition.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// The compound `database.collection` name is malformed.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// A right-hand literal fragment could not be parsed.
    #[error("Cannot parse literal {fragment:?} at offset {offset}: {reason}")]
    LiteralParse {
        /// The fragment handed to the literal parser.
        fragment: String,
        /// Byte offset into the fragment where parsing stopped.
        offset: usize,
        /// Why the fragment was rejected.
        reason: String,
    },
    /// A recognized operator has an empty field path or an empty value.
    #[error("Malformed query: {0}")]
    MalformedQuery(String),
    /// An update or replacement tried to change a document's identifier.
    #[error("Identifier can not be changed: expected {expected}, found {found}")]
    ImmutableIdentifier {
        /// The identifier the operation is keyed by.
        expected: String,
        /// The conflicting identifier carried by the payload.
        found: String,
    },
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// A document with the given ID already exists in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document {0} already exists in collection {1}")]
    DocumentAlreadyExists(String, String),
    /// The requested collection does not exist in the store.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
    /// The document has an invalid structure (for example, a missing `_id`).
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// The backing store rejected the operation. The message is the store's own.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// A specialized `Result` type for document store operations.
///
/// This type alias is used throughout the crate to indicate operations that may fail
/// with a [`DocumentStoreError`].
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<LiteralError> for DocumentStoreError {
    fn from(err: LiteralError) -> Self {
        DocumentStoreError::LiteralParse {
            fragment: err.fragment,
            offset: err.offset,
            reason: err.kind.to_string(),
        }
    }
}

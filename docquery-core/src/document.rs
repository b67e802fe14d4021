//! Typed documents and conversions between document formats.
//!
//! Collections store raw [`bson::Document`] values. A type implementing [`Document`]
//! can be written to and read from a collection through the typed helpers on
//! [`Collection`](crate::collection::Collection); [`DocumentExt`] performs the
//! conversions.

use bson::{Bson, de::deserialize_from_bson, ser::serialize_to_bson};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, from_value, to_value};

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    id::{DocumentId, ID_FIELD},
};

/// A type that can be stored as a document.
///
/// The identifier returned by [`Document::id`] is written to the `_id` field on
/// insert, so the type does not need to serialize it under that name itself.
///
/// # Example
///
/// ```ignore
/// use docquery::{document::Document, id::DocumentId};
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct User {
///     #[serde(rename = "_id")]
///     pub id: String,
///     pub name: String,
/// }
///
/// impl Document for User {
///     fn id(&self) -> DocumentId {
///         DocumentId::from(self.id.as_str())
///     }
/// }
/// ```
pub trait Document: Serialize + DeserializeOwned + Send + Sync + Clone + 'static {
    /// Returns this document's identifier.
    fn id(&self) -> DocumentId;
}

/// Conversions for [`Document`] types. Implemented for every `D: Document`.
pub trait DocumentExt: Document {
    /// Serializes this value into a stored document with `_id` set.
    ///
    /// # Errors
    ///
    /// [`DocumentStoreError::InvalidDocument`] if the type does not serialize to a mapping,
    /// [`DocumentStoreError::ImmutableIdentifier`] if it serializes an `_id` that differs
    /// from [`Document::id`].
    fn to_bson_document(&self) -> DocumentStoreResult<bson::Document>;

    /// Deserializes a stored document.
    fn from_bson_document(document: bson::Document) -> DocumentStoreResult<Self>;

    /// Converts this value to JSON.
    fn to_json(&self) -> DocumentStoreResult<Value>;

    /// Creates a value from JSON.
    fn from_json(value: Value) -> DocumentStoreResult<Self>;
}

impl<D: Document> DocumentExt for D {
    fn to_bson_document(&self) -> DocumentStoreResult<bson::Document> {
        let id = self.id();

        let mut document = match serialize_to_bson(self)? {
            Bson::Document(document) => document,
            other => {
                return Err(DocumentStoreError::InvalidDocument(format!(
                    "expected a mapping, found {other}"
                )));
            }
        };

        match DocumentId::from_document(&document)? {
            Some(found) if found != id => Err(DocumentStoreError::ImmutableIdentifier {
                expected: id.to_string(),
                found: found.to_string(),
            }),
            _ => {
                document.insert(ID_FIELD, id.to_bson());
                Ok(document)
            }
        }
    }

    fn from_bson_document(document: bson::Document) -> DocumentStoreResult<Self> {
        Ok(deserialize_from_bson(Bson::Document(document))?)
    }

    fn to_json(&self) -> DocumentStoreResult<Value> {
        Ok(to_value(self)?)
    }

    fn from_json(value: Value) -> DocumentStoreResult<Self> {
        Ok(from_value(value)?)
    }
}

//! Document identity.
//!
//! Every stored document carries its identifier under the [`ID_FIELD`] key.
//! [`DocumentId`] is the opaque value collections are addressed by.

use bson::{Bson, Uuid, oid::ObjectId, spec::BinarySubtype};
use std::fmt;

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// The reserved field that holds a document's identifier.
pub const ID_FIELD: &str = "_id";

/// Identifier of a stored document.
///
/// Integers are normalized to 64 bits so `Int32(7)` and `Int64(7)` address the same document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocumentId {
    /// A store-generated object id.
    ObjectId(ObjectId),
    /// An integer key.
    Int(i64),
    /// A string key.
    String(String),
    /// A UUID key.
    Uuid(Uuid),
}

impl DocumentId {
    /// Generates a fresh [`ObjectId`] identifier.
    pub fn generate() -> Self {
        DocumentId::ObjectId(ObjectId::new())
    }

    /// Returns the identifier as a BSON value suitable for the `_id` field.
    pub fn to_bson(&self) -> Bson {
        match self {
            DocumentId::ObjectId(oid) => Bson::ObjectId(*oid),
            DocumentId::Int(value) => Bson::Int64(*value),
            DocumentId::String(value) => Bson::String(value.clone()),
            DocumentId::Uuid(uuid) => Bson::from(*uuid),
        }
    }

    /// Reads the identifier stored in a document's `_id` field, if any.
    pub fn from_document(document: &bson::Document) -> DocumentStoreResult<Option<Self>> {
        document
            .get(ID_FIELD)
            .map(DocumentId::try_from)
            .transpose()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentId::ObjectId(oid) => write!(f, "ObjectId({oid})"),
            DocumentId::Int(value) => write!(f, "{value}"),
            DocumentId::String(value) => write!(f, "{value}"),
            DocumentId::Uuid(uuid) => write!(f, "UUID({uuid})"),
        }
    }
}

impl TryFrom<&Bson> for DocumentId {
    type Error = DocumentStoreError;

    fn try_from(value: &Bson) -> DocumentStoreResult<Self> {
        match value {
            Bson::ObjectId(oid) => Ok(DocumentId::ObjectId(*oid)),
            Bson::Int32(value) => Ok(DocumentId::Int(i64::from(*value))),
            Bson::Int64(value) => Ok(DocumentId::Int(*value)),
            Bson::String(value) => Ok(DocumentId::String(value.clone())),
            Bson::Binary(binary) if binary.subtype == BinarySubtype::Uuid => binary
                .to_uuid()
                .map(DocumentId::Uuid)
                .map_err(|e| DocumentStoreError::InvalidDocument(e.to_string())),
            other => Err(DocumentStoreError::InvalidDocument(format!(
                "unsupported identifier type: {other}"
            ))),
        }
    }
}

impl TryFrom<Bson> for DocumentId {
    type Error = DocumentStoreError;

    fn try_from(value: Bson) -> DocumentStoreResult<Self> {
        DocumentId::try_from(&value)
    }
}

impl From<DocumentId> for Bson {
    fn from(id: DocumentId) -> Self {
        id.to_bson()
    }
}

impl From<ObjectId> for DocumentId {
    fn from(oid: ObjectId) -> Self {
        DocumentId::ObjectId(oid)
    }
}

impl From<i64> for DocumentId {
    fn from(value: i64) -> Self {
        DocumentId::Int(value)
    }
}

impl From<i32> for DocumentId {
    fn from(value: i32) -> Self {
        DocumentId::Int(i64::from(value))
    }
}

impl From<String> for DocumentId {
    fn from(value: String) -> Self {
        DocumentId::String(value)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        DocumentId::String(value.to_string())
    }
}

impl From<Uuid> for DocumentId {
    fn from(uuid: Uuid) -> Self {
        DocumentId::Uuid(uuid)
    }
}

impl From<uuid::Uuid> for DocumentId {
    fn from(uuid: uuid::Uuid) -> Self {
        DocumentId::Uuid(Uuid::from(uuid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn integers_normalize() {
        assert_eq!(DocumentId::try_from(Bson::Int32(7)).unwrap(), DocumentId::Int(7));
        assert_eq!(DocumentId::try_from(Bson::Int64(7)).unwrap(), DocumentId::from(7));
    }

    #[test]
    fn reads_id_field() {
        let oid = ObjectId::new();
        let document = doc! { "_id": oid, "name": "x" };
        assert_eq!(
            DocumentId::from_document(&document).unwrap(),
            Some(DocumentId::ObjectId(oid))
        );
        assert_eq!(DocumentId::from_document(&doc! { "name": "x" }).unwrap(), None);
    }

    #[test]
    fn uuid_round_trips_through_bson() {
        let id = DocumentId::from(uuid::Uuid::new_v4());
        assert_eq!(DocumentId::try_from(id.to_bson()).unwrap(), id);
    }

    #[test]
    fn rejects_unsupported_types() {
        assert!(matches!(
            DocumentId::try_from(Bson::Double(1.5)),
            Err(DocumentStoreError::InvalidDocument(_))
        ));
    }

    #[test]
    fn display() {
        assert_eq!(DocumentId::from("alice").to_string(), "alice");
        assert_eq!(DocumentId::from(3).to_string(), "3");
    }
}

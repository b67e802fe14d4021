//! Compound `database.collection` names.

use std::{fmt, str::FromStr};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// A fully qualified collection name.
///
/// Parsed from the compound form `database.collection`. The first `.` separates the
/// two segments, so `app.audit.log` names the `audit.log` collection of `app`.
///
/// # Example
///
/// ```ignore
/// use docquery_core::namespace::Namespace;
///
/// let ns: Namespace = "shop.orders".parse()?;
/// assert_eq!(ns.database(), "shop");
/// assert_eq!(ns.collection(), "orders");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    database: String,
    collection: String,
}

impl Namespace {
    /// Builds a namespace from its two segments, rejecting blank ones.
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> DocumentStoreResult<Self> {
        let (database, collection) = (database.into(), collection.into());

        if database.trim().is_empty() || collection.trim().is_empty() {
            return Err(DocumentStoreError::Configuration(format!(
                "database and collection names must not be blank, got {database:?}.{collection:?}"
            )));
        }

        Ok(Self { database, collection })
    }

    /// Parses a compound `database.collection` name.
    pub fn parse(name: &str) -> DocumentStoreResult<Self> {
        let (database, collection) = name.split_once('.').ok_or_else(|| {
            DocumentStoreError::Configuration(format!(
                "expected a name of the form 'database.collection', got {name:?}"
            ))
        })?;

        Self::new(database, collection)
    }

    /// Returns the database segment.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Returns the collection segment.
    pub fn collection(&self) -> &str {
        &self.collection
    }
}

impl FromStr for Namespace {
    type Err = DocumentStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Namespace::parse(s)
    }
}

impl TryFrom<&str> for Namespace {
    type Error = DocumentStoreError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Namespace::parse(value)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

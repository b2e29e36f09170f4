pub mod manager;
pub mod memory;
pub mod postgres;
pub mod repository;
pub mod results;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::filter::{Filter, Window};

pub use manager::{connect, DatabaseError};
pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;
pub use repository::Repository;
pub use results::{DeleteResult, InsertOneResult, UpdateResult};

/// A schemaless stored record
pub type Document = Map<String, Value>;

/// Field every stored document carries its identity in
pub const ID_FIELD: &str = "_id";

/// The collections the inventory API reads and writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Items,
    Overview,
    Profile,
}

impl Collection {
    pub const fn name(self) -> &'static str {
        match self {
            Collection::Items => "items",
            Collection::Overview => "overview",
            Collection::Profile => "profile",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Store-native document identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for DocumentId {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(DocumentId)
            .map_err(|_| DatabaseError::InvalidId(s.to_string()))
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl From<DocumentId> for Value {
    fn from(id: DocumentId) -> Self {
        Value::String(id.to_string())
    }
}

/// Contract the route layer needs from a document database.
///
/// Every operation touches a single document or reads a snapshot; nothing
/// here spans documents atomically.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Documents matching `filter` in natural (insertion) order, optionally windowed
    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        window: Option<Window>,
    ) -> Result<Vec<Document>, DatabaseError>;

    /// First matching document in natural order
    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Option<Document>, DatabaseError>;

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, DatabaseError>;

    /// Insert a document, assigning `_id` when the caller did not supply one
    async fn insert_one(
        &self,
        collection: Collection,
        document: Document,
    ) -> Result<InsertOneResult, DatabaseError>;

    /// Set the given fields on the document with `id`, creating it if absent
    async fn upsert_one(
        &self,
        collection: Collection,
        id: DocumentId,
        set: Document,
    ) -> Result<UpdateResult, DatabaseError>;

    /// Delete the first matching document, if any
    async fn delete_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<DeleteResult, DatabaseError>;

    async fn ping(&self) -> Result<(), DatabaseError>;

    /// Release connections; called once on shutdown
    async fn close(&self) {}
}

/// Resolve the id of a document about to be inserted.
///
/// A caller-supplied `_id` must be a valid identifier string; otherwise a
/// fresh one is generated and written into the document.
pub(crate) fn assign_id(document: &mut Document) -> Result<DocumentId, DatabaseError> {
    match document.get(ID_FIELD) {
        Some(Value::String(s)) => {
            let id: DocumentId = s.parse()?;
            document.insert(ID_FIELD.to_string(), id.into());
            Ok(id)
        }
        Some(other) => Err(DatabaseError::InvalidId(other.to_string())),
        None => {
            let id = DocumentId::new();
            document.insert(ID_FIELD.to_string(), id.into());
            Ok(id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_and_normalises_ids() {
        let id: DocumentId = "6F9619FF-8B86-D011-B42D-00C04FC964FF".parse().unwrap();
        assert_eq!(id.to_string(), "6f9619ff-8b86-d011-b42d-00c04fc964ff");
    }

    #[test]
    fn rejects_malformed_ids() {
        let err = "not-an-id".parse::<DocumentId>().unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidId(ref s) if s == "not-an-id"));
    }

    #[test]
    fn assigns_fresh_id_when_absent() {
        let mut doc = json!({ "brand": "Acme" }).as_object().cloned().unwrap();
        let id = assign_id(&mut doc).unwrap();
        assert_eq!(doc[ID_FIELD], json!(id.to_string()));
    }

    #[test]
    fn keeps_supplied_id() {
        let supplied = DocumentId::new();
        let mut doc = json!({ "_id": supplied.to_string() }).as_object().cloned().unwrap();
        assert_eq!(assign_id(&mut doc).unwrap(), supplied);
    }

    #[test]
    fn rejects_non_string_supplied_id() {
        let mut doc = json!({ "_id": 42 }).as_object().cloned().unwrap();
        assert!(matches!(assign_id(&mut doc), Err(DatabaseError::InvalidId(_))));
    }
}

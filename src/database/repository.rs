use std::sync::Arc;

use tracing::debug;

use crate::database::{
    Collection, DatabaseError, DeleteResult, Document, DocumentId, DocumentStore,
    InsertOneResult, UpdateResult,
};
use crate::filter::{Filter, Window};

/// A document store handle bound to one collection
#[derive(Clone)]
pub struct Repository {
    collection: Collection,
    store: Arc<dyn DocumentStore>,
}

impl Repository {
    pub fn new(collection: Collection, store: Arc<dyn DocumentStore>) -> Self {
        Self { collection, store }
    }

    pub async fn select_any(
        &self,
        filter: Filter,
        window: Option<Window>,
    ) -> Result<Vec<Document>, DatabaseError> {
        debug!(collection = %self.collection, ?filter, ?window, "select_any");
        self.store.find(self.collection, &filter, window).await
    }

    pub async fn select_one(&self, filter: Filter) -> Result<Option<Document>, DatabaseError> {
        self.store.find_one(self.collection, &filter).await
    }

    pub async fn count(&self, filter: Filter) -> Result<u64, DatabaseError> {
        self.store.count(self.collection, &filter).await
    }

    pub async fn insert(&self, document: Document) -> Result<InsertOneResult, DatabaseError> {
        let result = self.store.insert_one(self.collection, document).await?;
        debug!(collection = %self.collection, id = %result.inserted_id, "inserted document");
        Ok(result)
    }

    pub async fn upsert(&self, id: DocumentId, set: Document) -> Result<UpdateResult, DatabaseError> {
        let result = self.store.upsert_one(self.collection, id, set).await?;
        debug!(
            collection = %self.collection,
            %id,
            matched = result.matched_count,
            modified = result.modified_count,
            upserted = result.upserted_count,
            "upserted document"
        );
        Ok(result)
    }

    pub async fn delete(&self, filter: Filter) -> Result<DeleteResult, DatabaseError> {
        self.store.delete_one(self.collection, &filter).await
    }
}

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{
    assign_id, Collection, DatabaseError, DeleteResult, Document, DocumentId, DocumentStore,
    InsertOneResult, UpdateResult, ID_FIELD,
};
use crate::filter::{Filter, Window};

/// In-process document store.
///
/// Documents live in insertion order per collection, which doubles as the
/// natural order reads return. Each operation holds the lock for its whole
/// duration, so single-document writes are atomic.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<Collection, Vec<Document>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn has_id(document: &Document, id: &str) -> bool {
    matches!(document.get(ID_FIELD), Some(Value::String(s)) if s == id)
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        window: Option<Window>,
    ) -> Result<Vec<Document>, DatabaseError> {
        if let Some(window) = &window {
            window.validate()?;
        }

        let collections = self.collections.read().await;
        let matched: Vec<Document> = collections
            .get(&collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default();

        Ok(match window {
            Some(window) => window.apply(matched),
            None => matched,
        })
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Option<Document>, DatabaseError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.iter().find(|d| filter.matches(d)).cloned()))
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, DatabaseError> {
        let collections = self.collections.read().await;
        let count = collections
            .get(&collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn insert_one(
        &self,
        collection: Collection,
        mut document: Document,
    ) -> Result<InsertOneResult, DatabaseError> {
        let id = assign_id(&mut document)?;
        let key = id.to_string();

        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection).or_default();
        if docs.iter().any(|d| has_id(d, &key)) {
            return Err(DatabaseError::DuplicateKey(format!("{}.{}", collection, key)));
        }
        docs.push(document);

        Ok(InsertOneResult::new(id))
    }

    async fn upsert_one(
        &self,
        collection: Collection,
        id: DocumentId,
        set: Document,
    ) -> Result<UpdateResult, DatabaseError> {
        let key = id.to_string();

        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection).or_default();

        if let Some(existing) = docs.iter_mut().find(|d| has_id(d, &key)) {
            let mut updated = existing.clone();
            updated.extend(set);
            let modified = updated != *existing;
            *existing = updated;
            return Ok(UpdateResult::matched(modified));
        }

        let mut document = Document::new();
        document.insert(ID_FIELD.to_string(), id.into());
        document.extend(set);
        docs.push(document);

        Ok(UpdateResult::upserted(id))
    }

    async fn delete_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<DeleteResult, DatabaseError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(DeleteResult::new(0));
        };

        match docs.iter().position(|d| filter.matches(d)) {
            Some(index) => {
                docs.remove(index);
                Ok(DeleteResult::new(1))
            }
            None => Ok(DeleteResult::new(0)),
        }
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    async fn seeded(brands: &[&str]) -> MemoryDocumentStore {
        let store = MemoryDocumentStore::new();
        for (i, brand) in brands.iter().enumerate() {
            store
                .insert_one(Collection::Items, doc(json!({ "brand": brand, "n": i })))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn find_preserves_insertion_order() {
        let store = seeded(&["a", "b", "c"]).await;
        let docs = store.find(Collection::Items, &Filter::all(), None).await.unwrap();
        let ns: Vec<_> = docs.iter().map(|d| d["n"].clone()).collect();
        assert_eq!(ns, vec![json!(0), json!(1), json!(2)]);
    }

    #[tokio::test]
    async fn find_applies_window_after_filter() {
        let store = seeded(&["x", "y", "x", "x", "y"]).await;
        let filter = Filter::all().eq("brand", "x");
        let docs = store
            .find(Collection::Items, &filter, Some(Window { skip: 1, limit: 1 }))
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["n"], json!(2));
    }

    #[tokio::test]
    async fn find_rejects_negative_skip() {
        let store = seeded(&["a"]).await;
        let err = store
            .find(Collection::Items, &Filter::all(), Some(Window { skip: -2, limit: 2 }))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn collections_are_isolated() {
        let store = seeded(&["a"]).await;
        assert_eq!(store.count(Collection::Profile, &Filter::all()).await.unwrap(), 0);
        assert!(store.find_one(Collection::Overview, &Filter::all()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_returns_findable_id() {
        let store = MemoryDocumentStore::new();
        let result = store
            .insert_one(Collection::Items, doc(json!({ "brand": "X", "quantity": 5 })))
            .await
            .unwrap();
        assert!(result.acknowledged);

        let found = store
            .find_one(Collection::Items, &Filter::by_id(result.inserted_id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found["brand"], json!("X"));
        assert_eq!(found["quantity"], json!(5));
    }

    #[tokio::test]
    async fn insert_with_duplicate_id_fails() {
        let store = MemoryDocumentStore::new();
        let id = DocumentId::new();
        let body = doc(json!({ "_id": id.to_string() }));
        store.insert_one(Collection::Items, body.clone()).await.unwrap();
        let err = store.insert_one(Collection::Items, body).await.unwrap_err();
        assert!(matches!(err, DatabaseError::DuplicateKey(_)));
    }

    #[tokio::test]
    async fn upsert_creates_then_updates() {
        let store = MemoryDocumentStore::new();
        let id = DocumentId::new();

        let first = store
            .upsert_one(Collection::Items, id, doc(json!({ "quantity": 3 })))
            .await
            .unwrap();
        assert_eq!(first, UpdateResult::upserted(id));

        let second = store
            .upsert_one(Collection::Items, id, doc(json!({ "quantity": 3 })))
            .await
            .unwrap();
        assert_eq!(second, UpdateResult::matched(false));

        let third = store
            .upsert_one(Collection::Items, id, doc(json!({ "quantity": 7 })))
            .await
            .unwrap();
        assert_eq!(third, UpdateResult::matched(true));

        let stored = store.find_one(Collection::Items, &Filter::by_id(id)).await.unwrap().unwrap();
        assert_eq!(stored["quantity"], json!(7));
        assert_eq!(store.count(Collection::Items, &Filter::all()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn upsert_keeps_untouched_fields() {
        let store = MemoryDocumentStore::new();
        let inserted = store
            .insert_one(Collection::Items, doc(json!({ "brand": "Acme", "quantity": 1 })))
            .await
            .unwrap();
        store
            .upsert_one(Collection::Items, inserted.inserted_id, doc(json!({ "quantity": 9 })))
            .await
            .unwrap();

        let stored = store
            .find_one(Collection::Items, &Filter::by_id(inserted.inserted_id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored["brand"], json!("Acme"));
        assert_eq!(stored["quantity"], json!(9));
    }

    #[tokio::test]
    async fn delete_removes_only_first_match() {
        let store = seeded(&["x", "x"]).await;
        let filter = Filter::all().eq("brand", "x");
        assert_eq!(store.delete_one(Collection::Items, &filter).await.unwrap(), DeleteResult::new(1));
        assert_eq!(store.count(Collection::Items, &filter).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_missing_is_zero_not_error() {
        let store = MemoryDocumentStore::new();
        let result = store
            .delete_one(Collection::Items, &Filter::by_id(DocumentId::new()))
            .await
            .unwrap();
        assert_eq!(result, DeleteResult::new(0));
    }
}

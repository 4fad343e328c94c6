//! In-process document store.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::document::{Document, DocumentStore, Query, StoreError};

type Collection = BTreeMap<String, Document>;

/// A document store held in memory.
///
/// Cloning is cheap and clones share the same data. Every mutation runs
/// under a single write lock, so `merge_array_field` is atomic.
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection.
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, |c| c.len())
    }
}

impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).and_then(|c| c.get(key)).cloned())
    }

    async fn create(&self, collection: &str, data: Document) -> Result<String, StoreError> {
        let key = Uuid::new_v4().simple().to_string();
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(key.clone(), data);
        Ok(key)
    }

    async fn set(&self, collection: &str, key: &str, data: Document) -> Result<(), StoreError> {
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), data);
        Ok(())
    }

    async fn update(&self, collection: &str, key: &str, fields: Document) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(doc) = collections.get_mut(collection).and_then(|c| c.get_mut(key)) else {
            return Ok(false);
        };
        doc.extend(fields);
        Ok(true)
    }

    async fn merge_array_field(
        &self,
        collection: &str,
        key: &str,
        field: &str,
        values: Vec<Value>,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let doc = collections
            .entry(collection.to_string())
            .or_default()
            .entry(key.to_string())
            .or_default();

        let slot = doc
            .entry(field.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        let Value::Array(existing) = slot else {
            return Err(StoreError::Corrupt {
                collection: collection.to_string(),
                key: key.to_string(),
                message: format!("field {field} is not an array"),
            });
        };

        for value in values {
            if !existing.contains(&value) {
                existing.push(value);
            }
        }
        Ok(())
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<(String, Document)>, StoreError> {
        let collections = self.collections.read().await;
        let docs = collections
            .get(collection)
            .into_iter()
            .flat_map(|c| c.iter().map(|(k, d)| (k.clone(), d.clone())));
        Ok(query.apply(docs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Document {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn create_generates_distinct_keys() {
        let store = MemoryStore::new();
        let a = store.create("c", doc(json!({"x": 1}))).await.unwrap();
        let b = store.create("c", doc(json!({"x": 2}))).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.get("c", &a).await.unwrap().unwrap()["x"], 1);
        assert_eq!(store.count("c").await, 2);
    }

    #[tokio::test]
    async fn get_missing_is_none() {
        let store = MemoryStore::new();
        assert!(store.get("c", "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_merges_fields() {
        let store = MemoryStore::new();
        store.set("c", "k", doc(json!({"a": 1, "b": 2}))).await.unwrap();
        assert!(store.update("c", "k", doc(json!({"b": 3}))).await.unwrap());
        assert_eq!(store.get("c", "k").await.unwrap().unwrap(), doc(json!({"a": 1, "b": 3})));
        assert!(!store.update("c", "other", doc(json!({"b": 3}))).await.unwrap());
    }

    #[tokio::test]
    async fn merge_creates_and_unions() {
        let store = MemoryStore::new();
        store
            .merge_array_field("bookings", "02_2025-07-01", "seats", vec![json!("A1"), json!("A2")])
            .await
            .unwrap();
        store
            .merge_array_field("bookings", "02_2025-07-01", "seats", vec![json!("A2"), json!("B1")])
            .await
            .unwrap();
        let d = store.get("bookings", "02_2025-07-01").await.unwrap().unwrap();
        assert_eq!(d["seats"], json!(["A1", "A2", "B1"]));
    }

    #[tokio::test]
    async fn merge_into_non_array_is_corrupt() {
        let store = MemoryStore::new();
        store.set("c", "k", doc(json!({"seats": "A1"}))).await.unwrap();
        let err = store
            .merge_array_field("c", "k", "seats", vec![json!("A2")])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn concurrent_merges_converge() {
        let store = MemoryStore::new();
        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .merge_array_field("c", "k", "seats", vec![json!(format!("S{i}"))])
                        .await
                })
            })
            .collect();
        for t in tasks {
            t.await.unwrap().unwrap();
        }
        let d = store.get("c", "k").await.unwrap().unwrap();
        assert_eq!(d["seats"].as_array().unwrap().len(), 20);
    }
}

//! In-memory resource store.
//!
//! Records are stored as their serialised JSON, keyed by
//! `(resource_type, id)` in a [`DashMap`]. A transaction is a read-only
//! view of the shared map; commit has nothing to flush.
//!
//! # Examples
//!
//! ```
//! use restcmd::store::{id_filter, InMemoryResourceStore, ResourceStore};
//! use serde_json::json;
//!
//! # let rt = tokio::runtime::Runtime::new().unwrap();
//! # rt.block_on(async {
//! let store = InMemoryResourceStore::new();
//! store.insert_value("host", "1", json!({"id": "1", "name": "web1"}));
//!
//! let mut tx = store.begin().await.unwrap();
//! assert_eq!(tx.count("host", &id_filter("1")).await.unwrap(), 1);
//! assert_eq!(tx.count("host", &id_filter("2")).await.unwrap(), 0);
//! tx.commit().await.unwrap();
//! # });
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use super::{Filter, ResourceStore, Transaction};
use crate::error::StoreError;
use crate::resource::Resource;

type RecordKey = (String, String);

/// Thread-safe in-memory store using [`DashMap`].
#[derive(Debug, Default, Clone)]
pub struct InMemoryResourceStore {
    records: Arc<DashMap<RecordKey, Value>>,
}

impl InMemoryResourceStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `resource` under its type and id, replacing any previous
    /// record.
    ///
    /// # Errors
    ///
    /// Fails if the resource cannot be serialised.
    pub fn insert(&self, resource: &dyn Resource) -> Result<(), serde_json::Error> {
        let value = resource.to_json()?;
        self.insert_value(resource.resource_type(), resource.id(), value);
        Ok(())
    }

    /// Stores a raw JSON record.
    pub fn insert_value(&self, resource_type: &str, id: &str, value: Value) {
        self.records
            .insert((resource_type.to_string(), id.to_string()), value);
    }

    /// Removes a record, returning it if it existed.
    pub fn remove(&self, resource_type: &str, id: &str) -> Option<Value> {
        self.records
            .remove(&(resource_type.to_string(), id.to_string()))
            .map(|(_, value)| value)
    }

    /// Returns a copy of a record.
    pub fn get(&self, resource_type: &str, id: &str) -> Option<Value> {
        self.records
            .get(&(resource_type.to_string(), id.to_string()))
            .map(|entry| entry.value().clone())
    }

    /// Applies `attrs` on top of an existing record.
    ///
    /// Returns `false` if the record does not exist or is not an object.
    pub fn merge(&self, resource_type: &str, id: &str, attrs: &Filter) -> bool {
        let key = (resource_type.to_string(), id.to_string());
        match self.records.get_mut(&key) {
            Some(mut entry) => match entry.value_mut() {
                Value::Object(fields) => {
                    for (name, value) in attrs {
                        fields.insert(name.clone(), value.clone());
                    }
                    true
                }
                _ => false,
            },
            None => false,
        }
    }

    /// Records of `resource_type` matching `filter`.
    pub fn find(&self, resource_type: &str, filter: &Filter) -> Vec<Value> {
        self.records
            .iter()
            .filter(|entry| matches(entry.key(), entry.value(), resource_type, filter))
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Number of records of every type.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the store holds no record.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// `id` matches the key; every other filter entry must equal the field of
/// the same name in the stored record.
fn matches(key: &RecordKey, record: &Value, resource_type: &str, filter: &Filter) -> bool {
    if key.0 != resource_type {
        return false;
    }
    filter.iter().all(|(field, expected)| {
        if field == "id" {
            return expected.as_str() == Some(key.1.as_str());
        }
        record.get(field) == Some(expected)
    })
}

#[async_trait]
impl ResourceStore for InMemoryResourceStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError> {
        Ok(Box::new(InMemoryTransaction {
            records: Arc::clone(&self.records),
        }))
    }
}

struct InMemoryTransaction {
    records: Arc<DashMap<RecordKey, Value>>,
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    async fn count(&mut self, resource_type: &str, filter: &Filter) -> Result<u64, StoreError> {
        let count = self
            .records
            .iter()
            .filter(|entry| matches(entry.key(), entry.value(), resource_type, filter))
            .count();
        Ok(count as u64)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::id_filter;
    use serde_json::json;

    fn seeded() -> InMemoryResourceStore {
        let store = InMemoryResourceStore::new();
        store.insert_value("host", "1", json!({"id": "1", "name": "web1", "zone": "a"}));
        store.insert_value("host", "2", json!({"id": "2", "name": "web2", "zone": "a"}));
        store.insert_value("zone", "1", json!({"id": "1", "name": "a"}));
        store
    }

    #[tokio::test]
    async fn count_by_id_is_scoped_to_type() {
        let store = seeded();
        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.count("host", &id_filter("1")).await.unwrap(), 1);
        assert_eq!(tx.count("zone", &id_filter("2")).await.unwrap(), 0);
        assert_eq!(tx.count("view", &id_filter("1")).await.unwrap(), 0);
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn count_by_field() {
        let store = seeded();
        let mut tx = store.begin().await.unwrap();
        let mut filter = Filter::new();
        filter.insert("zone".to_string(), json!("a"));
        assert_eq!(tx.count("host", &filter).await.unwrap(), 2);
        assert_eq!(tx.count("host", &Filter::new()).await.unwrap(), 2);
    }

    #[test]
    fn merge_and_remove() {
        let store = seeded();
        let mut attrs = Filter::new();
        attrs.insert("name".to_string(), json!("web9"));
        assert!(store.merge("host", "1", &attrs));
        assert_eq!(store.get("host", "1").unwrap()["name"], json!("web9"));
        assert!(!store.merge("host", "7", &attrs));

        assert!(store.remove("host", "1").is_some());
        assert!(store.get("host", "1").is_none());
        assert_eq!(store.len(), 2);
    }
}

//! In-process stores for tests and local demos.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::Serialize;

use super::{KeyValueStore, ObjectStore, StoreError, StoredObject};

/// Key-value bucket held in memory. Keys list in sorted order.
#[derive(Debug, Default)]
pub struct MemoryKeyValue {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryKeyValue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw bytes under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn insert(&self, key: impl Into<String>, value: Vec<u8>) -> Result<(), StoreError> {
        self.entries
            .write()
            .map_err(|_| StoreError::Backend("Lock poisoned".to_string()))?
            .insert(key.into(), value);
        Ok(())
    }

    /// Store `value` JSON-encoded under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or the lock is poisoned.
    pub fn insert_json<T: Serialize>(
        &self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(value).map_err(|e| StoreError::Backend(e.to_string()))?;
        self.insert(key, bytes)
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValue {
    async fn keys(&self, limit: usize) -> Result<Vec<String>, StoreError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StoreError::Backend("Lock poisoned".to_string()))?;
        Ok(entries.keys().take(limit).cloned().collect())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StoreError::Backend("Lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }
}

/// Object-store bucket held in memory.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn insert(
        &self,
        key: impl Into<String>,
        data: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), StoreError> {
        self.objects
            .write()
            .map_err(|_| StoreError::Backend("Lock poisoned".to_string()))?
            .insert(
                key.into(),
                StoredObject {
                    data,
                    content_type: content_type.map(str::to_string),
                },
            );
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StoreError> {
        let objects = self
            .objects
            .read()
            .map_err(|_| StoreError::Backend("Lock poisoned".to_string()))?;
        Ok(objects.get(key).cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_keys_respect_limit() {
        let store = MemoryKeyValue::new();
        for key in ["1163", "1164", "1165"] {
            store.insert(key, b"{}".to_vec()).unwrap();
        }

        assert_eq!(store.keys(2).await.unwrap(), vec!["1163", "1164"]);
        assert_eq!(store.keys(10).await.unwrap().len(), 3);
        assert!(store.keys(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_entries_are_none() {
        let kv = MemoryKeyValue::new();
        assert!(kv.get("43059").await.unwrap().is_none());

        let objects = MemoryObjectStore::new();
        assert!(objects.get("43059/default.jpg").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_object_round_trip_keeps_content_type() {
        let objects = MemoryObjectStore::new();
        objects
            .insert("1/front.png", vec![1, 2, 3], Some("image/png"))
            .unwrap();

        let object = objects.get("1/front.png").await.unwrap().unwrap();
        assert_eq!(object.data, vec![1, 2, 3]);
        assert_eq!(object.content_type.as_deref(), Some("image/png"));
    }
}

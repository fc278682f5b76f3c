//! Ephemeral (in-memory) [`StorageProvider`], for tests and CI.
//!
//! Grounded on the `MemoryKvStore` composite-key scheme used elsewhere
//! in this codebase's storage layer, extended with TTL and quota
//! accounting.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use trikhub_core::TrikId;

use crate::error::{StorageError, StorageResult};
use crate::provider::{DEFAULT_MAX_SIZE_BYTES, StorageEntry, StorageProvider, json_byte_size};

#[derive(Default)]
struct Namespace {
    entries: HashMap<String, StorageEntry>,
}

impl Namespace {
    fn sweep_expired(&mut self) {
        let now = Utc::now();
        self.entries.retain(|_, e| match e.expires_at {
            Some(exp) => exp > now,
            None => true,
        });
    }

    fn usage_bytes(&self) -> u64 {
        self.entries
            .values()
            .map(|e| json_byte_size(&e.value))
            .sum()
    }
}

/// In-memory [`StorageProvider`]. Data does not survive process restart.
pub struct MemoryStorageProvider {
    namespaces: RwLock<HashMap<String, Namespace>>,
    max_size_bytes: u64,
}

impl MemoryStorageProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_size_bytes(DEFAULT_MAX_SIZE_BYTES)
    }

    #[must_use]
    pub fn with_max_size_bytes(max_size_bytes: u64) -> Self {
        Self {
            namespaces: RwLock::new(HashMap::new()),
            max_size_bytes,
        }
    }
}

impl Default for MemoryStorageProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageProvider for MemoryStorageProvider {
    async fn get(&self, trik_id: &TrikId, key: &str) -> StorageResult<Option<Value>> {
        let mut guard = self.namespaces.write().unwrap();
        let ns = guard.entry(trik_id.as_str().to_string()).or_default();
        ns.sweep_expired();
        Ok(ns.entries.get(key).map(|e| e.value.clone()))
    }

    async fn set(
        &self,
        trik_id: &TrikId,
        key: &str,
        value: Value,
        ttl_ms: Option<u64>,
    ) -> StorageResult<()> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey("key must not be empty".into()));
        }
        let new_bytes = json_byte_size(&value);

        let mut guard = self.namespaces.write().unwrap();
        let ns = guard.entry(trik_id.as_str().to_string()).or_default();
        ns.sweep_expired();

        let old_bytes = ns.entries.get(key).map(|e| json_byte_size(&e.value)).unwrap_or(0);
        let current = ns.usage_bytes();
        let projected = current.saturating_sub(old_bytes).saturating_add(new_bytes);
        if projected > self.max_size_bytes {
            return Err(StorageError::QuotaExceeded {
                trik_id: trik_id.as_str().to_string(),
                current_plus_new: projected,
                max: self.max_size_bytes,
            });
        }

        let now = Utc::now();
        let expires_at = ttl_ms.map(|ms| now + chrono::Duration::milliseconds(ms as i64));
        ns.entries.insert(
            key.to_string(),
            StorageEntry {
                trik_id: trik_id.as_str().to_string(),
                key: key.to_string(),
                value,
                created_at: now,
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, trik_id: &TrikId, key: &str) -> StorageResult<bool> {
        let mut guard = self.namespaces.write().unwrap();
        let ns = guard.entry(trik_id.as_str().to_string()).or_default();
        Ok(ns.entries.remove(key).is_some())
    }

    async fn list(&self, trik_id: &TrikId, prefix: Option<&str>) -> StorageResult<Vec<String>> {
        let mut guard = self.namespaces.write().unwrap();
        let ns = guard.entry(trik_id.as_str().to_string()).or_default();
        ns.sweep_expired();
        let mut keys: Vec<String> = ns
            .entries
            .keys()
            .filter(|k| prefix.is_none_or(|p| k.starts_with(p)))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn usage_bytes(&self, trik_id: &TrikId) -> StorageResult<u64> {
        let mut guard = self.namespaces.write().unwrap();
        let ns = guard.entry(trik_id.as_str().to_string()).or_default();
        ns.sweep_expired();
        Ok(ns.usage_bytes())
    }

    async fn clear(&self, trik_id: &TrikId) -> StorageResult<u64> {
        let mut guard = self.namespaces.write().unwrap();
        match guard.remove(trik_id.as_str()) {
            Some(ns) => Ok(ns.entries.len() as u64),
            None => Ok(0),
        }
    }

    fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tid(s: &str) -> TrikId {
        TrikId::new(s).unwrap()
    }

    #[tokio::test]
    async fn namespace_isolation_i4() {
        let store = MemoryStorageProvider::new();
        store.set(&tid("a"), "k", json!(1), None).await.unwrap();
        store.set(&tid("b"), "k", json!(2), None).await.unwrap();
        assert_eq!(store.get(&tid("a"), "k").await.unwrap(), Some(json!(1)));
        assert_eq!(store.get(&tid("b"), "k").await.unwrap(), Some(json!(2)));
        assert_eq!(store.list(&tid("a"), None).await.unwrap(), vec!["k".to_string()]);
    }

    #[tokio::test]
    async fn quota_boundary_exact_and_over() {
        let value = json!("x");
        let size = json_byte_size(&value);
        let store = MemoryStorageProvider::with_max_size_bytes(size);
        assert!(store.set(&tid("a"), "k1", value.clone(), None).await.is_ok());

        let store2 = MemoryStorageProvider::with_max_size_bytes(size - 1);
        assert!(matches!(
            store2.set(&tid("a"), "k1", value, None).await,
            Err(StorageError::QuotaExceeded { .. })
        ));
    }

    #[tokio::test]
    async fn ttl_expiry_hides_entry() {
        let store = MemoryStorageProvider::new();
        store.set(&tid("a"), "k", json!(1), Some(0)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert_eq!(store.get(&tid("a"), "k").await.unwrap(), None);
        assert_eq!(store.list(&tid("a"), None).await.unwrap(), Vec::<String>::new());
    }

    #[tokio::test]
    async fn get_many_omits_missing_keys() {
        let store = MemoryStorageProvider::new();
        store.set(&tid("a"), "k1", json!(1), None).await.unwrap();
        let result = store
            .get_many(&tid("a"), &["k1".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result["k1"], json!(1));
    }
}

//! The [`StorageProvider`] trait and the per-trik [`ScopedStorage`] handle.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use trikhub_core::TrikId;

use crate::error::StorageResult;

/// Default storage quota per trik: 100 MiB.
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 100 * 1024 * 1024;

/// A storage entry as persisted (spec §3.1 Storage Entry).
#[derive(Debug, Clone)]
pub struct StorageEntry {
    pub trik_id: String,
    pub key: String,
    pub value: Value,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// The byte size of a value as it would be charged against quota: the
/// UTF-8 length of its JSON encoding (spec §4.3).
#[must_use]
pub fn json_byte_size(value: &Value) -> u64 {
    serde_json::to_vec(value).map(|v| v.len() as u64).unwrap_or(0)
}

/// Backend-agnostic per-skill namespaced KV store (spec §4.3).
///
/// All methods are scoped to a single `trik_id`; implementations MUST
/// enforce namespace isolation by construction — a caller holding only a
/// [`ScopedStorage`] can never observe another trik's keys.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    async fn get(&self, trik_id: &TrikId, key: &str) -> StorageResult<Option<Value>>;

    async fn set(
        &self,
        trik_id: &TrikId,
        key: &str,
        value: Value,
        ttl_ms: Option<u64>,
    ) -> StorageResult<()>;

    async fn delete(&self, trik_id: &TrikId, key: &str) -> StorageResult<bool>;

    /// List keys whose text begins with `prefix` (or all keys, if
    /// `prefix` is `None`). Wildcard characters in `prefix` are treated
    /// as literals.
    async fn list(&self, trik_id: &TrikId, prefix: Option<&str>) -> StorageResult<Vec<String>>;

    /// Sum of the UTF-8 JSON-encoded size of every live entry for `trik_id`.
    async fn usage_bytes(&self, trik_id: &TrikId) -> StorageResult<u64>;

    /// Delete every entry for `trik_id`. Returns the number removed.
    async fn clear(&self, trik_id: &TrikId) -> StorageResult<u64>;

    /// The quota cap this provider enforces per trik.
    fn max_size_bytes(&self) -> u64;

    /// Batch get; missing keys are simply absent from the result (default
    /// implementation issues one `get` per key).
    async fn get_many(
        &self,
        trik_id: &TrikId,
        keys: &[String],
    ) -> StorageResult<HashMap<String, Value>> {
        let mut out = HashMap::with_capacity(keys.len());
        for key in keys {
            if let Some(v) = self.get(trik_id, key).await? {
                out.insert(key.clone(), v);
            }
        }
        Ok(out)
    }

    /// Batch set (default implementation issues one `set` per key,
    /// without a TTL).
    async fn set_many(&self, trik_id: &TrikId, entries: HashMap<String, Value>) -> StorageResult<()> {
        for (key, value) in entries {
            self.set(trik_id, &key, value, None).await?;
        }
        Ok(())
    }
}

/// A handle pre-bound to one trik's namespace (spec §4.3: "the gateway
/// constructs a per-trik handle; callers cannot cross namespaces").
///
/// This is the type injected into `SkillInput.storage` and proxied over
/// the worker protocol — it never exposes a `trik_id` parameter, so
/// skill code structurally cannot address another trik's keys.
#[derive(Clone)]
pub struct ScopedStorage {
    provider: Arc<dyn StorageProvider>,
    trik_id: TrikId,
}

impl ScopedStorage {
    #[must_use]
    pub fn new(provider: Arc<dyn StorageProvider>, trik_id: TrikId) -> Self {
        Self { provider, trik_id }
    }

    #[must_use]
    pub fn trik_id(&self) -> &TrikId {
        &self.trik_id
    }

    pub async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        self.provider.get(&self.trik_id, key).await
    }

    pub async fn set(&self, key: &str, value: Value, ttl_ms: Option<u64>) -> StorageResult<()> {
        self.provider.set(&self.trik_id, key, value, ttl_ms).await
    }

    pub async fn delete(&self, key: &str) -> StorageResult<bool> {
        self.provider.delete(&self.trik_id, key).await
    }

    pub async fn list(&self, prefix: Option<&str>) -> StorageResult<Vec<String>> {
        self.provider.list(&self.trik_id, prefix).await
    }

    pub async fn get_many(&self, keys: &[String]) -> StorageResult<HashMap<String, Value>> {
        self.provider.get_many(&self.trik_id, keys).await
    }

    pub async fn set_many(&self, entries: HashMap<String, Value>) -> StorageResult<()> {
        self.provider.set_many(&self.trik_id, entries).await
    }

    pub async fn usage_bytes(&self) -> StorageResult<u64> {
        self.provider.usage_bytes(&self.trik_id).await
    }

    pub async fn clear(&self) -> StorageResult<u64> {
        self.provider.clear(&self.trik_id).await
    }
}

/// Escape LIKE-style wildcard characters (`%`, `_`) in a literal prefix
/// so a backing SQL-ish query treats them as literals rather than
/// wildcards (spec §4.3).
#[must_use]
pub fn escape_like_prefix(prefix: &str) -> String {
    let mut out = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if c == '%' || c == '_' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

//! Persistent [`StorageProvider`] backed by an embedded `SurrealDB`
//! instance (`SurrealKV` storage engine), durable across restarts.
//!
//! Grounded on the embedded `SurrealDB` connection wrapper used
//! elsewhere in this codebase's storage layer (`Database::connect_embedded`).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use surrealdb::Surreal;
use surrealdb::engine::any::Any;

use trikhub_core::TrikId;

use crate::error::{StorageError, StorageResult};
use crate::provider::{DEFAULT_MAX_SIZE_BYTES, StorageProvider, escape_like_prefix, json_byte_size};

const TABLE: &str = "trik_storage";

#[derive(Debug, Serialize, Deserialize)]
struct Row {
    trik_id: String,
    key: String,
    value: Value,
    created_at: chrono::DateTime<chrono::Utc>,
    expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// `(trikId, key)`-keyed durable store. One append-and-update-in-place
/// database file with an expiry index (queried, not a separate table).
pub struct PersistentStorageProvider {
    db: Surreal<Any>,
    max_size_bytes: u64,
}

impl PersistentStorageProvider {
    /// Connect to (creating if absent) an embedded database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Backend`] if the connection cannot be
    /// established.
    pub async fn connect(path: &str) -> StorageResult<Self> {
        Self::connect_with_quota(path, DEFAULT_MAX_SIZE_BYTES).await
    }

    pub async fn connect_with_quota(path: &str, max_size_bytes: u64) -> StorageResult<Self> {
        let endpoint = format!("surrealkv://{path}");
        let db: Surreal<Any> = Surreal::init();
        db.connect(&endpoint)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        db.use_ns("trikhub")
            .use_db("storage")
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(Self { db, max_size_bytes })
    }

    fn row_id(trik_id: &str, key: &str) -> String {
        format!("{trik_id}\u{0}{key}")
    }

    async fn fetch_live(&self, trik_id: &TrikId, key: &str) -> StorageResult<Option<Row>> {
        let id = Self::row_id(trik_id.as_str(), key);
        let row: Option<Row> = self
            .db
            .select((TABLE, id))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(row.filter(|r| !is_expired(r)))
    }

    async fn fetch_all_live(&self, trik_id: &TrikId) -> StorageResult<Vec<Row>> {
        let mut response = self
            .db
            .query("SELECT * FROM type::table($table) WHERE trik_id = $trik_id")
            .bind(("table", TABLE.to_string()))
            .bind(("trik_id", trik_id.as_str().to_string()))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        let rows: Vec<Row> = response.take(0).map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(rows.into_iter().filter(|r| !is_expired(r)).collect())
    }
}

fn is_expired(row: &Row) -> bool {
    row.expires_at.is_some_and(|exp| exp <= Utc::now())
}

#[async_trait]
impl StorageProvider for PersistentStorageProvider {
    async fn get(&self, trik_id: &TrikId, key: &str) -> StorageResult<Option<Value>> {
        Ok(self.fetch_live(trik_id, key).await?.map(|r| r.value))
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
        let existing = self.fetch_live(trik_id, key).await?;
        let old_bytes = existing.as_ref().map(|r| json_byte_size(&r.value)).unwrap_or(0);
        let usage = self.usage_bytes(trik_id).await?;
        let projected = usage.saturating_sub(old_bytes).saturating_add(new_bytes);
        if projected > self.max_size_bytes {
            return Err(StorageError::QuotaExceeded {
                trik_id: trik_id.as_str().to_string(),
                current_plus_new: projected,
                max: self.max_size_bytes,
            });
        }

        let now = Utc::now();
        let row = Row {
            trik_id: trik_id.as_str().to_string(),
            key: key.to_string(),
            value,
            created_at: now,
            expires_at: ttl_ms.map(|ms| now + chrono::Duration::milliseconds(ms as i64)),
        };
        let id = Self::row_id(trik_id.as_str(), key);
        let _: Option<Row> = self
            .db
            .upsert((TABLE, id))
            .content(row)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, trik_id: &TrikId, key: &str) -> StorageResult<bool> {
        let id = Self::row_id(trik_id.as_str(), key);
        let existed: Option<Row> = self
            .db
            .delete((TABLE, id))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(existed.is_some())
    }

    async fn list(&self, trik_id: &TrikId, prefix: Option<&str>) -> StorageResult<Vec<String>> {
        let rows = self.fetch_all_live(trik_id).await?;
        let escaped = prefix.map(escape_like_prefix);
        let mut keys: Vec<String> = rows
            .into_iter()
            .map(|r| r.key)
            .filter(|k| escaped.as_deref().is_none_or(|p| k.starts_with(unescape(p).as_str())))
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn usage_bytes(&self, trik_id: &TrikId) -> StorageResult<u64> {
        let rows = self.fetch_all_live(trik_id).await?;
        Ok(rows.iter().map(|r| json_byte_size(&r.value)).sum())
    }

    async fn clear(&self, trik_id: &TrikId) -> StorageResult<u64> {
        let rows = self.fetch_all_live(trik_id).await?;
        let count = rows.len() as u64;
        for row in rows {
            let id = Self::row_id(trik_id.as_str(), &row.key);
            let _: Option<Row> = self
                .db
                .delete((TABLE, id))
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;
        }
        Ok(count)
    }

    fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }
}

/// Undo [`escape_like_prefix`] for in-process `starts_with` comparison
/// (the embedded query above filters in Rust, not via a `LIKE` clause,
/// so the escaping only needs to round-trip; a SQL-backed provider
/// would instead pass the escaped form straight into a `LIKE ... ESCAPE`
/// clause).
fn unescape(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tid(s: &str) -> TrikId {
        TrikId::new(s).unwrap()
    }

    async fn temp_store() -> (PersistentStorageProvider, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db").display().to_string();
        let store = PersistentStorageProvider::connect(&path).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn persists_and_lists_with_prefix() {
        let (store, _dir) = temp_store().await;
        store.set(&tid("a"), "user:1", json!("alice"), None).await.unwrap();
        store.set(&tid("a"), "user:2", json!("bob"), None).await.unwrap();
        store.set(&tid("a"), "post:1", json!("hi"), None).await.unwrap();

        let mut keys = store.list(&tid("a"), Some("user:")).await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["user:1".to_string(), "user:2".to_string()]);
    }

    #[tokio::test]
    async fn delete_returns_whether_it_existed() {
        let (store, _dir) = temp_store().await;
        store.set(&tid("a"), "k", json!(1), None).await.unwrap();
        assert!(store.delete(&tid("a"), "k").await.unwrap());
        assert!(!store.delete(&tid("a"), "k").await.unwrap());
    }

    #[tokio::test]
    async fn ttl_expiry_at_zero_hides_entry() {
        let (store, _dir) = temp_store().await;
        store.set(&tid("a"), "k", json!(1), Some(0)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert_eq!(store.get(&tid("a"), "k").await.unwrap(), None);
    }
}

//! Per-trik, per-session history, bounded in size and pruned by
//! inactivity (spec §3.1 Session, §4.10).

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;

use trikhub_core::TrikId;

/// One recorded invocation. Passthrough content is never recorded here —
/// only the structured `agentData` a template action produced.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub input: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_data: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub session_id: String,
    pub trik_id: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub history: Vec<HistoryEntry>,
}

/// The slice of a session handed to skill code: an id and its history,
/// with no access to other trikks' sessions or to the store itself.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub session_id: String,
    pub history: Vec<HistoryEntry>,
}

/// Process-wide session map, keyed by session id (spec §5: "atomic per key").
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a caller-supplied session id, or mint a fresh one, and
    /// return it. A caller-supplied id that names no existing session
    /// starts a new session under that id rather than erroring.
    pub async fn ensure(&self, trik_id: &TrikId, session_id: Option<String>) -> String {
        let mut sessions = self.sessions.write().await;
        let id = session_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        sessions.entry(id.clone()).or_insert_with(|| {
            let now = Utc::now();
            Session {
                session_id: id.clone(),
                trik_id: trik_id.to_string(),
                created_at: now,
                last_activity: now,
                history: Vec::new(),
            }
        });
        id
    }

    /// Drop `session_id` if it has been inactive for longer than
    /// `ttl_ms`. A caller that resolves a session id through `ensure`
    /// right after this call gets a fresh session rather than a stale
    /// one, satisfying the per-trik inactivity expiry (spec §3.2/§4.10).
    pub async fn evict_if_expired(&self, session_id: &str, ttl_ms: u64) {
        let cutoff = Utc::now() - Duration::milliseconds(i64::try_from(ttl_ms).unwrap_or(i64::MAX));
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get(session_id) {
            if session.last_activity <= cutoff {
                sessions.remove(session_id);
            }
        }
    }

    #[must_use]
    pub async fn view(&self, session_id: &str) -> Option<SessionView> {
        self.sessions.read().await.get(session_id).map(|s| SessionView {
            session_id: s.session_id.clone(),
            history: s.history.clone(),
        })
    }

    /// Append a history entry, dropping the oldest once `max_history` is exceeded.
    pub async fn record(&self, session_id: &str, entry: HistoryEntry, max_history: usize) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(session_id) {
            session.history.push(entry);
            while session.history.len() > max_history {
                session.history.remove(0);
            }
            session.last_activity = Utc::now();
        }
    }

    pub async fn end(&self, session_id: &str) {
        self.sessions.write().await.remove(session_id);
    }

    /// Drop sessions whose last activity is older than `ttl_ms`.
    pub async fn prune_expired(&self, ttl_ms: u64) {
        let cutoff = Utc::now() - Duration::milliseconds(i64::try_from(ttl_ms).unwrap_or(i64::MAX));
        self.sessions.write().await.retain(|_, s| s.last_activity > cutoff);
    }

    pub async fn clear(&self) {
        self.sessions.write().await.clear();
    }
}

//! Gateway tunables (spec.md leaves these as named constants; this
//! centralises and makes them overridable from a TOML file).

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Default per-invocation timeout (spec §5: "bounded by invoke-timeout, default 60s").
pub const DEFAULT_INVOKE_TIMEOUT_MS: u64 = 60_000;
/// Default worker startup handshake deadline.
pub const DEFAULT_WORKER_STARTUP_TIMEOUT_MS: u64 = 10_000;
/// Default grace period before a worker is killed during shutdown.
pub const DEFAULT_WORKER_SHUTDOWN_GRACE_MS: u64 = 5_000;
/// Default session inactivity TTL.
pub const DEFAULT_SESSION_TTL_MS: u64 = 30 * 60 * 1000;
/// Default session history cap when a trik doesn't declare one.
pub const DEFAULT_SESSION_MAX_HISTORY: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub invoke_timeout_ms: u64,
    /// Default quota a caller should size its `StorageProvider` with
    /// before constructing a `Gateway` — the provider is already built
    /// by the time `Gateway::new` receives it, so this field is read by
    /// the embedding binary, not by `Gateway` itself.
    pub storage_quota_bytes: u64,
    pub session_ttl_ms: u64,
    pub session_max_history: usize,
    /// `None` means passthrough content lives until `deliverContent` or
    /// gateway shutdown (spec.md's "default <= one delivery").
    pub passthrough_ttl_ms: Option<u64>,
    pub worker_startup_timeout_ms: u64,
    pub worker_shutdown_grace_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            invoke_timeout_ms: DEFAULT_INVOKE_TIMEOUT_MS,
            storage_quota_bytes: trikhub_storage::DEFAULT_MAX_SIZE_BYTES,
            session_ttl_ms: DEFAULT_SESSION_TTL_MS,
            session_max_history: DEFAULT_SESSION_MAX_HISTORY,
            passthrough_ttl_ms: None,
            worker_startup_timeout_ms: DEFAULT_WORKER_STARTUP_TIMEOUT_MS,
            worker_shutdown_grace_ms: DEFAULT_WORKER_SHUTDOWN_GRACE_MS,
        }
    }
}

impl GatewayConfig {
    /// Load from a TOML file, falling back to built-in defaults for any
    /// field the file omits, or for the whole struct if the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> trikhub_core::GatewayResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)
            .map_err(|e| trikhub_core::GatewayError::Internal(format!("invalid gateway config: {e}")))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = GatewayConfig::load(Path::new("/nonexistent/trikhub.toml")).unwrap();
        assert_eq!(config.invoke_timeout_ms, DEFAULT_INVOKE_TIMEOUT_MS);
    }

    #[test]
    fn partial_toml_overlays_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trikhub.toml");
        std::fs::write(&path, "invoke_timeout_ms = 1234\n").unwrap();
        let config = GatewayConfig::load(&path).unwrap();
        assert_eq!(config.invoke_timeout_ms, 1234);
        assert_eq!(config.session_ttl_ms, DEFAULT_SESSION_TTL_MS);
    }
}

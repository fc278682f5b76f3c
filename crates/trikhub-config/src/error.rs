//! Config store error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read secrets file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse secrets file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[cfg(unix)]
    #[error("secrets file {path} has insecure permissions {mode:o}, expected 0600")]
    InsecurePermissions { path: String, mode: u32 },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

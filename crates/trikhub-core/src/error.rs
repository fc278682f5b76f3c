//! Shared error taxonomy for the TrikHub gateway.
//!
//! [`GatewayError`] unifies the error kinds of spec §7 so every
//! component boundary returns the same `{code, message}` shape instead
//! of ad-hoc strings. Components with their own error enum (storage,
//! config, manifest) convert into this one at the gateway boundary via
//! `From` impls.

use thiserror::Error;

/// The stable error code surfaced in a `GatewayResult::Error` response.
///
/// These are the "kinds, not bindings" of spec §7: callers match on the
/// code, not on `GatewayError`'s Rust variant names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidParams,
    TrikNotFound,
    ActionNotFound,
    ExecutionTimeout,
    SchemaValidationFailed,
    WorkerNotReady,
    StorageError,
    InternalError,
}

impl ErrorCode {
    /// The `SCREAMING_SNAKE_CASE` string used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidParams => "INVALID_PARAMS",
            ErrorCode::TrikNotFound => "TRIK_NOT_FOUND",
            ErrorCode::ActionNotFound => "ACTION_NOT_FOUND",
            ErrorCode::ExecutionTimeout => "EXECUTION_TIMEOUT",
            ErrorCode::SchemaValidationFailed => "SCHEMA_VALIDATION_FAILED",
            ErrorCode::WorkerNotReady => "WORKER_NOT_READY",
            ErrorCode::StorageError => "STORAGE_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }

    /// The custom JSON-RPC numeric error code from spec §4.5, where applicable.
    #[must_use]
    pub const fn rpc_code(self) -> Option<i64> {
        match self {
            ErrorCode::TrikNotFound => Some(1001),
            ErrorCode::ActionNotFound => Some(1002),
            ErrorCode::ExecutionTimeout => Some(1003),
            ErrorCode::SchemaValidationFailed => Some(1004),
            ErrorCode::WorkerNotReady => Some(1005),
            ErrorCode::StorageError => Some(1006),
            ErrorCode::InvalidParams | ErrorCode::InternalError => None,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for ErrorCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Top-level gateway error.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("trik not found: {0}")]
    TrikNotFound(String),

    #[error("action not found: {0}")]
    ActionNotFound(String),

    #[error("execution timed out after {0}ms")]
    ExecutionTimeout(u64),

    #[error("schema validation failed: {0}")]
    SchemaValidationFailed(String),

    #[error("worker not ready: {0}")]
    WorkerNotReady(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("a trik with this id is already loaded: {0}")]
    DuplicateTrik(String),

    #[error("manifest rejected: {0}")]
    ManifestInvalid(String),

    #[error("channel terminated: {0}")]
    ChannelTerminated(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GatewayError {
    /// The stable wire error code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            GatewayError::InvalidParams(_) => ErrorCode::InvalidParams,
            GatewayError::TrikNotFound(_) | GatewayError::DuplicateTrik(_) => {
                ErrorCode::TrikNotFound
            },
            GatewayError::ActionNotFound(_) => ErrorCode::ActionNotFound,
            GatewayError::ExecutionTimeout(_) => ErrorCode::ExecutionTimeout,
            GatewayError::SchemaValidationFailed(_) | GatewayError::ManifestInvalid(_) => {
                ErrorCode::SchemaValidationFailed
            },
            GatewayError::WorkerNotReady(_) | GatewayError::ChannelTerminated(_) => {
                ErrorCode::WorkerNotReady
            },
            GatewayError::Storage(_) => ErrorCode::StorageError,
            GatewayError::Internal(_) | GatewayError::Io(_) | GatewayError::Json(_) => {
                ErrorCode::InternalError
            },
        }
    }
}

/// Result alias used throughout the gateway crates.
pub type GatewayResult<T> = Result<T, GatewayError>;

//! Storage error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("quota exceeded: {current_plus_new} bytes would exceed the {max} byte cap for trik '{trik_id}'")]
    QuotaExceeded {
        trik_id: String,
        current_plus_new: u64,
        max: u64,
    },

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend error: {0}")]
    Backend(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for trikhub_core::GatewayError {
    fn from(e: StorageError) -> Self {
        trikhub_core::GatewayError::Storage(e.to_string())
    }
}

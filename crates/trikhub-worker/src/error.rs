//! Worker lifecycle and dispatch errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to spawn worker process: {0}")]
    SpawnFailed(#[from] std::io::Error),

    #[error("worker did not become healthy within {0}ms")]
    StartupTimeout(u64),

    #[error("worker channel closed unexpectedly")]
    ChannelTerminated,

    #[error("invocation timed out after {0}ms")]
    Timeout(u64),

    #[error("malformed response from worker: {0}")]
    Protocol(String),

    #[error("worker returned an error: {0}")]
    Remote(String),

    #[error("storage error: {0}")]
    Storage(#[from] trikhub_storage::StorageError),
}

pub type WorkerResult<T> = Result<T, WorkerError>;

impl From<WorkerError> for trikhub_core::GatewayError {
    fn from(err: WorkerError) -> Self {
        match err {
            WorkerError::Timeout(ms) => trikhub_core::GatewayError::ExecutionTimeout(ms),
            WorkerError::Storage(e) => e.into(),
            other => trikhub_core::GatewayError::WorkerNotReady(other.to_string()),
        }
    }
}

//! Subprocess lifecycle, JSON-RPC dispatch, and storage proxying for
//! cross-runtime skill workers (spec §4.6).

#![deny(unsafe_code)]

pub mod error;
pub mod handle;
pub mod manager;
pub mod recipe;

pub use error::{WorkerError, WorkerResult};
pub use handle::WorkerHandle;
pub use manager::SubprocessWorkerManager;
pub use recipe::SpawnRecipe;

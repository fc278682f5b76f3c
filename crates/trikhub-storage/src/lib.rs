//! Per-skill, namespaced, quota-enforced KV storage with TTL and
//! prefix listing (spec §4.3).

#![deny(unsafe_code)]

pub mod error;
pub mod memory;
#[cfg(feature = "persistent")]
pub mod persistent;
pub mod provider;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryStorageProvider;
#[cfg(feature = "persistent")]
pub use persistent::PersistentStorageProvider;
pub use provider::{
    DEFAULT_MAX_SIZE_BYTES, ScopedStorage, StorageEntry, StorageProvider, escape_like_prefix,
    json_byte_size,
};

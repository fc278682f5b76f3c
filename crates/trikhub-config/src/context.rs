//! Per-trik config context: the view of [`ConfigStore`] exposed to skill code.

use trikhub_manifest::ConfigSection;

use crate::store::ConfigStore;

/// A config view scoped to one trik's declared keys.
///
/// Asking for an undeclared key returns not-found even if the backing
/// file contains a value for it — the manifest's `config` section is
/// the sole source of truth for what a skill may read.
#[derive(Clone)]
pub struct TrikConfigContext {
    trik_id: String,
    declared: std::collections::HashSet<String>,
    store: ConfigStore,
}

impl TrikConfigContext {
    #[must_use]
    pub fn new(trik_id: impl Into<String>, section: &ConfigSection, store: ConfigStore) -> Self {
        Self {
            trik_id: trik_id.into(),
            declared: section.declared_keys().map(str::to_string).collect(),
            store,
        }
    }

    /// Get a declared config key's value, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        if !self.declared.contains(key) {
            return None;
        }
        self.store.get_raw(&self.trik_id, key).map(str::to_string)
    }

    /// Mirror of `get(key).is_some()`.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

//! Layered `(trikId -> (key -> value))` config/secrets store (spec §4.4, §6.2).

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{ConfigError, ConfigResult};

/// Raw secrets document shape: `{ "@scope/name": { "KEY": "value" }, ... }`.
type SecretsDocument = HashMap<String, HashMap<String, String>>;

/// Two-layer `(trikId -> (key -> value))` mapping, loaded at gateway
/// startup and reloadable on demand.
///
/// Lookup resolves project-local first, then global, per spec §4.4.
#[derive(Debug, Default, Clone)]
pub struct ConfigStore {
    project_local: SecretsDocument,
    global: SecretsDocument,
}

impl ConfigStore {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load from an optional project-local secrets file and an optional
    /// global secrets file. Either may be absent (treated as empty).
    ///
    /// # Errors
    ///
    /// Returns an error if a present file cannot be read, is not valid
    /// JSON, or (on Unix) has group/other-readable permissions.
    pub fn load(project_local_path: Option<&Path>, global_path: Option<&Path>) -> ConfigResult<Self> {
        let project_local = match project_local_path {
            Some(p) if p.exists() => load_secrets_file(p)?,
            _ => HashMap::new(),
        };
        let global = match global_path {
            Some(p) if p.exists() => load_secrets_file(p)?,
            _ => HashMap::new(),
        };
        info!(
            project_triks = project_local.len(),
            global_triks = global.len(),
            "loaded config store"
        );
        Ok(Self { project_local, global })
    }

    /// Reload from the same paths (callers keep the paths; this store
    /// itself is stateless about where it came from, matching the
    /// "reloadable on demand" contract by simply being reconstructible).
    #[must_use]
    pub fn merge_reload(project_local: SecretsDocument, global: SecretsDocument) -> Self {
        Self { project_local, global }
    }

    /// Resolve `(trikId, key)`: project-local overrides global, then not-found.
    #[must_use]
    pub fn get_raw(&self, trik_id: &str, key: &str) -> Option<&str> {
        self.project_local
            .get(trik_id)
            .and_then(|m| m.get(key))
            .or_else(|| self.global.get(trik_id).and_then(|m| m.get(key)))
            .map(String::as_str)
    }

    #[must_use]
    pub fn has_raw(&self, trik_id: &str, key: &str) -> bool {
        self.get_raw(trik_id, key).is_some()
    }
}

fn load_secrets_file(path: &Path) -> ConfigResult<SecretsDocument> {
    check_permissions(path)?;
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let doc: SecretsDocument = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    debug!(path = %path.display(), triks = doc.len(), "parsed secrets file");
    Ok(doc)
}

#[cfg(unix)]
fn check_permissions(path: &Path) -> ConfigResult<()> {
    use std::os::unix::fs::PermissionsExt;
    let metadata = std::fs::metadata(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mode = metadata.permissions().mode();
    if mode & 0o077 != 0 {
        warn!(path = %path.display(), mode = format!("{:o}", mode & 0o777), "secrets file has insecure permissions");
        return Err(ConfigError::InsecurePermissions {
            path: path.display().to_string(),
            mode: mode & 0o777,
        });
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_permissions(_path: &Path) -> ConfigResult<()> {
    Ok(())
}

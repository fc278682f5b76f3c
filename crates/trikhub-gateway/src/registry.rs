//! Manifest loading and the computed `{trikId}:{action}` tool table (spec §4.7).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tokio::sync::RwLock;

use trikhub_core::{GatewayError, GatewayResult, TrikId, qualified_tool_name};
use trikhub_manifest::{Manifest, ManifestError, ToolDefinition, load_manifest};

struct LoadedTrik {
    manifest: Manifest,
    dir: PathBuf,
}

/// Render a [`ManifestError`] with its per-issue paths intact — the
/// `Display` impl on `ManifestError::Invalid` only gives an issue count.
fn describe_manifest_error(err: ManifestError) -> GatewayError {
    let issues = err.issues();
    if issues.is_empty() {
        return GatewayError::ManifestInvalid(err.to_string());
    }
    let detail = issues
        .iter()
        .map(|issue| format!("{}: {}", issue.path, issue.message))
        .collect::<Vec<_>>()
        .join("; ");
    GatewayError::ManifestInvalid(detail)
}

/// The `<root>/.trikhub/config.json` shape (spec §6.2). Only `triks` (the
/// installed-package list) drives loading; `trikhub`/`runtimes` are
/// registry/CLI bookkeeping the gateway does not need to interpret.
#[derive(Debug, Deserialize)]
struct RegistryConfig {
    triks: Vec<String>,
}

/// Tracks every manifest loaded into this gateway instance.
///
/// A manifest is immutable once loaded (spec §3.3); loading the same id
/// twice is an error (see `DESIGN.md`'s Open Question resolution).
#[derive(Default)]
pub struct TrikRegistry {
    triks: RwLock<HashMap<TrikId, LoadedTrik>>,
}

impl TrikRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate `dir/manifest.json`, then register it.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ManifestInvalid`] if the manifest fails to
    /// parse or validate, or [`GatewayError::DuplicateTrik`] if a trik
    /// with the same id is already loaded.
    pub async fn load_trik(&self, dir: &Path) -> GatewayResult<TrikId> {
        let manifest_path = dir.join("manifest.json");
        let manifest = load_manifest(&manifest_path).map_err(describe_manifest_error)?;
        let trik_id = TrikId::new(manifest.id.clone())?;

        let mut triks = self.triks.write().await;
        if triks.contains_key(&trik_id) {
            return Err(GatewayError::DuplicateTrik(trik_id.to_string()));
        }
        triks.insert(
            trik_id.clone(),
            LoadedTrik { manifest, dir: dir.to_path_buf() },
        );
        Ok(trik_id)
    }

    /// Bulk-load every trik named in a registry config file, resolving
    /// each package name under `base_dir`.
    pub async fn load_triks_from_config(
        &self,
        config_path: &Path,
        base_dir: &Path,
    ) -> GatewayResult<Vec<TrikId>> {
        let text = std::fs::read_to_string(config_path)?;
        let config: RegistryConfig = serde_json::from_str(&text)?;

        let mut loaded = Vec::with_capacity(config.triks.len());
        for name in &config.triks {
            loaded.push(self.load_trik(&base_dir.join(name)).await?);
        }
        Ok(loaded)
    }

    #[must_use]
    pub async fn manifest(&self, trik_id: &TrikId) -> Option<Manifest> {
        self.triks.read().await.get(trik_id).map(|t| t.manifest.clone())
    }

    #[must_use]
    pub async fn dir(&self, trik_id: &TrikId) -> Option<PathBuf> {
        self.triks.read().await.get(trik_id).map(|t| t.dir.clone())
    }

    #[must_use]
    pub async fn tool_definitions(&self) -> Vec<ToolDefinition> {
        let triks = self.triks.read().await;
        let mut definitions = Vec::new();
        for loaded in triks.values() {
            let trik_id = TrikId::from_static(&loaded.manifest.id);
            for (name, action) in &loaded.manifest.actions {
                definitions.push(ToolDefinition {
                    name: qualified_tool_name(&trik_id, name),
                    description: action.description.clone(),
                    input_schema: action.input_schema.clone(),
                    response_mode: action.response_mode,
                });
            }
        }
        definitions
    }
}

//! Loading a manifest from disk (spec §6.1).

use std::path::Path;

use crate::error::{ManifestError, ManifestResult};
use crate::model::Manifest;
use crate::validate;

/// Parse and validate a `manifest.json` at the given path.
///
/// # Errors
///
/// Returns [`ManifestError::Io`] if the file cannot be read,
/// [`ManifestError::Parse`] if it is not well-formed JSON matching the
/// `Manifest` shape, or [`ManifestError::Invalid`] if it fails
/// structural or security validation.
pub fn load_manifest(path: &Path) -> ManifestResult<Manifest> {
    let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_manifest(&text, path)
}

/// Parse and validate a manifest from an in-memory JSON string.
///
/// `display_path` is used only for error messages.
pub fn parse_manifest(text: &str, display_path: &Path) -> ManifestResult<Manifest> {
    let manifest: Manifest = serde_json::from_str(text).map_err(|source| ManifestError::Parse {
        path: display_path.display().to_string(),
        source,
    })?;

    validate::validate(&manifest).map_err(ManifestError::Invalid)?;
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid_manifest_json() -> &'static str {
        r#"{
            "schemaVersion": 1,
            "id": "search",
            "name": "Search",
            "description": "Search the web",
            "version": "1.0.0",
            "actions": {
                "search": {
                    "description": "Run a search",
                    "responseMode": "template",
                    "inputSchema": {"type": "object", "properties": {"q": {"type": "string"}}},
                    "agentDataSchema": {
                        "type": "object",
                        "properties": {
                            "template": {"type": "string", "enum": ["success", "empty"]},
                            "count": {"type": "integer"}
                        }
                    },
                    "responseTemplates": {
                        "success": {"text": "Found {{count}} results."},
                        "empty": {"text": "No results."}
                    }
                }
            },
            "entry": {"path": "index.js", "runtime": "node"}
        }"#
    }

    #[test]
    fn loads_valid_manifest_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", valid_manifest_json()).unwrap();
        let manifest = load_manifest(file.path()).unwrap();
        assert_eq!(manifest.id, "search");
        assert_eq!(manifest.actions.len(), 1);
    }

    #[test]
    fn rejects_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        assert!(matches!(load_manifest(file.path()), Err(ManifestError::Parse { .. })));
    }

    #[test]
    fn rejects_missing_file() {
        let missing = Path::new("/nonexistent/manifest.json");
        assert!(matches!(load_manifest(missing), Err(ManifestError::Io { .. })));
    }
}

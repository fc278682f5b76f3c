//! spec §8.3 scenario 3: constrained-string refusal.

use std::path::Path;

use trikhub_manifest::{ManifestError, parse_manifest};

#[test]
fn unconstrained_title_is_refused_with_a_pointing_diagnostic() {
    let json = r#"{
        "schemaVersion": 1,
        "id": "reader",
        "name": "Reader",
        "description": "Reads articles",
        "version": "0.1.0",
        "actions": {
            "describe": {
                "description": "Describe an article",
                "responseMode": "template",
                "inputSchema": {"type": "object"},
                "agentDataSchema": {
                    "type": "object",
                    "properties": {
                        "title": {"type": "string"}
                    }
                },
                "responseTemplates": {
                    "success": {"text": "Title: {{title}}"}
                }
            }
        },
        "entry": {"path": "index.js", "runtime": "node"}
    }"#;

    let err = parse_manifest(json, Path::new("manifest.json")).unwrap_err();
    let ManifestError::Invalid(issues) = err else {
        panic!("expected ManifestError::Invalid, got {err:?}");
    };

    assert!(
        issues
            .iter()
            .any(|i| i.path == "actions.describe.agentDataSchema.properties.title"),
        "expected a diagnostic pointing at actions.describe.agentDataSchema.properties.title, got {issues:?}"
    );
}

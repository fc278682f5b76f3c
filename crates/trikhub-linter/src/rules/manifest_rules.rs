//! Rules that inspect the manifest itself (spec §4.2).

use std::path::Path;

use trikhub_manifest::{Manifest, ManifestError, ResponseMode};

use crate::diagnostic::Diagnostic;

/// Run every manifest-shape rule. `manifest_path` is used only for
/// diagnostic file attribution.
#[must_use]
pub fn check_manifest(
    load_result: &Result<Manifest, ManifestError>,
    manifest_path: &Path,
    manifest_text: Option<&str>,
) -> Vec<Diagnostic> {
    let file = manifest_path.display().to_string();

    let manifest = match load_result {
        Ok(m) => m,
        Err(ManifestError::Invalid(issues)) => {
            return issues
                .iter()
                .map(|issue| {
                    let rule = classify_security_issue(&issue.message);
                    Diagnostic::error(rule, format!("{}: {}", issue.path, issue.message), &file)
                })
                .collect();
        },
        Err(other) => {
            return vec![Diagnostic::error("valid-manifest", other.to_string(), &file)];
        },
    };

    let mut diagnostics = Vec::new();
    check_has_response_templates(manifest, &file, &mut diagnostics);
    check_manifest_completeness(manifest, &file, &mut diagnostics);
    if let Some(text) = manifest_text {
        check_duplicate_actions(text, &file, &mut diagnostics);
    }
    check_entry_runtime(manifest, &file, &mut diagnostics);
    diagnostics
}

/// Manifest validation collapses "no-free-strings-in-agent-data" and
/// "template-fields-exist" violations into one `Vec`; reuse the
/// validator's own wording to tell them apart rather than re-deriving it.
fn classify_security_issue(message: &str) -> &'static str {
    if message.contains("unconstrained") {
        "no-free-strings-in-agent-data"
    } else if message.contains("does not resolve to") {
        "template-fields-exist"
    } else {
        "valid-manifest"
    }
}

fn check_has_response_templates(manifest: &Manifest, file: &str, out: &mut Vec<Diagnostic>) {
    for (name, action) in &manifest.actions {
        if action.response_mode != ResponseMode::Template {
            continue;
        }
        let has_default = action
            .response_templates
            .as_ref()
            .is_some_and(|templates| templates.contains_key("default"));
        if !has_default {
            out.push(Diagnostic::warning(
                "default-template-recommended",
                format!("action '{name}' has no 'default' response template"),
                file,
            ));
        }
    }
}

fn check_manifest_completeness(manifest: &Manifest, file: &str, out: &mut Vec<Diagnostic>) {
    if manifest.description.trim().is_empty() {
        out.push(Diagnostic::warning(
            "manifest-completeness",
            "manifest description is empty",
            file,
        ));
    }
    if manifest.repository.is_none() {
        out.push(Diagnostic::info(
            "manifest-completeness",
            "manifest does not declare a repository field",
            file,
        ));
    }
    if manifest.license.is_none() {
        out.push(Diagnostic::info(
            "manifest-completeness",
            "manifest does not declare a license field",
            file,
        ));
    }

    const HIGH_TIMEOUT_MS: u64 = 5 * 60 * 1000;
    if manifest.limits.max_execution_time_ms > HIGH_TIMEOUT_MS {
        out.push(Diagnostic::warning(
            "manifest-completeness",
            format!(
                "limits.maxExecutionTimeMs of {}ms is unusually high",
                manifest.limits.max_execution_time_ms
            ),
            file,
        ));
    }
}

fn check_entry_runtime(manifest: &Manifest, file: &str, out: &mut Vec<Diagnostic>) {
    if manifest.entry.runtime.is_none() {
        out.push(Diagnostic::info(
            "entry-runtime-unspecified",
            "entry.runtime is not set; the host runtime will be assumed",
            file,
        ));
    }
}

/// Best-effort duplicate-key scan over the raw manifest text's `actions`
/// object. `serde_json` silently keeps the last of two duplicate keys, so
/// this has to work on the source text rather than the parsed manifest.
fn check_duplicate_actions(text: &str, file: &str, out: &mut Vec<Diagnostic>) {
    let Some(actions_start) = text.find("\"actions\"") else {
        return;
    };
    let Some(brace_start) = text[actions_start..].find('{') else {
        return;
    };
    let body_start = actions_start + brace_start + 1;

    let mut depth: i32 = 1;
    let mut seen = std::collections::HashSet::new();
    let mut chars = text[body_start..].char_indices().peekable();
    let mut at_depth_one_awaiting_key = true;

    while let Some((idx, ch)) = chars.next() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
                at_depth_one_awaiting_key = depth == 1;
            },
            ':' if depth == 1 => at_depth_one_awaiting_key = false,
            ',' if depth == 1 => at_depth_one_awaiting_key = true,
            '"' if depth == 1 && at_depth_one_awaiting_key => {
                let key_start = idx + 1;
                if let Some(end_rel) = text[body_start + key_start..].find('"') {
                    let key = &text[body_start + key_start..body_start + key_start + end_rel];
                    if !seen.insert(key.to_string()) {
                        out.push(Diagnostic::error(
                            "duplicate-action",
                            format!("action '{key}' is declared more than once"),
                            file,
                        ));
                    }
                }
            },
            _ => {},
        }
    }
}

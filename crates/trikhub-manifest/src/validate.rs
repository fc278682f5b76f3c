//! Structural and security manifest validation: schema-version and
//! action shape checks, the mode/schema agreement rule, the
//! agent-visible-constraint rule, and template placeholder closure.

use std::collections::HashSet;

use regex::Regex;
use serde_json::Value;

use crate::model::{Action, Manifest, ResponseMode};
use crate::schema::{is_constrained_string, node_is_string_typed, walk_schema};

/// A single validation failure, with a JSON-pointer-ish path for
/// reporting (mirrors the `{path, message}` shape of spec §4.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Validate a manifest in two phases per spec §4.1.
///
/// Structural failures short-circuit (returned alone). Security
/// failures (unconstrained agent-visible strings, unresolved template
/// placeholders) are collected so a caller — in particular the linter —
/// can report all of them at once.
///
/// # Errors
///
/// Returns the collected issues; an empty manifest that passes every
/// check returns `Ok(())`.
pub fn validate(manifest: &Manifest) -> Result<(), Vec<ValidationIssue>> {
    let structural = validate_structural(manifest);
    if !structural.is_empty() {
        return Err(structural);
    }

    let security = validate_security(manifest);
    if security.is_empty() {
        Ok(())
    } else {
        Err(security)
    }
}

fn validate_structural(manifest: &Manifest) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if manifest.schema_version != 1 {
        issues.push(ValidationIssue::new(
            "schemaVersion",
            format!("schemaVersion must be 1, got {}", manifest.schema_version),
        ));
    }

    if manifest.id.trim().is_empty() {
        issues.push(ValidationIssue::new("id", "id must not be empty"));
    }

    let version_re = Regex::new(r"^\d+\.\d+\.\d+").unwrap();
    if !version_re.is_match(&manifest.version) {
        issues.push(ValidationIssue::new(
            "version",
            format!("version '{}' does not match ^\\d+\\.\\d+\\.\\d+", manifest.version),
        ));
    }

    if manifest.actions.is_empty() {
        issues.push(ValidationIssue::new("actions", "manifest must declare at least one action"));
    }

    for (name, action) in &manifest.actions {
        validate_action_shape(name, action, &mut issues);
    }

    issues
}

/// Mode/schema agreement: a template action must declare
/// `agentDataSchema`/`responseTemplates` and not `userContentSchema`;
/// a passthrough action must be the reverse.
fn validate_action_shape(name: &str, action: &Action, issues: &mut Vec<ValidationIssue>) {
    let base = format!("actions.{name}");
    match action.response_mode {
        ResponseMode::Template => {
            match &action.agent_data_schema {
                Some(schema) if schema.is_object() => {},
                _ => issues.push(ValidationIssue::new(
                    format!("{base}.agentDataSchema"),
                    "template actions require an object-shaped agentDataSchema",
                )),
            }
            match &action.response_templates {
                Some(templates) if !templates.is_empty() => {},
                _ => issues.push(ValidationIssue::new(
                    format!("{base}.responseTemplates"),
                    "template actions require at least one response template",
                )),
            }
            if action.user_content_schema.is_some() {
                issues.push(ValidationIssue::new(
                    format!("{base}.userContentSchema"),
                    "template actions must not declare a userContentSchema",
                ));
            }
        },
        ResponseMode::Passthrough => {
            match &action.user_content_schema {
                Some(schema) if schema.is_object() => {},
                _ => issues.push(ValidationIssue::new(
                    format!("{base}.userContentSchema"),
                    "passthrough actions require an object-shaped userContentSchema",
                )),
            }
            if action.agent_data_schema.is_some() || action.response_templates.is_some() {
                issues.push(ValidationIssue::new(
                    base,
                    "passthrough actions must not declare agentDataSchema/responseTemplates",
                ));
            }
        },
    }
}

/// The agent-visible-constraint rule (no free-form strings in
/// `agentDataSchema`) and template placeholder closure (every
/// `{{name}}` must resolve to a declared `agentDataSchema` property).
fn validate_security(manifest: &Manifest) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for (name, action) in &manifest.actions {
        let Some(schema) = &action.agent_data_schema else {
            continue;
        };
        let base = format!("actions.{name}.agentDataSchema");

        check_constrained_strings(schema, schema, &base, &mut issues);

        if let Some(templates) = &action.response_templates {
            let properties: HashSet<&str> = schema
                .get("properties")
                .and_then(Value::as_object)
                .map(|p| p.keys().map(String::as_str).collect())
                .unwrap_or_default();

            for (template_id, template) in templates {
                for placeholder in extract_placeholders(&template.text) {
                    if !properties.contains(placeholder.as_str()) {
                        issues.push(ValidationIssue::new(
                            format!("actions.{name}.responseTemplates.{template_id}"),
                            format!(
                                "template placeholder '{{{{{placeholder}}}}}' does not resolve to an agentDataSchema property"
                            ),
                        ));
                    }
                }
            }
        }
    }

    issues
}

fn check_constrained_strings(root: &Value, node: &Value, base_path: &str, issues: &mut Vec<ValidationIssue>) {
    walk_schema(root, node, base_path, &mut |n, path| {
        if node_is_string_typed(n) && !is_constrained_string(n) {
            issues.push(ValidationIssue::new(
                path,
                "string leaf in agentDataSchema is unconstrained: must use enum, const, pattern, or a safe-listed format",
            ));
        }
    });
}

/// Extract `{{name}}` placeholder names from a template body via a
/// single regex pass (spec §4.1).
#[must_use]
pub fn extract_placeholders(text: &str) -> Vec<String> {
    let re = Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").unwrap();
    re.captures_iter(text)
        .map(|c| c[1].to_string())
        .collect()
}

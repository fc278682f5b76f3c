//! The trik manifest data model (spec §3.1).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use trikhub_core::Runtime;

/// A parsed, unvalidated `manifest.json` document.
///
/// Immutable once loaded; the gateway never mutates a `Manifest` after
/// [`crate::validate::validate`] accepts it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Manifest schema version. Must be `1`.
    #[serde(rename = "schemaVersion")]
    pub schema_version: u32,
    /// Unique skill id, used as the storage/config namespace key.
    pub id: String,
    pub name: String,
    pub description: String,
    /// Semver-shaped version string (`^\d+\.\d+\.\d+`).
    pub version: String,
    pub author: Option<String>,
    pub repository: Option<String>,
    pub license: Option<String>,
    /// Action name -> action definition. Must have at least one entry.
    pub actions: HashMap<String, Action>,
    #[serde(default)]
    pub capabilities: Capabilities,
    #[serde(default)]
    pub limits: Limits,
    pub entry: EntryPoint,
    /// Config keys (secrets/settings) this skill is permitted to read.
    #[serde(default)]
    pub config: ConfigSection,
}

/// The executable artifact a manifest's actions run against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryPoint {
    /// Path to the entry artifact, relative to the manifest's directory.
    pub path: String,
    /// Foreign-runtime tag. `None` means "matches the host runtime"
    /// (in-process dispatch).
    pub runtime: Option<Runtime>,
}

/// The response mode of an action — the core privilege-separation switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    Template,
    Passthrough,
}

/// A single named operation on a skill (spec §3.1 Action).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub description: String,
    #[serde(rename = "responseMode")]
    pub response_mode: ResponseMode,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,

    /// Required when `responseMode == template`; the schema of the data
    /// the agent is allowed to see. Every string leaf in this schema
    /// must be constrained (enum, const, pattern, or a safe-listed
    /// format) — free-form strings here are how prompt injection reaches
    /// the agent.
    #[serde(rename = "agentDataSchema", default, skip_serializing_if = "Option::is_none")]
    pub agent_data_schema: Option<Value>,
    /// Required when `responseMode == template`; template-id -> text.
    #[serde(rename = "responseTemplates", default, skip_serializing_if = "Option::is_none")]
    pub response_templates: Option<HashMap<String, ResponseTemplate>>,

    /// Required when `responseMode == passthrough`.
    #[serde(rename = "userContentSchema", default, skip_serializing_if = "Option::is_none")]
    pub user_content_schema: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseTemplate {
    pub text: String,
}

/// Capabilities a skill declares it needs (spec §3.1 Capabilities).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Capabilities {
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub storage: Option<StorageCapability>,
    #[serde(default)]
    pub session: Option<SessionCapability>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageCapability {
    pub enabled: bool,
    #[serde(rename = "maxSizeBytes")]
    pub max_size_bytes: Option<u64>,
    pub persistent: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCapability {
    pub enabled: bool,
    #[serde(rename = "maxDurationMs")]
    pub max_duration_ms: Option<u64>,
    #[serde(rename = "maxHistoryEntries")]
    pub max_history_entries: Option<usize>,
}

/// Declared resource limits for a manifest (execution time etc.); used by
/// the linter's `manifest-completeness` rule and the worker manager's
/// per-invoke timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Limits {
    #[serde(rename = "maxExecutionTimeMs", default = "default_exec_timeout")]
    pub max_execution_time_ms: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_execution_time_ms: default_exec_timeout(),
        }
    }
}

const fn default_exec_timeout() -> u64 {
    60_000
}

/// A config requirement declared by a manifest (spec §3.1 Config Requirement).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigRequirement {
    pub key: String,
    pub description: String,
}

/// The config section of a manifest: required/optional keys it may read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigSection {
    #[serde(default)]
    pub required: Vec<ConfigRequirement>,
    #[serde(default)]
    pub optional: Vec<ConfigRequirement>,
}

impl ConfigSection {
    /// All declared keys, required and optional.
    pub fn declared_keys(&self) -> impl Iterator<Item = &str> {
        self.required
            .iter()
            .chain(self.optional.iter())
            .map(|r| r.key.as_str())
    }
}

/// Gateway-computed tool surface entry (spec §3.1 Tool Definition).
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
    #[serde(rename = "responseMode")]
    pub response_mode: ResponseMode,
}

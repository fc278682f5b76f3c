//! Validated identifier newtypes shared across the gateway.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, GatewayResult};

/// Unique identifier for a trik (skill package), also used as its
/// storage/config namespace key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TrikId(String);

impl<'de> Deserialize<'de> for TrikId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

impl TrikId {
    /// Construct a `TrikId`, validating its shape.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is empty or contains characters other
    /// than lowercase ASCII alphanumerics, `-`, `_`, `.`, or `@`/`/`
    /// (the latter two permit scoped package names like `@scope/name`).
    pub fn new(id: impl Into<String>) -> GatewayResult<Self> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Build an id from a compile-time-known literal without validation.
    #[must_use]
    pub fn from_static(id: &str) -> Self {
        Self(id.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(id: &str) -> GatewayResult<()> {
        if id.is_empty() {
            return Err(GatewayError::InvalidParams("trik id must not be empty".into()));
        }
        let ok = id.chars().all(|c| {
            c.is_ascii_lowercase()
                || c.is_ascii_digit()
                || matches!(c, '-' | '_' | '.' | '@' | '/')
        });
        if !ok {
            return Err(GatewayError::InvalidParams(format!(
                "trik id '{id}' contains invalid characters"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for TrikId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TrikId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The runtime an action's entry point executes under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Runtime {
    Node,
    Python,
    /// Matches the host gateway process's own runtime (in-process dispatch).
    Native,
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Runtime::Node => "node",
            Runtime::Python => "python",
            Runtime::Native => "native",
        };
        f.write_str(s)
    }
}

/// Fully qualified tool name, `{trik_id}:{action}`.
#[must_use]
pub fn qualified_tool_name(trik_id: &TrikId, action: &str) -> String {
    format!("{trik_id}:{action}")
}

/// Split a qualified tool name back into its parts.
#[must_use]
pub fn split_tool_name(name: &str) -> Option<(&str, &str)> {
    name.split_once(':')
}

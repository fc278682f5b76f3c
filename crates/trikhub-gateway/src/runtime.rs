//! The contract a skill's entry point fulfils, regardless of whether it
//! runs in-process or across the worker protocol (spec §4.7, §4.8, §9).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use trikhub_config::TrikConfigContext;
use trikhub_core::GatewayResult;
use trikhub_storage::ScopedStorage;

use crate::session::SessionView;

/// What a skill's `invoke` call receives.
///
/// For a subprocess worker the same four things cross the wire as JSON
/// (`action`, `input`, `session`, `config`); for an in-process
/// [`SkillRuntime`] they are handed over as live Rust values instead,
/// including a storage handle already scoped to the caller's trik id.
pub struct SkillInput {
    pub action: String,
    pub input: Value,
    pub session: Option<SessionView>,
    pub config: TrikConfigContext,
    pub storage: ScopedStorage,
}

/// What a skill's `invoke` call returns, before the gateway validates
/// and routes it according to the action's declared response mode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillOutcome {
    /// Echoed back from the wire for parity with §4.5; the gateway
    /// dispatches by the manifest's declared mode, not this field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_content: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub needs_clarification: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clarification_questions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_session: Option<bool>,
}

/// An in-process skill implementation, registered by trik id (spec §4.8).
///
/// There is no embedded JS/Python interpreter and no dynamic native
/// loading in this workspace (the workspace denies `unsafe_code`), so a
/// manifest whose entry runtime is `native` — or absent, meaning "matches
/// the host" — dispatches to whatever implementation of this trait the
/// caller registered for that trik id, rather than to a loaded module.
#[async_trait]
pub trait SkillRuntime: Send + Sync {
    async fn invoke(&self, input: SkillInput) -> GatewayResult<SkillOutcome>;
}

//! The `Gateway`: manifest loading, the `execute` dispatch state machine,
//! template rendering, and passthrough receipt issuance (spec §4.7).

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{Value, json};
use tokio::sync::RwLock;
use tracing::info;

use trikhub_config::{ConfigStore, TrikConfigContext};
use trikhub_core::{GatewayError, GatewayResult, Runtime, TrikId};
use trikhub_manifest::{Manifest, ResponseMode, ToolDefinition, schema::validate_value};
use trikhub_storage::{ScopedStorage, StorageProvider};
use trikhub_worker::{SpawnRecipe, SubprocessWorkerManager};
use trikhub_worker_protocol::METHOD_INVOKE;

use crate::config::GatewayConfig;
use crate::content::{ContentStore, PassthroughContent};
use crate::registry::TrikRegistry;
use crate::runtime::{SkillInput, SkillOutcome, SkillRuntime};
use crate::session::{HistoryEntry, SessionStore, SessionView};
use crate::template;

/// The agent-visible result of a successful `execute` call (spec §3.1
/// Gateway Result, minus the `Error` arm — that is `GatewayError`).
#[derive(Debug, Clone)]
pub enum ExecuteOutcome {
    Template {
        agent_data: Value,
        template_text: String,
        session_id: Option<String>,
    },
    Passthrough {
        user_content_ref: String,
        session_id: Option<String>,
    },
    Clarification {
        questions: Vec<String>,
    },
}

/// Wires the registry, storage, config, session/content stores, and
/// dispatch backends (subprocess workers, in-process runners) into a
/// single callable surface.
pub struct Gateway {
    registry: TrikRegistry,
    storage: Arc<dyn StorageProvider>,
    config_store: ConfigStore,
    sessions: SessionStore,
    content: ContentStore,
    workers: SubprocessWorkerManager,
    native_runtimes: RwLock<HashMap<TrikId, Arc<dyn SkillRuntime>>>,
    config: GatewayConfig,
}

impl Gateway {
    #[must_use]
    pub fn new(storage: Arc<dyn StorageProvider>, config_store: ConfigStore, config: GatewayConfig) -> Self {
        Self {
            workers: SubprocessWorkerManager::new(Arc::clone(&storage)),
            registry: TrikRegistry::new(),
            storage,
            config_store,
            sessions: SessionStore::new(),
            content: ContentStore::new(),
            native_runtimes: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// `loadTrik(path)`: parse, validate, and register a manifest found
    /// at `dir/manifest.json`. Cross-runtime manifests also get a spawn
    /// recipe registered with the subprocess worker manager (no process
    /// is started until the first invocation).
    pub async fn load_trik(&self, dir: &Path) -> GatewayResult<TrikId> {
        let trik_id = self.registry.load_trik(dir).await?;
        let manifest = self.registry.manifest(&trik_id).await.expect("just inserted");

        if matches!(manifest.entry.runtime, Some(Runtime::Node) | Some(Runtime::Python)) {
            let recipe = SpawnRecipe {
                trik_id: trik_id.clone(),
                runtime: manifest.entry.runtime.expect("checked above"),
                entry_path: dir.join(&manifest.entry.path),
                working_dir: dir.to_path_buf(),
                startup_timeout_ms: self.config.worker_startup_timeout_ms,
            };
            self.workers.register(recipe).await;
        }

        info!(trik_id = %trik_id, "loaded trik");
        Ok(trik_id)
    }

    /// `loadTriksFromConfig({configPath})`.
    pub async fn load_triks_from_config(&self, config_path: &Path, base_dir: &Path) -> GatewayResult<Vec<TrikId>> {
        let ids = self.registry.load_triks_from_config(config_path, base_dir).await?;
        for id in &ids {
            if let Some(manifest) = self.registry.manifest(id).await {
                if matches!(manifest.entry.runtime, Some(Runtime::Node) | Some(Runtime::Python)) {
                    let dir = self.registry.dir(id).await.expect("just loaded");
                    let recipe = SpawnRecipe {
                        trik_id: id.clone(),
                        runtime: manifest.entry.runtime.expect("checked above"),
                        entry_path: dir.join(&manifest.entry.path),
                        working_dir: dir,
                        startup_timeout_ms: self.config.worker_startup_timeout_ms,
                    };
                    self.workers.register(recipe).await;
                }
            }
        }
        Ok(ids)
    }

    /// Register the in-process implementation of a `native`/host-runtime trik.
    pub async fn register_native_runtime(&self, trik_id: TrikId, runtime: Arc<dyn SkillRuntime>) {
        self.native_runtimes.write().await.insert(trik_id, runtime);
    }

    /// `getToolDefinitions()`.
    pub async fn get_tool_definitions(&self) -> Vec<ToolDefinition> {
        self.registry.tool_definitions().await
    }

    /// `execute(trikId, action, input, {sessionId?})`: the state machine
    /// of spec §4.7 — `VALIDATE_INPUT → RESOLVE_SESSION → DISPATCH →
    /// VALIDATE_OUTPUT → (RENDER_TEMPLATE | STORE_CONTENT) → RETURN`.
    pub async fn execute(
        &self,
        trik_id: &TrikId,
        action: &str,
        input: Value,
        session_id: Option<String>,
    ) -> GatewayResult<ExecuteOutcome> {
        let manifest = self
            .registry
            .manifest(trik_id)
            .await
            .ok_or_else(|| GatewayError::TrikNotFound(trik_id.to_string()))?;
        let action_def = manifest
            .actions
            .get(action)
            .ok_or_else(|| GatewayError::ActionNotFound(action.to_string()))?;

        validate_value(&action_def.input_schema, &action_def.input_schema, &input, "$")
            .map_err(GatewayError::InvalidParams)?;

        let session_enabled = manifest.capabilities.session.as_ref().is_some_and(|s| s.enabled);
        let resolved_session_id = if session_enabled {
            let ttl_ms = manifest
                .capabilities
                .session
                .as_ref()
                .and_then(|s| s.max_duration_ms)
                .unwrap_or(self.config.session_ttl_ms);
            if let Some(id) = &session_id {
                self.sessions.evict_if_expired(id, ttl_ms).await;
            }
            Some(self.sessions.ensure(trik_id, session_id).await)
        } else {
            None
        };
        let session_view = match &resolved_session_id {
            Some(id) => self.sessions.view(id).await,
            None => None,
        };

        let storage = ScopedStorage::new(Arc::clone(&self.storage), trik_id.clone());
        let config = TrikConfigContext::new(trik_id.to_string(), &manifest.config, self.config_store.clone());

        let outcome = self
            .dispatch(trik_id, &manifest, action, input.clone(), session_view, config, storage)
            .await?;

        if outcome.end_session.unwrap_or(false) {
            if let Some(id) = &resolved_session_id {
                self.sessions.end(id).await;
            }
        }

        if outcome.needs_clarification.unwrap_or(false) {
            return Ok(ExecuteOutcome::Clarification {
                questions: outcome.clarification_questions.unwrap_or_default(),
            });
        }

        let max_history = manifest
            .capabilities
            .session
            .as_ref()
            .and_then(|s| s.max_history_entries)
            .unwrap_or(self.config.session_max_history);

        match action_def.response_mode {
            ResponseMode::Template => {
                self.finish_template(action, input, action_def, outcome, &resolved_session_id, max_history)
                    .await
            },
            ResponseMode::Passthrough => {
                self.finish_passthrough(action, input, action_def, outcome, &resolved_session_id, max_history)
                    .await
            },
        }
    }

    async fn finish_template(
        &self,
        action: &str,
        input: Value,
        action_def: &trikhub_manifest::Action,
        outcome: SkillOutcome,
        session_id: &Option<String>,
        max_history: usize,
    ) -> GatewayResult<ExecuteOutcome> {
        let agent_data = outcome
            .agent_data
            .ok_or_else(|| GatewayError::SchemaValidationFailed("template action returned no agentData".into()))?;
        let schema = action_def
            .agent_data_schema
            .as_ref()
            .expect("manifest validation guarantees a template action declares agentDataSchema");
        validate_value(schema, schema, &agent_data, "$").map_err(GatewayError::SchemaValidationFailed)?;

        let templates = action_def
            .response_templates
            .as_ref()
            .expect("manifest validation guarantees a template action declares responseTemplates");
        let requested = agent_data.get("template").and_then(Value::as_str);
        let template = template::select_template(requested, templates)?;
        let template_text = template::render(&template.text, &agent_data).into_owned();

        if let Some(id) = session_id {
            self.sessions
                .record(
                    id,
                    HistoryEntry {
                        timestamp: Utc::now(),
                        action: action.to_string(),
                        input,
                        agent_data: Some(agent_data.clone()),
                    },
                    max_history,
                )
                .await;
        }

        Ok(ExecuteOutcome::Template {
            agent_data,
            template_text,
            session_id: session_id.clone(),
        })
    }

    async fn finish_passthrough(
        &self,
        action: &str,
        input: Value,
        action_def: &trikhub_manifest::Action,
        outcome: SkillOutcome,
        session_id: &Option<String>,
        max_history: usize,
    ) -> GatewayResult<ExecuteOutcome> {
        let user_content = outcome
            .user_content
            .ok_or_else(|| GatewayError::SchemaValidationFailed("passthrough action returned no userContent".into()))?;
        let schema = action_def
            .user_content_schema
            .as_ref()
            .expect("manifest validation guarantees a passthrough action declares userContentSchema");
        validate_value(schema, schema, &user_content, "$").map_err(GatewayError::SchemaValidationFailed)?;

        let content: PassthroughContent = serde_json::from_value(user_content).map_err(|e| {
            GatewayError::SchemaValidationFailed(format!(
                "userContent does not match {{contentType, content, metadata?}}: {e}"
            ))
        })?;
        let reference = self.content.put(content, self.config.passthrough_ttl_ms).await;

        if let Some(id) = session_id {
            self.sessions
                .record(
                    id,
                    HistoryEntry {
                        timestamp: Utc::now(),
                        action: action.to_string(),
                        input,
                        agent_data: None,
                    },
                    max_history,
                )
                .await;
        }

        Ok(ExecuteOutcome::Passthrough {
            user_content_ref: reference,
            session_id: session_id.clone(),
        })
    }

    async fn dispatch(
        &self,
        trik_id: &TrikId,
        manifest: &Manifest,
        action: &str,
        input: Value,
        session: Option<SessionView>,
        config: TrikConfigContext,
        storage: ScopedStorage,
    ) -> GatewayResult<SkillOutcome> {
        match manifest.entry.runtime {
            Some(Runtime::Node | Runtime::Python) => {
                let config_values: HashMap<&str, String> = manifest
                    .config
                    .declared_keys()
                    .filter_map(|key| config.get(key).map(|value| (key, value)))
                    .collect();
                let params = json!({
                    "action": action,
                    "input": input,
                    "session": session.map(|s| json!({"sessionId": s.session_id, "history": s.history})),
                    "config": config_values,
                });
                let value = self
                    .workers
                    .invoke(trik_id, METHOD_INVOKE, params, self.config.invoke_timeout_ms)
                    .await?;
                serde_json::from_value(value)
                    .map_err(|e| GatewayError::Internal(format!("worker returned malformed invoke result: {e}")))
            },
            Some(Runtime::Native) | None => {
                let runtime = self
                    .native_runtimes
                    .read()
                    .await
                    .get(trik_id)
                    .cloned()
                    .ok_or_else(|| GatewayError::WorkerNotReady(format!("no in-process runtime registered for {trik_id}")))?;
                runtime
                    .invoke(SkillInput { action: action.to_string(), input, session, config, storage })
                    .await
            },
        }
    }

    /// `deliverContent(ref)`: remove and return a stored passthrough
    /// payload, or `None` if unknown/already-redeemed/expired.
    pub async fn deliver_content(&self, reference: &str) -> Option<PassthroughContent> {
        self.content.take(reference).await
    }

    /// Current storage usage for a trik, exposed for scenarios like
    /// "assert `getUsage(trikId) > 0`" (spec §8.3).
    pub async fn get_usage(&self, trik_id: &TrikId) -> GatewayResult<u64> {
        Ok(self.storage.usage_bytes(trik_id).await?)
    }

    /// `shutdown()`: stop every worker and clear session state.
    pub async fn shutdown(&self) {
        self.workers.shutdown_all(self.config.worker_shutdown_grace_ms).await;
        self.sessions.clear().await;
    }
}

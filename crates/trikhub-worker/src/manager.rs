//! Tracks one [`WorkerHandle`] per loaded trik, spawning on demand and
//! respawning after a crash (spec §4.6, §5.2).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use trikhub_core::TrikId;
use trikhub_storage::{ScopedStorage, StorageProvider};

use crate::error::{WorkerError, WorkerResult};
use crate::handle::WorkerHandle;
use crate::recipe::SpawnRecipe;

/// Owns the subprocess workers for every loaded trik that uses one.
///
/// Workers are spawned lazily on first invocation and kept alive across
/// calls; a crashed or terminated worker is respawned from its original
/// [`SpawnRecipe`] the next time it is needed.
pub struct SubprocessWorkerManager {
    storage: Arc<dyn StorageProvider>,
    recipes: RwLock<HashMap<TrikId, SpawnRecipe>>,
    workers: RwLock<HashMap<TrikId, Arc<WorkerHandle>>>,
}

impl SubprocessWorkerManager {
    #[must_use]
    pub fn new(storage: Arc<dyn StorageProvider>) -> Self {
        Self {
            storage,
            recipes: RwLock::new(HashMap::new()),
            workers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a trik's spawn recipe without starting its process yet.
    pub async fn register(&self, recipe: SpawnRecipe) {
        self.recipes.write().await.insert(recipe.trik_id.clone(), recipe);
    }

    /// Invoke an action on the named trik's worker, spawning it first if
    /// it is not already running.
    pub async fn invoke(
        &self,
        trik_id: &TrikId,
        method: &str,
        params: serde_json::Value,
        timeout_ms: u64,
    ) -> WorkerResult<serde_json::Value> {
        let worker = self.get_or_spawn(trik_id).await?;
        match worker.invoke(method, params.clone(), timeout_ms).await {
            Ok(value) => Ok(value),
            Err(WorkerError::ChannelTerminated) => {
                warn!(trik_id = %trik_id, "worker channel terminated, respawning once");
                let respawned = self.respawn(trik_id).await?;
                respawned.invoke(method, params, timeout_ms).await
            },
            Err(other) => Err(other),
        }
    }

    async fn get_or_spawn(&self, trik_id: &TrikId) -> WorkerResult<Arc<WorkerHandle>> {
        if let Some(handle) = self.workers.read().await.get(trik_id) {
            if handle.is_ready() {
                return Ok(Arc::clone(handle));
            }
        }
        self.respawn(trik_id).await
    }

    async fn respawn(&self, trik_id: &TrikId) -> WorkerResult<Arc<WorkerHandle>> {
        let recipe = self
            .recipes
            .read()
            .await
            .get(trik_id)
            .cloned()
            .ok_or_else(|| WorkerError::Protocol(format!("no spawn recipe registered for {trik_id}")))?;

        let scoped = ScopedStorage::new(Arc::clone(&self.storage), trik_id.clone());
        info!(trik_id = %trik_id, "spawning worker");
        let handle = Arc::new(WorkerHandle::spawn(recipe, scoped).await?);
        self.workers.write().await.insert(trik_id.clone(), Arc::clone(&handle));
        Ok(handle)
    }

    /// Gracefully shut down every running worker.
    pub async fn shutdown_all(&self, grace_ms: u64) {
        let workers = self.workers.write().await.drain().collect::<Vec<_>>();
        for (trik_id, handle) in workers {
            if let Err(err) = handle.shutdown(grace_ms).await {
                warn!(trik_id = %trik_id, error = %err, "worker shutdown did not complete cleanly");
            }
        }
    }

    #[must_use]
    pub async fn is_running(&self, trik_id: &TrikId) -> bool {
        self.workers
            .read()
            .await
            .get(trik_id)
            .is_some_and(|h| h.is_ready())
    }
}

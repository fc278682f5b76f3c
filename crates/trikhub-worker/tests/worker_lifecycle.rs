//! End-to-end test of the subprocess worker against a fixture Python
//! process speaking the JSON-RPC wire protocol.

use std::path::PathBuf;
use std::sync::Arc;

use trikhub_core::{Runtime, TrikId};
use trikhub_storage::{MemoryStorageProvider, ScopedStorage};
use trikhub_worker::{SpawnRecipe, WorkerHandle};

fn fixture_recipe() -> SpawnRecipe {
    let entry_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/echo_worker.py");
    SpawnRecipe {
        trik_id: TrikId::new("echo-fixture").unwrap(),
        runtime: Runtime::Python,
        entry_path,
        working_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")),
        startup_timeout_ms: 5_000,
    }
}

fn scoped_memory_storage(trik_id: &TrikId) -> ScopedStorage {
    let provider: Arc<dyn trikhub_storage::StorageProvider> = Arc::new(MemoryStorageProvider::new());
    ScopedStorage::new(provider, trik_id.clone())
}

#[tokio::test]
async fn spawns_and_answers_health_handshake() {
    let recipe = fixture_recipe();
    let storage = scoped_memory_storage(&recipe.trik_id);
    let worker = WorkerHandle::spawn(recipe, storage).await.expect("worker should become healthy");
    assert!(worker.is_ready());
}

#[tokio::test]
async fn invoke_round_trips_params_through_the_worker() {
    let recipe = fixture_recipe();
    let storage = scoped_memory_storage(&recipe.trik_id);
    let worker = WorkerHandle::spawn(recipe, storage).await.unwrap();

    let result = worker
        .invoke("invoke", serde_json::json!({"query": "rust"}), 2_000)
        .await
        .expect("invoke should succeed");

    assert_eq!(result["echoed"]["query"], "rust");
}

#[tokio::test]
async fn shutdown_is_graceful() {
    let recipe = fixture_recipe();
    let storage = scoped_memory_storage(&recipe.trik_id);
    let worker = WorkerHandle::spawn(recipe, storage).await.unwrap();

    worker.shutdown(2_000).await.expect("shutdown should complete");
    assert!(!worker.is_ready());
}

//! A single running (or restartable) worker process and its JSON-RPC
//! channel (spec §4.6).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr};
use tokio::sync::{oneshot, Mutex};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info, warn};

use trikhub_storage::ScopedStorage;
use trikhub_worker_protocol::{
    RpcCodec, RpcError, RpcMessage, RpcRequest, RpcResponse, METHOD_HEALTH, METHOD_SHUTDOWN,
    METHOD_STORAGE_DELETE, METHOD_STORAGE_GET, METHOD_STORAGE_GET_MANY, METHOD_STORAGE_LIST,
    METHOD_STORAGE_SET, METHOD_STORAGE_SET_MANY,
};

use crate::error::{WorkerError, WorkerResult};
use crate::recipe::SpawnRecipe;

type PendingTable = Arc<Mutex<HashMap<String, oneshot::Sender<RpcResponse>>>>;

/// A live worker process plus its bidirectional JSON-RPC channel.
///
/// Invocations are serialized per worker (spec §5.2): [`WorkerHandle::invoke`]
/// takes an internal lock so only one `invoke` round-trip is in flight at a
/// time, while inbound `storage.*` proxy calls from the worker are still
/// serviced concurrently by the background reader task.
pub struct WorkerHandle {
    recipe: SpawnRecipe,
    child: Mutex<Child>,
    writer: Arc<Mutex<FramedWrite<tokio::process::ChildStdin, RpcCodec>>>,
    pending: PendingTable,
    ready: Arc<AtomicBool>,
    reader_task: tokio::task::JoinHandle<()>,
    stderr_task: tokio::task::JoinHandle<()>,
    invoke_lock: Mutex<()>,
}

impl WorkerHandle {
    /// Spawn the process and block until it answers a `health` handshake
    /// or the startup deadline elapses.
    pub async fn spawn(recipe: SpawnRecipe, storage: ScopedStorage) -> WorkerResult<Self> {
        let mut child = recipe.command().spawn()?;
        let stdin = child.stdin.take().ok_or(WorkerError::ChannelTerminated)?;
        let stdout = child.stdout.take().ok_or(WorkerError::ChannelTerminated)?;
        let stderr = child.stderr.take().ok_or(WorkerError::ChannelTerminated)?;

        let writer = Arc::new(Mutex::new(FramedWrite::new(stdin, RpcCodec::new())));
        let pending: PendingTable = Arc::new(Mutex::new(HashMap::new()));
        let ready = Arc::new(AtomicBool::new(false));

        let reader_task = spawn_reader(
            FramedRead::new(stdout, RpcCodec::new()),
            Arc::clone(&writer),
            Arc::clone(&pending),
            Arc::clone(&ready),
            storage,
            recipe.trik_id.clone(),
        );
        let stderr_task = spawn_stderr_drain(stderr, recipe.trik_id.clone());

        let handle = Self {
            recipe: recipe.clone(),
            child: Mutex::new(child),
            writer,
            pending,
            ready,
            reader_task,
            stderr_task,
            invoke_lock: Mutex::new(()),
        };

        handle.await_health(recipe.startup_timeout_ms).await?;
        Ok(handle)
    }

    async fn await_health(&self, timeout_ms: u64) -> WorkerResult<()> {
        let result = tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            self.invoke_raw(METHOD_HEALTH, None),
        )
        .await;
        match result {
            Ok(Ok(_)) => {
                self.ready.store(true, Ordering::SeqCst);
                info!(trik_id = %self.recipe.trik_id, "worker healthy");
                Ok(())
            },
            Ok(Err(err)) => Err(err),
            Err(_) => Err(WorkerError::StartupTimeout(timeout_ms)),
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn trik_id(&self) -> &trikhub_core::TrikId {
        &self.recipe.trik_id
    }

    /// Invoke an action on the worker, enforcing both the per-call
    /// `timeout_ms` and single-concurrent-invocation serialization.
    pub async fn invoke(
        &self,
        method: &str,
        params: serde_json::Value,
        timeout_ms: u64,
    ) -> WorkerResult<serde_json::Value> {
        let _guard = self.invoke_lock.lock().await;
        if !self.is_ready() {
            return Err(WorkerError::ChannelTerminated);
        }
        match tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            self.invoke_raw(method, Some(params)),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(WorkerError::Timeout(timeout_ms)),
        }
    }

    async fn invoke_raw(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> WorkerResult<serde_json::Value> {
        let request = RpcRequest::minted(method, params);
        let id = request.id.clone();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        if let Err(err) = self
            .writer
            .lock()
            .await
            .send(RpcMessage::Request(request))
            .await
        {
            self.pending.lock().await.remove(&id);
            return Err(WorkerError::Protocol(err.to_string()));
        }

        match rx.await {
            Ok(response) => response_to_result(response),
            Err(_) => Err(WorkerError::ChannelTerminated),
        }
    }

    /// Best-effort graceful shutdown: ask nicely, then kill after a grace
    /// period if the process has not exited.
    pub async fn shutdown(&self, grace_ms: u64) -> WorkerResult<()> {
        let _ = tokio::time::timeout(
            Duration::from_millis(grace_ms),
            self.invoke_raw(METHOD_SHUTDOWN, None),
        )
        .await;
        self.ready.store(false, Ordering::SeqCst);

        let mut child = self.child.lock().await;
        match tokio::time::timeout(Duration::from_millis(grace_ms), child.wait()).await {
            Ok(_) => {},
            Err(_) => {
                warn!(trik_id = %self.recipe.trik_id, "worker did not exit in time, killing");
                let _ = child.kill().await;
            },
        }
        self.reader_task.abort();
        self.stderr_task.abort();
        Ok(())
    }
}

fn response_to_result(response: RpcResponse) -> WorkerResult<serde_json::Value> {
    if let Some(error) = response.error {
        return Err(WorkerError::Remote(error.message));
    }
    Ok(response.result.unwrap_or(serde_json::Value::Null))
}

#[allow(clippy::too_many_lines)]
fn spawn_reader(
    mut reader: FramedRead<tokio::process::ChildStdout, RpcCodec>,
    writer: Arc<Mutex<FramedWrite<tokio::process::ChildStdin, RpcCodec>>>,
    pending: PendingTable,
    ready: Arc<AtomicBool>,
    storage: ScopedStorage,
    trik_id: trikhub_core::TrikId,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = reader.next().await {
            match frame {
                Ok(RpcMessage::Response(resp)) => {
                    if let Some(tx) = pending.lock().await.remove(&resp.id) {
                        let _ = tx.send(resp);
                    }
                },
                Ok(RpcMessage::Request(req)) => {
                    let response = handle_inbound_request(&storage, req.clone()).await;
                    if let Err(err) = writer.lock().await.send(RpcMessage::Response(response)).await {
                        error!(trik_id = %trik_id, error = %err, "failed to answer worker request");
                        break;
                    }
                },
                Err(err) => {
                    error!(trik_id = %trik_id, error = %err, "worker produced a malformed frame, dropping it");
                    continue;
                },
            }
        }
        ready.store(false, Ordering::SeqCst);
        debug!(trik_id = %trik_id, "worker reader loop ended, failing pending calls");
        let mut pending = pending.lock().await;
        for (_, tx) in pending.drain() {
            let _ = tx.send(RpcResponse::failure(
                String::new(),
                RpcError::new(
                    trikhub_worker_protocol::RPC_INTERNAL_ERROR,
                    "worker channel terminated",
                ),
            ));
        }
    })
}

fn spawn_stderr_drain(stderr: ChildStderr, trik_id: trikhub_core::TrikId) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            warn!(trik_id = %trik_id, worker_stderr = %line, "worker stderr");
        }
    })
}

/// Service one inbound `storage.*` request against the worker's scoped
/// storage namespace (spec §4.6 "storage proxy").
async fn handle_inbound_request(storage: &ScopedStorage, req: RpcRequest) -> RpcResponse {
    let result = dispatch_storage(storage, &req.method, req.params.unwrap_or(serde_json::Value::Null)).await;
    match result {
        Ok(value) => RpcResponse::success(req.id, value),
        Err(err) => RpcResponse::failure(req.id, RpcError::from_gateway_error(&err.into())),
    }
}

async fn dispatch_storage(
    storage: &ScopedStorage,
    method: &str,
    params: serde_json::Value,
) -> WorkerResult<serde_json::Value> {
    use serde_json::json;

    match method {
        METHOD_STORAGE_GET => {
            let key = param_str(&params, "key")?;
            let value = storage.get(&key).await?;
            Ok(json!(value))
        },
        METHOD_STORAGE_SET => {
            let key = param_str(&params, "key")?;
            let value = params.get("value").cloned().unwrap_or(serde_json::Value::Null);
            let ttl_ms = params.get("ttlMs").and_then(serde_json::Value::as_u64);
            storage.set(&key, value, ttl_ms).await?;
            Ok(json!(null))
        },
        METHOD_STORAGE_DELETE => {
            let key = param_str(&params, "key")?;
            let existed = storage.delete(&key).await?;
            Ok(json!(existed))
        },
        METHOD_STORAGE_LIST => {
            let prefix = params.get("prefix").and_then(serde_json::Value::as_str);
            let keys = storage.list(prefix).await?;
            Ok(json!(keys))
        },
        METHOD_STORAGE_GET_MANY => {
            let keys = param_str_array(&params, "keys")?;
            let values = storage.get_many(&keys).await?;
            Ok(json!(values))
        },
        METHOD_STORAGE_SET_MANY => {
            let entries = params
                .get("entries")
                .and_then(serde_json::Value::as_object)
                .ok_or_else(|| WorkerError::Protocol("setMany requires an 'entries' object".into()))?;
            let entries: std::collections::HashMap<String, serde_json::Value> =
                entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            storage.set_many(entries).await?;
            Ok(json!(null))
        },
        other => Err(WorkerError::Protocol(format!("unknown inbound method: {other}"))),
    }
}

fn param_str(params: &serde_json::Value, field: &str) -> WorkerResult<String> {
    params
        .get(field)
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| WorkerError::Protocol(format!("missing '{field}' param")))
}

fn param_str_array(params: &serde_json::Value, field: &str) -> WorkerResult<Vec<String>> {
    params
        .get(field)
        .and_then(serde_json::Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .ok_or_else(|| WorkerError::Protocol(format!("missing '{field}' param")))
}

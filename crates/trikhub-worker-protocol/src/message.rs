//! JSON-RPC 2.0 message envelopes exchanged with a skill worker process
//! (spec §4.5).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The `"jsonrpc"` field value, always `"2.0"`.
pub const JSONRPC_VERSION: &str = "2.0";

/// Method name for gateway-to-worker action dispatch.
pub const METHOD_INVOKE: &str = "invoke";
/// Method name for the startup/liveness handshake.
pub const METHOD_HEALTH: &str = "health";
/// Method name for graceful shutdown.
pub const METHOD_SHUTDOWN: &str = "shutdown";
/// Method name prefix for worker-to-gateway storage proxy calls.
pub const METHOD_STORAGE_GET: &str = "storage.get";
pub const METHOD_STORAGE_SET: &str = "storage.set";
pub const METHOD_STORAGE_DELETE: &str = "storage.delete";
pub const METHOD_STORAGE_LIST: &str = "storage.list";
pub const METHOD_STORAGE_GET_MANY: &str = "storage.getMany";
pub const METHOD_STORAGE_SET_MANY: &str = "storage.setMany";

/// Standard JSON-RPC 2.0 reserved error codes, used alongside the
/// gateway's custom 1001-1006 range from [`trikhub_core::ErrorCode`].
pub const RPC_PARSE_ERROR: i64 = -32700;
pub const RPC_INVALID_REQUEST: i64 = -32600;
pub const RPC_METHOD_NOT_FOUND: i64 = -32601;
pub const RPC_INVALID_PARAMS: i64 = -32602;
pub const RPC_INTERNAL_ERROR: i64 = -32603;

/// A request, flowing in either direction over the worker's stdio pipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub id: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl RpcRequest {
    #[must_use]
    pub fn new(id: impl Into<String>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.into(),
            method: method.into(),
            params,
        }
    }

    /// Build a request with a freshly minted UUID id.
    #[must_use]
    pub fn minted(method: impl Into<String>, params: Option<Value>) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), method, params)
    }
}

/// A JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    #[must_use]
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    #[must_use]
    pub fn from_gateway_error(err: &trikhub_core::GatewayError) -> Self {
        let code = err.code();
        let rpc_code = code.rpc_code().unwrap_or(RPC_INTERNAL_ERROR);
        Self::new(rpc_code, err.to_string())
    }
}

/// A response, correlated to a request by `id`. Exactly one of
/// `result`/`error` is set, matching JSON-RPC 2.0's success-xor-failure
/// contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    #[must_use]
    pub fn success(id: impl Into<String>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.into(),
            result: Some(result),
            error: None,
        }
    }

    #[must_use]
    pub fn failure(id: impl Into<String>, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.into(),
            result: None,
            error: Some(error),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Either side of a message exchange can receive a request or a response
/// on the same pipe; this enum lets a reader dispatch on tag-free shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcMessage {
    Request(RpcRequest),
    Response(RpcResponse),
}

impl RpcMessage {
    /// A frame is a request iff it carries `method`; serde's untagged
    /// matching already enforces this, but callers sometimes want it
    /// without a full match.
    #[must_use]
    pub fn is_request(&self) -> bool {
        matches!(self, RpcMessage::Request(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trips_through_json() {
        let req = RpcRequest::new("abc", METHOD_INVOKE, Some(serde_json::json!({"a": 1})));
        let text = serde_json::to_string(&req).unwrap();
        let parsed: RpcRequest = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.id, "abc");
        assert_eq!(parsed.method, METHOD_INVOKE);
    }

    #[test]
    fn untagged_message_distinguishes_request_from_response() {
        let req_text = serde_json::to_string(&RpcRequest::new("1", METHOD_HEALTH, None)).unwrap();
        let resp_text =
            serde_json::to_string(&RpcResponse::success("1", serde_json::json!({"ok": true}))).unwrap();

        let req: RpcMessage = serde_json::from_str(&req_text).unwrap();
        let resp: RpcMessage = serde_json::from_str(&resp_text).unwrap();

        assert!(req.is_request());
        assert!(!resp.is_request());
    }

    #[test]
    fn response_is_success_xor_error() {
        let ok = RpcResponse::success("1", serde_json::json!(null));
        let err = RpcResponse::failure("1", RpcError::new(1001, "not found"));
        assert!(ok.is_success());
        assert!(!err.is_success());
    }
}

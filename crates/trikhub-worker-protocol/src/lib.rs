//! Wire types and line framing for the gateway-to-worker JSON-RPC
//! channel (spec §4.5).

#![deny(unsafe_code)]

pub mod framing;
pub mod message;

pub use framing::{RpcCodec, RpcCodecError, MAX_FRAME_BYTES};
pub use message::{
    RpcError, RpcMessage, RpcRequest, RpcResponse, JSONRPC_VERSION, METHOD_HEALTH, METHOD_INVOKE,
    METHOD_SHUTDOWN, METHOD_STORAGE_DELETE, METHOD_STORAGE_GET, METHOD_STORAGE_GET_MANY,
    METHOD_STORAGE_LIST, METHOD_STORAGE_SET, METHOD_STORAGE_SET_MANY, RPC_INTERNAL_ERROR,
    RPC_INVALID_PARAMS, RPC_INVALID_REQUEST, RPC_METHOD_NOT_FOUND, RPC_PARSE_ERROR,
};

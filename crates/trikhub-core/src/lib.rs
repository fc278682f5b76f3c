//! Shared identifiers and error taxonomy for the TrikHub gateway.
//!
//! Every other crate in the workspace depends on this one for
//! [`GatewayError`]/[`GatewayResult`] and the [`TrikId`]/[`Runtime`]
//! newtypes, so that a failure anywhere in the stack can be reported
//! through the same `{code, message}` shape.

#![deny(unsafe_code)]

pub mod error;
pub mod ids;

pub use error::{ErrorCode, GatewayError, GatewayResult};
pub use ids::{Runtime, TrikId, qualified_tool_name, split_tool_name};

//! The TrikHub gateway: loads trik manifests, dispatches invocations to
//! in-process or subprocess skill code, renders agent-visible templates,
//! and issues opaque passthrough receipts (spec §4.7-§4.10).

#![deny(unsafe_code)]

pub mod config;
pub mod content;
pub mod gateway;
pub mod registry;
pub mod runtime;
pub mod session;
pub mod template;

pub use config::GatewayConfig;
pub use content::{ContentStore, PassthroughContent};
pub use gateway::{ExecuteOutcome, Gateway};
pub use registry::TrikRegistry;
pub use runtime::{SkillInput, SkillOutcome, SkillRuntime};
pub use session::{HistoryEntry, Session, SessionStore, SessionView};

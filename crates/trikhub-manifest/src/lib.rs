//! Trik manifest model, JSON Schema subset validator, and the
//! mode/schema agreement and agent-visible-constraint checks (spec §4.1).

#![deny(unsafe_code)]

pub mod error;
pub mod loader;
pub mod model;
pub mod schema;
pub mod validate;

pub use error::{ManifestError, ManifestResult};
pub use loader::{load_manifest, parse_manifest};
pub use model::{
    Action, Capabilities, ConfigRequirement, ConfigSection, EntryPoint, Limits, Manifest,
    ResponseMode, ResponseTemplate, SessionCapability, StorageCapability, ToolDefinition,
};
pub use validate::{ValidationIssue, extract_placeholders, validate};

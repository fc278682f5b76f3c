//! Manifest-specific error type.

use thiserror::Error;

use crate::validate::ValidationIssue;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("manifest failed validation with {} issue(s)", .0.len())]
    Invalid(Vec<ValidationIssue>),
}

impl ManifestError {
    /// The validation issues, if this is an [`ManifestError::Invalid`].
    #[must_use]
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            ManifestError::Invalid(issues) => issues,
            ManifestError::Io { .. } | ManifestError::Parse { .. } => &[],
        }
    }
}

pub type ManifestResult<T> = Result<T, ManifestError>;

//! The diagnostic shape the linter produces (spec §4.2).

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub rule: String,
    pub severity: Severity,
    pub message: String,
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

impl Diagnostic {
    #[must_use]
    pub fn new(rule: &str, severity: Severity, message: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            rule: rule.to_string(),
            severity,
            message: message.into(),
            file: file.into(),
            line: None,
            column: None,
        }
    }

    #[must_use]
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    #[must_use]
    pub fn error(rule: &str, message: impl Into<String>, file: impl Into<String>) -> Self {
        Self::new(rule, Severity::Error, message, file)
    }

    #[must_use]
    pub fn warning(rule: &str, message: impl Into<String>, file: impl Into<String>) -> Self {
        Self::new(rule, Severity::Warning, message, file)
    }

    #[must_use]
    pub fn info(rule: &str, message: impl Into<String>, file: impl Into<String>) -> Self {
        Self::new(rule, Severity::Info, message, file)
    }
}

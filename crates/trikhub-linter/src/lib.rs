//! Static audit of a trik package before install or publish (spec §4.2).

#![deny(unsafe_code)]

pub mod diagnostic;
pub mod lint;
pub mod rules;

pub use diagnostic::{Diagnostic, Severity};
pub use lint::{lint_trik_directory, LintOptions, LintReport};

//! Top-level entry point: find a trik's manifest, run every rule, and
//! collect diagnostics (spec §4.2, §6.6).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use trikhub_manifest::loader::parse_manifest;

use crate::diagnostic::{Diagnostic, Severity};
use crate::rules::{manifest_rules, source_rules};

/// Options controlling which rules run and how severities are treated.
#[derive(Debug, Clone, Default)]
pub struct LintOptions {
    pub warnings_as_errors: bool,
    pub skip: HashSet<String>,
    /// Assert the compiled entry artifact is present (the mode `publish` uses).
    pub check_entry_point: bool,
}

/// The result of linting one trik package.
#[derive(Debug, Clone)]
pub struct LintReport {
    pub diagnostics: Vec<Diagnostic>,
}

impl LintReport {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    /// Exit code per spec §6.6: 0 if no errors, 1 otherwise.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(self.has_errors())
    }
}

/// Lint a trik package directory: a root `manifest.json` (same-runtime
/// package) or exactly one subdirectory containing it (cross-runtime).
///
/// This function is a pure read of the filesystem: no network I/O, no
/// side effects, same output for the same input directory.
#[must_use]
pub fn lint_trik_directory(dir: &Path, options: &LintOptions) -> LintReport {
    let (manifest_path, package_dir) = match locate_manifest(dir) {
        Some(found) => found,
        None => {
            return LintReport {
                diagnostics: vec![Diagnostic::error(
                    "valid-manifest",
                    "no manifest.json found at the package root or in a single subdirectory",
                    dir.display().to_string(),
                )],
            };
        },
    };

    let manifest_text = std::fs::read_to_string(&manifest_path).ok();
    let load_result = parse_manifest(
        manifest_text.as_deref().unwrap_or(""),
        &manifest_path,
    );

    let mut diagnostics =
        manifest_rules::check_manifest(&load_result, &manifest_path, manifest_text.as_deref());

    if let Ok(manifest) = &load_result {
        if options.check_entry_point {
            let entry_path = package_dir.join(&manifest.entry.path);
            if !entry_path.exists() {
                diagnostics.push(Diagnostic::error(
                    "entry-point-exists",
                    format!("entry point '{}' does not exist", entry_path.display()),
                    manifest_path.display().to_string(),
                ));
            }
        }

        let declared_tools: HashSet<String> = manifest.capabilities.tools.iter().cloned().collect();
        if let Some(runtime) = manifest.entry.runtime {
            diagnostics.extend(scan_source_files(&package_dir, runtime, &declared_tools));
        }
    }

    diagnostics.retain(|d| !options.skip.contains(&d.rule));

    if options.warnings_as_errors {
        for d in &mut diagnostics {
            if d.severity == Severity::Warning {
                d.severity = Severity::Error;
            }
        }
    }

    LintReport { diagnostics }
}

fn locate_manifest(dir: &Path) -> Option<(PathBuf, PathBuf)> {
    let root_manifest = dir.join("manifest.json");
    if root_manifest.is_file() {
        return Some((root_manifest, dir.to_path_buf()));
    }

    let mut subdirs = std::fs::read_dir(dir)
        .ok()?
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_dir());

    let first = subdirs.next()?;
    if subdirs.next().is_some() {
        return None;
    }
    let candidate = first.path().join("manifest.json");
    candidate.is_file().then(|| (candidate, first.path()))
}

fn scan_source_files(
    package_dir: &Path,
    runtime: trikhub_core::Runtime,
    declared_tools: &HashSet<String>,
) -> Vec<Diagnostic> {
    let extension = match runtime {
        trikhub_core::Runtime::Node => "js",
        trikhub_core::Runtime::Python => "py",
        trikhub_core::Runtime::Native => return Vec::new(),
    };

    let mut diagnostics = Vec::new();
    let Ok(entries) = std::fs::read_dir(package_dir) else {
        return diagnostics;
    };

    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        if path.extension().and_then(std::ffi::OsStr::to_str) != Some(extension) {
            continue;
        }
        if let Ok(text) = std::fs::read_to_string(&path) {
            diagnostics.extend(source_rules::check_source_file(runtime, &path, &text, declared_tools));
        }
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(path: &Path, contents: &str) {
        let mut f = std::fs::File::create(path).unwrap();
        write!(f, "{contents}").unwrap();
    }

    #[test]
    fn reports_missing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let report = lint_trik_directory(dir.path(), &LintOptions::default());
        assert!(report.has_errors());
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn lints_a_well_formed_same_runtime_package() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = serde_json::json!({
            "schemaVersion": 1,
            "id": "search",
            "name": "Search",
            "description": "Search the web",
            "version": "1.0.0",
            "repository": "https://example.com",
            "license": "MIT",
            "actions": {
                "search": {
                    "description": "run a search",
                    "responseMode": "template",
                    "inputSchema": {"type": "object"},
                    "agentDataSchema": {
                        "type": "object",
                        "properties": {"count": {"type": "integer"}}
                    },
                    "responseTemplates": {
                        "default": {"text": "found {{count}} results"}
                    }
                }
            },
            "entry": {"path": "index.js", "runtime": "node"}
        });
        write_file(&dir.path().join("manifest.json"), &manifest.to_string());
        write_file(&dir.path().join("index.js"), "module.exports = {};\n");

        let report = lint_trik_directory(dir.path(), &LintOptions::default());
        assert!(!report.has_errors(), "{:?}", report.diagnostics);
    }

    #[test]
    fn warnings_as_errors_promotes_severity() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = serde_json::json!({
            "schemaVersion": 1,
            "id": "search",
            "name": "Search",
            "description": "",
            "version": "1.0.0",
            "actions": {
                "search": {
                    "description": "run a search",
                    "responseMode": "template",
                    "inputSchema": {"type": "object"},
                    "agentDataSchema": {
                        "type": "object",
                        "properties": {"count": {"type": "integer"}}
                    },
                    "responseTemplates": {
                        "success": {"text": "found {{count}} results"}
                    }
                }
            },
            "entry": {"path": "index.js", "runtime": "node"}
        });
        write_file(&dir.path().join("manifest.json"), &manifest.to_string());
        write_file(&dir.path().join("index.js"), "module.exports = {};\n");

        let lenient = lint_trik_directory(dir.path(), &LintOptions::default());
        assert!(!lenient.has_errors());

        let strict = lint_trik_directory(
            dir.path(),
            &LintOptions {
                warnings_as_errors: true,
                ..LintOptions::default()
            },
        );
        assert!(strict.has_errors());
    }
}

//! Source-level rules applied to same-runtime package source files
//! (spec §4.2 "Source rules").

use std::collections::HashSet;
use std::path::Path;

use regex::Regex;
use trikhub_core::Runtime;

use crate::diagnostic::Diagnostic;

struct SourcePatterns {
    forbidden_imports: Vec<(&'static str, Regex)>,
    dynamic_eval: Regex,
    env_access: Regex,
}

fn patterns_for(runtime: Runtime) -> SourcePatterns {
    match runtime {
        Runtime::Node => SourcePatterns {
            forbidden_imports: vec![
                ("fs", Regex::new(r#"require\(\s*['"]fs['"]\s*\)|from\s+['"]fs['"]"#).unwrap()),
                (
                    "child_process",
                    Regex::new(r#"require\(\s*['"]child_process['"]\s*\)|from\s+['"]child_process['"]"#).unwrap(),
                ),
                ("net", Regex::new(r#"require\(\s*['"]net['"]\s*\)|from\s+['"]net['"]"#).unwrap()),
                ("http", Regex::new(r#"require\(\s*['"]https?['"]\s*\)|from\s+['"]https?['"]"#).unwrap()),
            ],
            dynamic_eval: Regex::new(r"\beval\s*\(|\bnew\s+Function\s*\(").unwrap(),
            env_access: Regex::new(r"process\.env").unwrap(),
        },
        Runtime::Python | Runtime::Native => SourcePatterns {
            forbidden_imports: vec![
                ("os", Regex::new(r"^\s*import\s+os\b|^\s*from\s+os\s+import").unwrap()),
                (
                    "subprocess",
                    Regex::new(r"^\s*import\s+subprocess\b|^\s*from\s+subprocess\s+import").unwrap(),
                ),
                ("socket", Regex::new(r"^\s*import\s+socket\b|^\s*from\s+socket\s+import").unwrap()),
                (
                    "urllib/requests",
                    Regex::new(r"^\s*import\s+(urllib|requests)\b|^\s*from\s+(urllib|requests)\s+import").unwrap(),
                ),
            ],
            dynamic_eval: Regex::new(r"\beval\s*\(|\bexec\s*\(").unwrap(),
            env_access: Regex::new(r"os\.environ").unwrap(),
        },
    }
}

/// Scan one source file's text for forbidden imports, dynamic code
/// execution, undeclared tool use, and raw environment access.
#[must_use]
pub fn check_source_file(
    runtime: Runtime,
    file_path: &Path,
    text: &str,
    declared_tools: &HashSet<String>,
) -> Vec<Diagnostic> {
    let file = file_path.display().to_string();
    let patterns = patterns_for(runtime);
    let mut diagnostics = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let line_number = u32::try_from(line_no).unwrap_or(u32::MAX).saturating_add(1);

        for (name, pattern) in &patterns.forbidden_imports {
            if pattern.is_match(line) {
                diagnostics.push(
                    Diagnostic::error(
                        "forbidden-import",
                        format!("import of '{name}' is not permitted in trik source"),
                        &file,
                    )
                    .at(line_number, 0),
                );
            }
        }

        if patterns.dynamic_eval.is_match(line) {
            diagnostics.push(
                Diagnostic::error(
                    "dynamic-code-execution",
                    "dynamic code execution (eval/Function/exec) is not permitted",
                    &file,
                )
                .at(line_number, 0),
            );
        }

        if patterns.env_access.is_match(line) {
            diagnostics.push(
                Diagnostic::info(
                    "direct-env-access",
                    "direct environment-variable access bypasses the declared config surface",
                    &file,
                )
                .at(line_number, 0),
            );
        }
    }

    diagnostics.extend(check_undeclared_tool_use(&file, text, declared_tools));
    diagnostics
}

/// Tool calls are expected to look like `callTool("scope/name:action", ...)`
/// (or the `call_tool` snake_case spelling for Python triks).
fn check_undeclared_tool_use(file: &str, text: &str, declared_tools: &HashSet<String>) -> Vec<Diagnostic> {
    let call_re = Regex::new(r#"call_?[Tt]ool\(\s*['"]([^'"]+)['"]"#).unwrap();
    let mut diagnostics = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        for capture in call_re.captures_iter(line) {
            let tool = &capture[1];
            if !declared_tools.contains(tool) {
                diagnostics.push(
                    Diagnostic::warning(
                        "undeclared-tool-use",
                        format!("call to tool '{tool}' not declared in capabilities.tools"),
                        file,
                    )
                    .at(u32::try_from(line_no).unwrap_or(u32::MAX).saturating_add(1), 0),
                );
            }
        }
    }
    diagnostics
}

//! A small, purpose-built JSON Schema subset evaluator.
//!
//! Spec §9 deliberately scopes this down: `object`/`properties`/
//! `required`/`items`/`type`/`enum`/`const`/`pattern`/`format`/
//! `maxLength`/`minimum`/`$defs`/local `$ref`. This is enough to
//! validate both `inputSchema`/`userContentSchema` (used to validate
//! caller/skill payloads) and to walk `agentDataSchema` for the
//! agent-visible-constraint and placeholder-closure checks in
//! [`crate::validate`].

use regex::Regex;
use serde_json::Value;

/// The closed safe-list of `format` values allowed on an agent-visible
/// string leaf.
pub const SAFE_STRING_FORMATS: &[&str] = &[
    "id", "date", "date-time", "time", "uuid", "email", "uri", "url",
];

/// Resolve a local `$ref` (`#/$defs/Name`) against the schema root.
fn resolve_ref<'a>(root: &'a Value, ref_path: &str) -> Option<&'a Value> {
    let rest = ref_path.strip_prefix("#/")?;
    let mut node = root;
    for segment in rest.split('/') {
        node = node.as_object()?.get(segment)?;
    }
    Some(node)
}

/// Dereference `$ref` if present, otherwise return the node as-is.
fn deref<'a>(root: &'a Value, node: &'a Value) -> &'a Value {
    if let Some(r) = node.get("$ref").and_then(Value::as_str) {
        resolve_ref(root, r).unwrap_or(node)
    } else {
        node
    }
}

/// Whether a schema node's `type` is (or includes) `"string"`.
#[must_use]
pub fn node_is_string_typed(node: &Value) -> bool {
    match node.get("type") {
        Some(Value::String(s)) => s == "string",
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some("string")),
        _ => false,
    }
}

/// The constrained-string predicate: a string-typed node must fix its
/// value via a non-empty `enum`, a `const`, a `pattern`, or a safe-listed
/// `format`.
#[must_use]
pub fn is_constrained_string(node: &Value) -> bool {
    if let Some(Value::Array(values)) = node.get("enum") {
        if !values.is_empty() {
            return true;
        }
    }
    if node.get("const").is_some() {
        return true;
    }
    if node.get("pattern").and_then(Value::as_str).is_some() {
        return true;
    }
    if let Some(fmt) = node.get("format").and_then(Value::as_str) {
        if SAFE_STRING_FORMATS.contains(&fmt) {
            return true;
        }
    }
    false
}

/// Validate a JSON value against a schema node (the subset above).
///
/// Returns `Ok(())` or a human-readable message describing the first
/// mismatch found at `path`.
pub fn validate_value(root: &Value, node: &Value, value: &Value, path: &str) -> Result<(), String> {
    let node = deref(root, node);

    if let Some(constv) = node.get("const") {
        if value != constv {
            return Err(format!("{path}: expected const {constv}, got {value}"));
        }
    }

    if let Some(Value::Array(allowed)) = node.get("enum") {
        if !allowed.contains(value) {
            return Err(format!("{path}: value {value} not in enum {allowed:?}"));
        }
    }

    match node.get("type").and_then(Value::as_str) {
        Some("object") => validate_object(root, node, value, path)?,
        Some("array") => validate_array(root, node, value, path)?,
        Some("string") => validate_string(node, value, path)?,
        Some("integer") => {
            if !value.is_i64() && !value.is_u64() {
                return Err(format!("{path}: expected integer, got {value}"));
            }
        },
        Some("number") => {
            if !value.is_number() {
                return Err(format!("{path}: expected number, got {value}"));
            }
            validate_minimum(node, value, path)?;
        },
        Some("boolean") => {
            if !value.is_boolean() {
                return Err(format!("{path}: expected boolean, got {value}"));
            }
        },
        Some(other) => return Err(format!("{path}: unsupported schema type '{other}'")),
        None => {},
    }

    Ok(())
}

fn validate_minimum(node: &Value, value: &Value, path: &str) -> Result<(), String> {
    if let Some(min) = node.get("minimum").and_then(Value::as_f64) {
        if let Some(v) = value.as_f64() {
            if v < min {
                return Err(format!("{path}: {v} is below minimum {min}"));
            }
        }
    }
    Ok(())
}

fn validate_string(node: &Value, value: &Value, path: &str) -> Result<(), String> {
    let s = value
        .as_str()
        .ok_or_else(|| format!("{path}: expected string, got {value}"))?;

    if let Some(max_len) = node.get("maxLength").and_then(Value::as_u64) {
        if s.chars().count() as u64 > max_len {
            return Err(format!("{path}: string exceeds maxLength {max_len}"));
        }
    }
    if let Some(pattern) = node.get("pattern").and_then(Value::as_str) {
        let re = Regex::new(pattern).map_err(|e| format!("{path}: invalid pattern '{pattern}': {e}"))?;
        if !re.is_match(s) {
            return Err(format!("{path}: '{s}' does not match pattern '{pattern}'"));
        }
    }
    if let Some(format) = node.get("format").and_then(Value::as_str) {
        validate_format(format, s, path)?;
    }
    Ok(())
}

fn validate_format(format: &str, s: &str, path: &str) -> Result<(), String> {
    let ok = match format {
        "uuid" => uuid::Uuid::parse_str(s).is_ok(),
        "email" => s.contains('@') && !s.starts_with('@') && !s.ends_with('@'),
        "uri" | "url" => s.contains("://"),
        "date" => Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap().is_match(s),
        "date-time" => chrono::DateTime::parse_from_rfc3339(s).is_ok(),
        "time" => Regex::new(r"^\d{2}:\d{2}:\d{2}").unwrap().is_match(s),
        "id" => !s.is_empty(),
        _ => true,
    };
    if ok {
        Ok(())
    } else {
        Err(format!("{path}: '{s}' does not satisfy format '{format}'"))
    }
}

fn validate_object(root: &Value, node: &Value, value: &Value, path: &str) -> Result<(), String> {
    let obj = value
        .as_object()
        .ok_or_else(|| format!("{path}: expected object, got {value}"))?;

    if let Some(Value::Array(required)) = node.get("required") {
        for req in required {
            if let Some(key) = req.as_str() {
                if !obj.contains_key(key) {
                    return Err(format!("{path}: missing required property '{key}'"));
                }
            }
        }
    }

    if let Some(Value::Object(props)) = node.get("properties") {
        for (key, prop_schema) in props {
            if let Some(v) = obj.get(key) {
                validate_value(root, prop_schema, v, &format!("{path}.{key}"))?;
            }
        }
    }

    Ok(())
}

fn validate_array(root: &Value, node: &Value, value: &Value, path: &str) -> Result<(), String> {
    let items = value
        .as_array()
        .ok_or_else(|| format!("{path}: expected array, got {value}"))?;

    if let Some(item_schema) = node.get("items") {
        for (i, item) in items.iter().enumerate() {
            validate_value(root, item_schema, item, &format!("{path}[{i}]"))?;
        }
    }

    Ok(())
}

/// Walk every node reachable from `properties`/`items`/`$defs`, calling
/// `visit(node, path)` for each. Used by the constrained-string check
/// and the placeholder-closure check (the latter only needs
/// `properties` at the root, but shares the walker for symmetry).
pub fn walk_schema<'a>(root: &'a Value, node: &'a Value, path: &str, visit: &mut dyn FnMut(&'a Value, &str)) {
    let node = deref(root, node);
    visit(node, path);

    if let Some(Value::Object(props)) = node.get("properties") {
        for (key, child) in props {
            walk_schema(root, child, &format!("{path}.properties.{key}"), visit);
        }
    }
    if let Some(items) = node.get("items") {
        walk_schema(root, items, &format!("{path}.items"), visit);
    }
}

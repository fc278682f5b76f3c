//! `${env:VAR}` / `${VAR}` / `${VAR:-default}` expansion for config values.

use std::borrow::Cow;

/// Expand `${env:VAR}`, `${VAR}` and `${VAR:-default}` references in `value`
/// against the process environment.
///
/// `${VAR}` and `${env:VAR}` are equivalent; an unset variable with no
/// `:-default` fallback expands to an empty string. Malformed (unterminated)
/// placeholders are left verbatim.
#[must_use]
pub fn expand(value: &str) -> Cow<'_, str> {
    if !value.contains("${") {
        return Cow::Borrowed(value);
    }

    let mut out = String::with_capacity(value.len());
    let bytes = value.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' && value[i..].starts_with("${") {
            if let Some(end) = value[i..].find('}') {
                let inner = &value[i + 2..i + end];
                out.push_str(&resolve_placeholder(inner));
                i += end + 1;
                continue;
            }
        }
        let ch_len = value[i..].chars().next().map_or(1, char::len_utf8);
        out.push_str(&value[i..i + ch_len]);
        i += ch_len;
    }
    Cow::Owned(out)
}

fn resolve_placeholder(inner: &str) -> String {
    let inner = inner.strip_prefix("env:").unwrap_or(inner);
    let (name, default) = match inner.split_once(":-") {
        Some((name, default)) => (name, Some(default)),
        None => (inner, None),
    };
    std::env::var(name)
        .ok()
        .or_else(|| default.map(str::to_string))
        .unwrap_or_default()
}

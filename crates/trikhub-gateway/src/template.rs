//! Template selection and `{{name}}` placeholder substitution (spec §4.7).

use std::borrow::Cow;
use std::collections::HashMap;

use serde_json::Value;

use trikhub_core::{GatewayError, GatewayResult};
use trikhub_manifest::ResponseTemplate;

/// Pick the template a skill's output selects, by convention:
/// its own `template` field, else `success`, else the lone entry, else
/// an error.
pub fn select_template<'a>(
    requested: Option<&str>,
    templates: &'a HashMap<String, ResponseTemplate>,
) -> GatewayResult<&'a ResponseTemplate> {
    if let Some(name) = requested {
        return templates
            .get(name)
            .ok_or_else(|| GatewayError::SchemaValidationFailed(format!("unknown response template '{name}'")));
    }
    if let Some(template) = templates.get("success") {
        return Ok(template);
    }
    if templates.len() == 1 {
        return Ok(templates.values().next().expect("len == 1"));
    }
    Err(GatewayError::SchemaValidationFailed(
        "cannot select a response template: no 'template' field, no 'success' entry, and more than one template is declared".into(),
    ))
}

/// Replace every `{{name}}` in `text` with `agent_data[name]` stringified.
/// A placeholder whose name is absent from `agent_data` is left literal
/// (spec §4.7; manifest validation already rejects any placeholder that
/// names no declared schema property, so this only fires for a field
/// that is legitimately absent at runtime, e.g. an optional one).
#[must_use]
pub fn render<'a>(text: &'a str, agent_data: &Value) -> Cow<'a, str> {
    if !text.contains("{{") {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let name = after[..end].trim();
                match agent_data.get(name) {
                    Some(value) => out.push_str(&stringify(value)),
                    None => {
                        out.push_str("{{");
                        out.push_str(&after[..end]);
                        out.push_str("}}");
                    },
                }
                rest = &after[end + 2..];
            },
            None => {
                out.push_str("{{");
                rest = after;
                break;
            },
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn templates(entries: &[(&str, &str)]) -> HashMap<String, ResponseTemplate> {
        entries
            .iter()
            .map(|(id, text)| (id.to_string(), ResponseTemplate { text: text.to_string() }))
            .collect()
    }

    #[test]
    fn selects_by_name_then_success_then_lone_entry() {
        let t = templates(&[("success", "ok"), ("empty", "none")]);
        assert_eq!(select_template(Some("empty"), &t).unwrap().text, "none");
        assert_eq!(select_template(None, &t).unwrap().text, "ok");

        let single = templates(&[("only", "just this one")]);
        assert_eq!(select_template(None, &single).unwrap().text, "just this one");
    }

    #[test]
    fn ambiguous_selection_without_success_or_name_is_an_error() {
        let t = templates(&[("a", "x"), ("b", "y")]);
        assert!(select_template(None, &t).is_err());
    }

    #[test]
    fn renders_known_placeholders_and_leaves_unknown_ones_literal() {
        let data = json!({"count": 3, "template": "success"});
        assert_eq!(render("Found {{count}} results.", &data), "Found 3 results.");
        assert_eq!(render("{{missing}} stays put", &data), "{{missing}} stays put");
    }
}

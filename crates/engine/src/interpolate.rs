//! Placeholder substitution for step parameter templates.
//!
//! A parameter value is a placeholder when the whole string is wrapped in
//! double braces, e.g. `"{{project_name}}"`. Substitution is best effort: a
//! missing (or null) variable leaves the literal template value in place.
//! Only top-level string values are inspected and substituted values are never
//! interpolated again.

use serde_json::{Map, Value};

/// Resolve placeholders in `template` against `variables`.
///
/// # Example
/// ```rust
/// use devdeck_engine::interpolate::interpolate;
/// use serde_json::{json, Map, Value};
///
/// let template = json!({"name": "{{ project_name }}", "owner": "{{owner}}", "private": false});
/// let variables = json!({"project_name": "demo"});
/// let resolved = interpolate(template.as_object().unwrap(), variables.as_object().unwrap());
/// assert_eq!(resolved["name"], "demo");
/// assert_eq!(resolved["owner"], "{{owner}}");
/// assert_eq!(resolved["private"], false);
/// ```
pub fn interpolate(template: &Map<String, Value>, variables: &Map<String, Value>) -> Map<String, Value> {
    template
        .iter()
        .map(|(key, value)| (key.clone(), resolve_value(value, variables)))
        .collect()
}

fn resolve_value(value: &Value, variables: &Map<String, Value>) -> Value {
    let Value::String(text) = value else {
        return value.clone();
    };
    match placeholder_name(text).and_then(|name| variables.get(name)) {
        Some(Value::Null) | None => value.clone(),
        Some(bound) => bound.clone(),
    }
}

/// Variable name referenced by a `{{ name }}` placeholder.
pub fn placeholder_name(text: &str) -> Option<&str> {
    let inner = text.strip_prefix("{{")?.strip_suffix("}}")?.trim();
    (!inner.is_empty()).then_some(inner)
}

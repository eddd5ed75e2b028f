//! Best-effort `{{path.to.value}}` templating over semi-structured parameters.
//!
//! Lookups never fail: a missing key, an out-of-range index, or an unsupported accessor all
//! degrade to the default value. Callers that need strict validation must check parameter
//! shapes themselves.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Number, Value};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([\w.]+)\}\}").expect("placeholder pattern"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

/// Template parameters supplied per render call.
pub type Parameters = Map<String, Value>;

/// Substitutes every placeholder in `text`, using an empty string for unresolved paths.
///
/// ```
/// use chatwire_core::resolve;
/// use serde_json::json;
///
/// let params = json!({"user": {"orders": [{"id": "A"}, {"id": "B"}]}});
/// let text = "{{user.orders.count}} orders, first {{user.orders.first.id}}";
/// assert_eq!(resolve(params.as_object().unwrap(), text), "2 orders, first A");
/// assert_eq!(resolve(&Default::default(), "Hello {{name}}!"), "Hello !");
/// ```
pub fn resolve(parameters: &Parameters, text: &str) -> String {
    resolve_with_default(parameters, text, "")
}

/// Same as [`resolve`] with a caller-chosen default for unresolved placeholders.
pub fn resolve_with_default(parameters: &Parameters, text: &str, default: &str) -> String {
    let substituted = PLACEHOLDER.replace_all(text, |caps: &Captures<'_>| {
        let path = &caps[1];
        let mut segments = path.split('.');
        let root = segments.next().and_then(|key| parameters.get(key));
        match root {
            Some(value) => match walk(value, segments) {
                Some(found) => format_value(&found, default),
                None => default.to_string(),
            },
            None => default.to_string(),
        }
    });
    WHITESPACE
        .replace_all(substituted.trim(), " ")
        .into_owned()
}

fn walk<'a>(root: &Value, segments: impl Iterator<Item = &'a str>) -> Option<Value> {
    let mut current = root.clone();
    for segment in segments {
        current = step(current, segment)?;
    }
    Some(current)
}

fn step(current: Value, segment: &str) -> Option<Value> {
    match current {
        Value::Object(mut map) => map.remove(segment),
        Value::Array(items) => step_sequence(items, segment),
        Value::String(text) => match segment {
            "lower" => Some(Value::String(text.to_lowercase())),
            "upper" => Some(Value::String(text.to_uppercase())),
            _ => None,
        },
        _ => None,
    }
}

fn step_sequence(mut items: Vec<Value>, segment: &str) -> Option<Value> {
    match segment {
        "count" => return Some(Value::from(items.len())),
        "sum" => return sum(&items),
        _ => {}
    }
    if items.is_empty() {
        return None;
    }
    let index = match segment {
        "first" => 0,
        "last" => items.len() - 1,
        digits if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
            digits.parse::<usize>().ok()?
        }
        _ => return None,
    };
    if index < items.len() {
        Some(items.swap_remove(index))
    } else {
        None
    }
}

fn sum(items: &[Value]) -> Option<Value> {
    if items.iter().all(|item| item.is_i64()) {
        let mut total: i64 = 0;
        for item in items {
            total = total.checked_add(item.as_i64()?)?;
        }
        return Some(Value::from(total));
    }
    let mut total = 0.0;
    for item in items {
        total += item.as_f64()?;
    }
    Number::from_f64(total).map(Value::Number)
}

fn format_value(value: &Value, default: &str) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Array(items) => match items.first() {
            Some(Value::String(text)) => text.clone(),
            Some(first) => first.to_string(),
            None => default.to_string(),
        },
        Value::Object(_) | Value::Null => default.to_string(),
        Value::Bool(flag) => flag.to_string(),
    }
}

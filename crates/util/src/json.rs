//! JSON helpers: payload coercion, nested lookup and diagnostic printing.

use std::borrow::Cow;
use std::fmt;

use serde_json::{Map, Value};
use tracing::Span;

use crate::error::NotJsonContainer;
use crate::logging::component_span;

/// Default character limit for [`pretty_print`].
pub const DEFAULT_PRINT_LIMIT: usize = 200;

/// A payload that is either raw JSON text or an already parsed value.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonInput {
    Text(String),
    Structured(Value),
}

impl From<&str> for JsonInput {
    fn from(text: &str) -> Self {
        JsonInput::Text(text.to_string())
    }
}

impl From<String> for JsonInput {
    fn from(text: String) -> Self {
        JsonInput::Text(text)
    }
}

impl From<Value> for JsonInput {
    /// A JSON string is treated as text to be parsed, not as a scalar.
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => JsonInput::Text(text),
            other => JsonInput::Structured(other),
        }
    }
}

/// Parses a payload into a JSON object or array.
///
/// Structured input is serialized and parsed again so both kinds of input
/// take the same path. A top-level scalar, `null` included, is rejected.
///
/// # Errors
///
/// Returns [`NotJsonContainer`] carrying the input text if it does not parse
/// or parses to a scalar.
///
/// # Examples
///
/// ```
/// use apifuzzer_util::json_data;
/// use serde_json::json;
///
/// assert_eq!(json_data(r#"{"a": 1}"#).unwrap(), json!({"a": 1}));
/// assert_eq!(json_data(json!([1, 2])).unwrap(), json!([1, 2]));
/// assert!(json_data("5").is_err());
/// assert!(json_data("null").is_err());
/// ```
pub fn json_data(input: impl Into<JsonInput>) -> Result<Value, NotJsonContainer> {
    let text = match input.into() {
        JsonInput::Text(text) => text,
        JsonInput::Structured(value) => value.to_string(),
    };
    match serde_json::from_str::<Value>(&text) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => Ok(value),
        _ => {
            tracing::debug!("rejected payload: {}", text.replace(' ', "_"));
            Err(NotJsonContainer { input: text })
        }
    }
}

/// [`json_data`] running inside an injected logging span.
#[derive(Debug, Clone)]
pub struct JsonCoercer {
    span: Span,
}

impl Default for JsonCoercer {
    fn default() -> Self {
        Self::new(component_span("JsonCoercer"))
    }
}

impl JsonCoercer {
    pub fn new(span: Span) -> Self {
        Self { span }
    }

    pub fn coerce(&self, input: impl Into<JsonInput>) -> Result<Value, NotJsonContainer> {
        let _entered = self.span.enter();
        json_data(input)
    }
}

/// Walks `path` through nested objects.
///
/// Never fails: once a key is missing, or a step lands on something that is
/// not an object, the rest of the walk continues against `{}`, so the result
/// is an empty object.
///
/// # Examples
///
/// ```
/// use apifuzzer_util::get_item;
/// use serde_json::json;
///
/// let doc = json!({"paths": {"/pets": {"get": 1}}});
/// assert_eq!(*get_item(&doc, &["paths", "/pets", "get"]), json!(1));
/// assert_eq!(*get_item(&doc, &["definitions", "Pet"]), json!({}));
/// ```
pub fn get_item<'a, S: AsRef<str>>(json: &'a Value, path: &[S]) -> Cow<'a, Value> {
    let mut current = json;
    for key in path {
        match current.as_object().and_then(|map| map.get(key.as_ref())) {
            Some(next) => current = next,
            None => return Cow::Owned(Value::Object(Map::new())),
        }
    }
    Cow::Borrowed(current)
}

/// Result of [`pretty_print`].
#[derive(Debug, Clone, PartialEq)]
pub enum Printable<'a> {
    /// Indented, key-sorted and possibly truncated object text.
    Text(String),
    /// A non-object value, returned as given.
    Unchanged(&'a Value),
}

impl Printable<'_> {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Printable::Text(text) => Some(text.as_str()),
            Printable::Unchanged(_) => None,
        }
    }
}

impl fmt::Display for Printable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Printable::Text(text) => f.write_str(text),
            Printable::Unchanged(value) => write!(f, "{value}"),
        }
    }
}

/// Renders an object as 2-space indented JSON with sorted keys, cut to the
/// first `limit` characters. The cut may leave invalid JSON.
///
/// Non-ASCII characters are written as `\uXXXX` escapes (UTF-16 units)
/// before cutting, so the window is pure ASCII.
///
/// Anything other than an object is returned unchanged.
///
/// # Examples
///
/// ```
/// use apifuzzer_util::{pretty_print, Printable, DEFAULT_PRINT_LIMIT};
/// use serde_json::json;
///
/// let doc = json!({"z": 1, "a": 2});
/// assert_eq!(pretty_print(&doc, DEFAULT_PRINT_LIMIT).to_string(), "{\n  \"a\": 2,\n  \"z\": 1\n}");
/// assert_eq!(pretty_print(&doc, 5).as_text(), Some("{\n  \""));
///
/// let list = json!([1]);
/// assert_eq!(pretty_print(&list, 1), Printable::Unchanged(&list));
/// ```
pub fn pretty_print(printable: &Value, limit: usize) -> Printable<'_> {
    match printable {
        Value::Object(_) => {
            let text = escape_non_ascii(&format!("{:#}", sort_keys(printable)));
            Printable::Text(text.chars().take(limit).collect())
        }
        other => Printable::Unchanged(other),
    }
}

// Non-ASCII only occurs inside string literals, where `\uXXXX` is valid.
fn escape_non_ascii(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    out
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, val)| (key.clone(), sort_keys(val)))
                    .collect(),
            )
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

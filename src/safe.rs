//! Coercion of loosely-typed input into strings that are safe to draw.
//!
//! Form data arrives as JSON produced by many different forms, so any field may
//! hold a string, a number, a boolean, `null`, an array or an object. Every value
//! that reaches a drawing call goes through [to_safe_string] first.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Convert any JSON value into a string. Never fails:
///
/// - `null` becomes `""`
/// - strings are returned as-is
/// - numbers and booleans use their display form
/// - arrays are joined with `,`
/// - objects are serialised as compact JSON
pub fn to_safe_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(to_safe_string)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// [to_safe_string], logging a warning when the value wasn't already a string
/// (or an array, which the drawing layer used to accept). `context` names where
/// the value was headed.
pub fn to_safe_string_logged(value: &Value, context: &str) -> String {
    if !matches!(value, Value::String(_) | Value::Array(_) | Value::Null) {
        tracing::warn!(
            context,
            kind = value_kind(value),
            value = %value,
            "coerced a non-string value before drawing"
        );
    }
    to_safe_string(value)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A string field of the form data. Deserialises from any JSON value through
/// [to_safe_string], and from a missing field as `""`.
#[derive(
    Debug,
    Default,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    derive_more::Deref,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
pub struct Text(pub String);

impl Text {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The trimmed value, or `default` when it's blank
    pub fn or<'a>(&'a self, default: &'a str) -> &'a str {
        let trimmed = self.0.trim();
        if trimmed.is_empty() {
            default
        } else {
            trimmed
        }
    }

    /// Whether the value has anything but whitespace in it
    pub fn is_present(&self) -> bool {
        !self.0.trim().is_empty()
    }
}

impl From<&str> for Text {
    fn from(s: &str) -> Self {
        Text(s.to_string())
    }
}

impl<'de> Deserialize<'de> for Text {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Text(to_safe_string(&value)))
    }
}

/// A yes/no field of the form data. Accepts booleans, `"yes"`/`"no"`,
/// `"true"`/`"false"`, `"y"`/`"n"`, `1`/`0` and their string forms; anything else
/// (including a missing field) is `false`.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, derive_more::Deref)]
#[serde(transparent)]
pub struct Flag(pub bool);

impl<'de> Deserialize<'de> for Flag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Flag(truthy(&value)))
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.0 { "Yes" } else { "No" })
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "yes" | "y" | "true" | "1" | "on" | "checked"
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerces_every_kind_of_value() {
        assert_eq!(to_safe_string(&Value::Null), "");
        assert_eq!(to_safe_string(&json!("Main Switch")), "Main Switch");
        assert_eq!(to_safe_string(&json!(0.5)), "0.5");
        assert_eq!(to_safe_string(&json!(32)), "32");
        assert_eq!(to_safe_string(&json!(true)), "true");
        assert_eq!(to_safe_string(&json!(["a", 1, null])), "a,1,");
        assert_eq!(to_safe_string(&json!({"a": 1})), r#"{"a":1}"#);
        assert_eq!(to_safe_string_logged(&json!(false), "test"), "false");
    }

    #[derive(Deserialize, Default)]
    #[serde(default)]
    struct Record {
        name: Text,
        rectified: Flag,
    }

    #[test]
    fn fields_are_lenient() {
        let record: Record =
            serde_json::from_value(json!({"name": 42, "rectified": "Yes"})).expect("parses");
        assert_eq!(record.name.as_str(), "42");
        assert!(*record.rectified);

        let record: Record =
            serde_json::from_value(json!({"name": null, "rectified": 0})).expect("parses");
        assert_eq!(record.name, Text::default());
        assert!(!*record.rectified);

        let record: Record = serde_json::from_value(json!({})).expect("parses");
        assert_eq!(record.name.or("Not specified"), "Not specified");
    }
}

//! Cleaning form data once, at the boundary, before anything is laid out.

use crate::model::FormData;
use crate::Result;
use serde_json::Value;

/// Strings longer than this are cut
pub const MAX_FIELD_CHARS: usize = 2000;

/// Clean a single string: control characters other than tab and newline are dropped,
/// as are `<` and `>`, then the result is trimmed and capped at [MAX_FIELD_CHARS].
/// Image data URIs are returned untouched.
pub fn sanitize_string(input: &str) -> String {
    if input.trim_start().starts_with("data:image/") {
        return input.to_string();
    }
    let cleaned: String = input
        .chars()
        .filter(|&c| c == '\t' || c == '\n' || !c.is_control())
        .filter(|&c| c != '<' && c != '>')
        .collect();
    cleaned.trim().chars().take(MAX_FIELD_CHARS).collect()
}

/// Clean every string in a JSON value, however deeply nested
pub fn sanitize_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_string(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_value).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, sanitize_value(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Clean every string field of the form, including those of nested records
pub fn sanitize_object(form: FormData) -> Result<FormData> {
    let value = serde_json::to_value(form)?;
    Ok(serde_json::from_value(sanitize_value(value))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DefectObservation;
    use crate::safe::Text;

    #[test]
    fn strips_markup_and_control_characters() {
        assert_eq!(
            sanitize_string("  <script>alert(1)</script>\u{0007} "),
            "scriptalert(1)/script"
        );
        assert_eq!(sanitize_string("line one\n\tline two"), "line one\n\tline two");
        assert_eq!(sanitize_string(&"x".repeat(2500)).len(), MAX_FIELD_CHARS);
    }

    #[test]
    fn leaves_image_payloads_alone() {
        let uri = "data:image/png;base64,iVBORw0KGgo=";
        assert_eq!(sanitize_string(uri), uri);
    }

    #[test]
    fn walks_nested_records_and_is_idempotent() {
        let form = FormData {
            client_name: Text::from(" <b>Jane Doe</b> "),
            defect_observations: vec![DefectObservation {
                description: Text::from("Exposed <live> conductor"),
                ..Default::default()
            }],
            ..Default::default()
        };
        let once = sanitize_object(form).expect("sanitises");
        assert_eq!(once.client_name.as_str(), "bJane Doe/b");
        assert_eq!(
            once.defect_observations[0].description.as_str(),
            "Exposed live conductor"
        );
        let twice = sanitize_object(once.clone()).expect("sanitises");
        assert_eq!(twice, once);
    }
}

//! Error details from failed responses.

use serde_json::Value;

/// Convert a dotted path (`error.code`) to a JSON pointer (`/error/code`).
pub(crate) fn to_pointer(path: &str) -> String {
  format!("/{}", path.replace('.', "/"))
}

/// Read the value at a dotted path from a response body.
///
/// An unset path, an absent or `null` value, an empty string, or a body that
/// is not JSON all yield `None`.
pub(crate) fn extract(body: Option<&Value>, path: Option<&str>) -> Option<String> {
  let value = body?.pointer(&to_pointer(path?))?;

  let text = match value {
    Value::Null => return None,
    Value::String(s) => s.clone(),
    other => other.to_string(),
  };

  (!text.is_empty()).then_some(text)
}

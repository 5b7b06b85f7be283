//! Placeholder expansion using minijinja templates.
//!
//! Task parameters (url, body, authorization, ...) may reference configuration
//! values. Two syntaxes are supported and always applied in this order:
//!
//! 1. `{{ key }}` rendered by minijinja against the overlay context. The trimmed
//!    text between the braces is a literal key, never an expression; dots reach
//!    into nested values (`{{ order.id }}`) unless the whole text is itself a
//!    key. Unknown keys render as an empty string. Everything outside the braces,
//!    including `{%` and `{#`, is copied unchanged.
//! 2. `${key}` replaced literally for every key present in the context. Unknown
//!    keys are left in place.
//!
//! The legacy pass runs on the output of the template pass, so a `${key}` produced
//! by a `{{ key }}` value is expanded as well.
//!
//! ```json
//! { "url": "https://api.local/orders/{{ orderId }}", "body": "{\"total\": ${total}}" }
//! ```

use minijinja::{Environment, UndefinedBehavior, Value};
use serde_json::Map;

/// Errors that can occur while expanding placeholders.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
  /// The template is not valid minijinja syntax.
  #[error("failed to render template: {message}")]
  Render { message: String },
}

/// Expands `{{ key }}` and `${key}` placeholders against a context map.
pub struct PlaceholderEngine {
  env: Environment<'static>,
}

/// Name the overlay is bound to inside compiled templates.
const OVERLAY: &str = "overlay";

impl PlaceholderEngine {
  pub fn new() -> Self {
    let mut env = Environment::new();
    // `{{ a.b }}` on a missing `a` renders empty instead of failing.
    env.set_undefined_behavior(UndefinedBehavior::Chainable);
    env.set_keep_trailing_newline(true);
    env.add_function("stringify", |value: Value| {
      serde_json::to_value(&value)
        .map(|value| stringify(&value))
        .unwrap_or_else(|_| value.to_string())
    });
    Self { env }
  }

  /// Expand an optional template. `None` stays `None`.
  pub fn expand(
    &self,
    template: Option<&str>,
    context: &Map<String, serde_json::Value>,
  ) -> Result<Option<String>, TemplateError> {
    template.map(|t| self.expand_str(t, context)).transpose()
  }

  /// Expand a template string.
  pub fn expand_str(
    &self,
    template: &str,
    context: &Map<String, serde_json::Value>,
  ) -> Result<String, TemplateError> {
    let rendered = self.render(template, context)?;
    Ok(replace_legacy(rendered, context))
  }

  fn render(
    &self,
    template: &str,
    context: &Map<String, serde_json::Value>,
  ) -> Result<String, TemplateError> {
    // Nothing to render, skip the parser.
    if !template.contains("{{") {
      return Ok(template.to_string());
    }

    self
      .env
      .render_str(
        &compile(template, context),
        minijinja::context! { overlay => Value::from_serialize(context) },
      )
      .map_err(|e| TemplateError::Render {
        message: e.to_string(),
      })
  }
}

/// Rewrite a placeholder template into minijinja source.
///
/// Each `{{ key }}` becomes a lookup on the overlay. Delimiters that minijinja
/// would otherwise interpret (`{%`, `{#`, an unclosed `{{`) are emitted as
/// string literals so they render verbatim.
fn compile(template: &str, context: &Map<String, serde_json::Value>) -> String {
  let mut out = String::with_capacity(template.len() + 32);
  let mut rest = template;

  while let Some(start) = rest.find('{') {
    out.push_str(&rest[..start]);
    let tail = &rest[start..];

    if let Some(after) = tail.strip_prefix("{{") {
      match after.find("}}") {
        Some(end) => {
          out.push_str(&lookup(after[..end].trim(), context));
          rest = &after[end + 2..];
        }
        None => {
          out.push_str(&literal("{{"));
          rest = after;
        }
      }
    } else if tail.starts_with("{%") || tail.starts_with("{#") {
      out.push_str(&literal(&tail[..2]));
      rest = &tail[2..];
    } else {
      out.push('{');
      rest = &tail[1..];
    }
  }

  out.push_str(rest);
  out
}

fn lookup(key: &str, context: &Map<String, serde_json::Value>) -> String {
  if key.is_empty() {
    return String::new();
  }

  let mut expr = String::from(OVERLAY);
  if context.contains_key(key) {
    expr.push_str(&format!("[{}]", quote(key)));
  } else {
    for segment in key.split('.') {
      match segment.parse::<usize>() {
        Ok(index) => expr.push_str(&format!("[{}]", index)),
        Err(_) => expr.push_str(&format!("[{}]", quote(segment))),
      }
    }
  }

  format!("{{{{ stringify({}) }}}}", expr)
}

fn literal(text: &str) -> String {
  format!("{{{{ {} }}}}", quote(text))
}

/// A minijinja string literal. JSON escaping is a subset minijinja understands.
fn quote(text: &str) -> String {
  serde_json::Value::String(text.to_string()).to_string()
}

impl Default for PlaceholderEngine {
  fn default() -> Self {
    Self::new()
  }
}

/// Replace `${key}` for every key in the context, in key order.
fn replace_legacy(mut output: String, context: &Map<String, serde_json::Value>) -> String {
  if !output.contains("${") {
    return output;
  }

  for (key, value) in context {
    let placeholder = format!("${{{}}}", key);
    if output.contains(&placeholder) {
      output = output.replace(&placeholder, &stringify(value));
    }
  }

  output
}

fn stringify(value: &serde_json::Value) -> String {
  match value {
    serde_json::Value::String(s) => s.clone(),
    serde_json::Value::Null => String::new(),
    other => other.to_string(),
  }
}

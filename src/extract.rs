//! Structured output extraction from agent responses
//!
//! Completion backends occasionally wrap valid JSON in prose or markdown
//! despite being asked not to. The extraction ladder always produces *a*
//! mapping: strict parse after fence stripping, then a greedy brace-span
//! recovery, then a `{raw, error}` fallback that downstream stages tolerate.

use serde_json::{Map, Value};
use tracing::warn;

/// A mapping extracted from raw response text, tagged by the recovery path
/// that produced it
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// Strict parse succeeded (after trimming and fence stripping)
    Parsed(Map<String, Value>),
    /// Strict parse failed, but the outermost brace span parsed as an object
    Recovered(Map<String, Value>),
    /// No recoverable JSON; contains exactly `raw` and `error`
    Fallback(Map<String, Value>),
}

impl Extraction {
    /// The extracted mapping, whichever path produced it
    pub fn as_map(&self) -> &Map<String, Value> {
        match self {
            Extraction::Parsed(map) | Extraction::Recovered(map) | Extraction::Fallback(map) => map,
        }
    }

    /// Consume into a JSON value (always an object)
    pub fn into_value(self) -> Value {
        match self {
            Extraction::Parsed(map) | Extraction::Recovered(map) | Extraction::Fallback(map) => {
                Value::Object(map)
            }
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Extraction::Fallback(_))
    }
}

/// Extract a JSON object from raw agent response text
///
/// Bare scalars and arrays are not accepted as stage output; they continue
/// down the ladder like any other parse failure.
pub fn extract_json(text: &str) -> Extraction {
    let stripped = strip_code_fences(text);

    let parse_error = match serde_json::from_str::<Value>(&stripped) {
        Ok(Value::Object(map)) => return Extraction::Parsed(map),
        Ok(other) => format!("expected a JSON object, got {}", type_name(&other)),
        Err(e) => e.to_string(),
    };

    warn!(error = %parse_error, "strict JSON parse failed, attempting recovery");

    // Greedy span: first '{' through the last '}' of the stripped text
    if let (Some(start), Some(end)) = (stripped.find('{'), stripped.rfind('}')) {
        if start < end {
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&stripped[start..=end]) {
                return Extraction::Recovered(map);
            }
        }
    }

    let mut fallback = Map::new();
    fallback.insert("raw".to_string(), Value::String(text.to_string()));
    fallback.insert("error".to_string(), Value::String(parse_error));
    Extraction::Fallback(fallback)
}

/// Strip a surrounding fenced code block, with or without a language tag
fn strip_code_fences(text: &str) -> String {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```") {
        // A language tag runs to the first newline; when the whole block sits
        // on one line, it runs to the first brace instead
        body = match rest.split_once('\n') {
            Some((_, after)) => after,
            None => match rest.find('{') {
                Some(start) => &rest[start..],
                None => rest,
            },
        };
    }
    let body = body.trim_end();
    let body = body.strip_suffix("```").unwrap_or(body);
    body.trim().to_string()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

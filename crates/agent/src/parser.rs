//! Parsing of the JSON blob the assistants are prompted to answer with:
//!
//! ```text
//! {"THOUGHT": "...", "ACTION": "tool_name", "ACTION_PARAMS": {...}}
//! {"THOUGHT": "...", "FINAL_ANSWER": "..."}
//! ```
//!
//! Models wrap the blob in markdown fences, add prose around it, return a
//! one-element list or encode `ACTION_PARAMS` as a string. All of that is
//! tolerated here; anything else is a [`ParseError`] and triggers a corrective
//! retry in the assistant loop.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

const FENCE_PATTERN: &str = r"```(?:json|JSON)?\s*([\s\S]*?)```";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("output does not contain a json value")]
    NotJson,
    #[error("json output is not an object")]
    NotAnObject,
    #[error("ACTION_PARAMS is not valid json: {0}")]
    InvalidParams(String),
}

/// Exactly one of `action` and `final_answer` drives the next step; when the
/// model fills in both, the final answer wins.
#[derive(Clone, Debug, PartialEq)]
pub struct StructuredResponse {
    pub thought: Option<String>,
    pub action: Option<String>,
    pub params: Value,
    pub final_answer: Option<String>,
}

impl StructuredResponse {
    /// The tool to call, if this response is a tool request.
    pub fn requested_action(&self) -> Option<&str> {
        match (&self.action, &self.final_answer) {
            (Some(action), None) => Some(action.as_str()),
            _ => None,
        }
    }
}

fn fence_regex() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(FENCE_PATTERN).ok()).as_ref()
}

/// Finds the first JSON value in `raw`.
pub fn extract_json(raw: &str) -> Option<Value> {
    let fenced = fence_regex()
        .and_then(|fence| fence.captures(raw))
        .and_then(|captures| captures.get(1))
        .map(|body| body.as_str());

    for candidate in fenced.into_iter().chain(std::iter::once(raw)) {
        let trimmed = candidate.trim();
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            if value.is_object() || value.is_array() {
                return Some(value);
            }
        }
        if let Some(value) = outermost_span(trimmed) {
            return Some(value);
        }
    }
    None
}

fn outermost_span(text: &str) -> Option<Value> {
    let start = text.find(|c: char| c == '{' || c == '[')?;
    let closing = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(closing)?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

pub fn parse_response(raw: &str) -> Result<StructuredResponse, ParseError> {
    let value = extract_json(raw).ok_or(ParseError::NotJson)?;
    let value = match value {
        Value::Array(items) => items.into_iter().next().ok_or(ParseError::NotAnObject)?,
        other => other,
    };
    let Value::Object(object) = value else {
        return Err(ParseError::NotAnObject);
    };

    let thought = text_field(&object, "THOUGHT");
    let action = text_field(&object, "ACTION")
        .map(|action| action.replace(' ', ""))
        .filter(|action| !action.is_empty());
    let params = match object.get("ACTION_PARAMS") {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(Value::String(encoded)) if encoded.trim().is_empty() => Value::Object(Map::new()),
        Some(Value::String(encoded)) => serde_json::from_str(encoded)
            .map_err(|error| ParseError::InvalidParams(error.to_string()))?,
        Some(other) => other.clone(),
    };
    let final_answer = text_field(&object, "FINAL_ANSWER");

    Ok(StructuredResponse { thought, action, params, final_answer })
}

fn text_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::Null => None,
        Value::String(text) if text.trim().is_empty() => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

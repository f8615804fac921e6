//! Response extraction — decides whether a model reply asks for tools or
//! answers the user.
//!
//! Models that only speak text are asked to reply with a JSON blob when they
//! want a tool. In practice the blob arrives bare, wrapped in a fenced code
//! block, in single backticks, or in one of several legacy shapes, and plain
//! prose answers arrive with or without the final-answer marker. Strategies
//! are tried in order:
//!
//! 1. **Marker**: the text after the first (case-insensitive) occurrence of
//!    the final-answer marker is the answer, whatever else the reply holds.
//! 2. **Direct JSON**: the whole reply parses as a tool-call object.
//! 3. **Delimited regions**: triple-backtick blocks, then single-backtick
//!    spans, each tried as direct JSON.
//! 4. **Fallback**: the reply is returned as [`Extraction::Unparsed`].
//!
//! Extraction never fails and never consults the tool registry.

use regex::Regex;
use serde_json::{Map, Value};
use vaultmind_core::tool::ToolInvocation;

/// Marker used when none is configured.
pub const DEFAULT_FINAL_ANSWER_MARKER: &str = "final answer:";

/// What a model reply turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// One or more tool calls, in the order the model listed them.
    ToolCall(Vec<ToolInvocation>),
    /// The text after the final-answer marker, trimmed.
    FinalAnswer(String),
    /// Nothing structured; the raw reply.
    Unparsed(String),
}

#[derive(Debug, Clone)]
pub struct ResponseExtractor {
    marker: String,
    pattern: Option<Regex>,
}

impl Default for ResponseExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_FINAL_ANSWER_MARKER)
    }
}

impl ResponseExtractor {
    /// An empty marker disables the marker strategy.
    pub fn new(marker: impl Into<String>) -> Self {
        let marker = marker.into();
        let pattern = if marker.trim().is_empty() {
            None
        } else {
            Regex::new(&format!("(?i){}", regex::escape(&marker))).ok()
        };
        Self { marker, pattern }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn extract(&self, text: &str) -> Extraction {
        if let Some(pattern) = &self.pattern
            && let Some(found) = pattern.find(text)
        {
            return Extraction::FinalAnswer(text[found.end()..].trim().to_string());
        }

        if let Some(calls) = parse_tool_calls(text) {
            return Extraction::ToolCall(calls);
        }

        for region in delimited_regions(text) {
            if let Some(calls) = parse_tool_calls(&region) {
                return Extraction::ToolCall(calls);
            }
        }

        Extraction::Unparsed(text.to_string())
    }

    /// Remove every occurrence of the marker and trim.
    pub fn strip_marker(&self, text: &str) -> String {
        match &self.pattern {
            Some(pattern) => pattern.replace_all(text, "").trim().to_string(),
            None => text.trim().to_string(),
        }
    }
}

/// Parse `text` as a tool-call object.
///
/// Accepted shapes:
/// - `{"tool_calls": [{"name", "arguments" | "input"}, ...]}` (a single
///   object in place of the array is also accepted)
/// - `{"tool": name, "tool_input": args}`
/// - `{"name": name, "arguments" | "input": args}`
///
/// Entries may also use the `{"function": {"name", "arguments"}}` wrapping.
pub fn parse_tool_calls(text: &str) -> Option<Vec<ToolInvocation>> {
    let value: Value = serde_json::from_str(text.trim()).ok()?;
    let object = value.as_object()?;

    if let Some(calls) = object.get("tool_calls") {
        let entries: Vec<&Value> = match calls {
            Value::Array(items) => items.iter().collect(),
            Value::Object(_) => vec![calls],
            _ => return None,
        };
        let invocations: Vec<ToolInvocation> =
            entries.into_iter().filter_map(invocation_from).collect();
        return (!invocations.is_empty()).then_some(invocations);
    }

    if let Some(name) = object.get("tool").and_then(Value::as_str) {
        let arguments = object.get("tool_input").cloned().unwrap_or(Value::Null);
        return Some(vec![ToolInvocation::new(name, normalize_arguments(arguments))]);
    }

    if object.contains_key("arguments") || object.contains_key("input") {
        return invocation_from(&value).map(|call| vec![call]);
    }

    None
}

fn invocation_from(entry: &Value) -> Option<ToolInvocation> {
    let entry = match entry.get("function") {
        Some(function) if function.is_object() => function,
        _ => entry,
    };
    let name = entry.get("name")?.as_str()?.trim();
    if name.is_empty() {
        return None;
    }

    // `arguments` and `input` are aliases; whichever is present is used.
    let arguments = entry
        .get("arguments")
        .or_else(|| entry.get("input"))
        .cloned()
        .unwrap_or(Value::Null);

    Some(ToolInvocation::new(name, normalize_arguments(arguments)))
}

/// Decode JSON-in-a-string arguments; missing arguments become `{}`.
fn normalize_arguments(arguments: Value) -> Value {
    match arguments {
        Value::Null => Value::Object(Map::new()),
        Value::String(raw) => match serde_json::from_str::<Value>(&raw) {
            Ok(decoded @ Value::Object(_)) => decoded,
            _ => Value::String(raw),
        },
        other => other,
    }
}

/// Contents of triple-backtick blocks and single-backtick spans, in order of
/// appearance. An unclosed fence is skipped.
fn delimited_regions(text: &str) -> Vec<String> {
    let mut regions = Vec::new();
    let mut cursor = 0;

    while let Some(offset) = text[cursor..].find('`') {
        let open = cursor + offset;
        if text[open..].starts_with("```") {
            let body_start = open + 3;
            match text[body_start..].find("```") {
                Some(close) => {
                    let body = &text[body_start..body_start + close];
                    regions.push(strip_language_tag(body).to_string());
                    cursor = body_start + close + 3;
                }
                None => cursor = body_start,
            }
        } else {
            let body_start = open + 1;
            let Some(close) = text[body_start..].find('`') else {
                break;
            };
            regions.push(text[body_start..body_start + close].to_string());
            cursor = body_start + close + 1;
        }
    }

    regions
}

/// Drop an info-string line such as `json` at the top of a fenced block.
fn strip_language_tag(block: &str) -> &str {
    match block.split_once('\n') {
        Some((first, body))
            if !first.trim().is_empty()
                && first
                    .trim()
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.')) =>
        {
            body
        }
        _ => block,
    }
}

use serde_json::{json, Map, Value};

/// Locate the list of result fragments in an aggregate response.
///
/// Two nesting shapes are accepted, checked in this order:
/// `{"outputs": [{"outputs": [..]}, ..]}` and `{"outputs": [..]}`.
/// Returns `None` when neither is present.
pub fn locate_fragments(response: &Value) -> Option<&[Value]> {
    let outputs = response.get("outputs")?;

    if let Some(nested) = outputs
        .get(0)
        .and_then(|first| first.get("outputs"))
        .and_then(Value::as_array)
    {
        return Some(nested.as_slice());
    }

    outputs.as_array().map(Vec::as_slice)
}

/// Text payload of one fragment: `results.message.text`, then
/// `outputs.message.message`, else empty.
pub fn fragment_text(fragment: &Value) -> &str {
    const PATHS: [&str; 2] = ["/results/message/text", "/outputs/message/message"];

    PATHS
        .iter()
        .filter_map(|path| fragment.pointer(path).and_then(Value::as_str))
        .find(|text| !text.is_empty())
        .unwrap_or("")
}

/// Drop a leading fence opener line and a trailing bare fence line.
///
/// Only the first and last lines are inspected; fences elsewhere are kept.
pub fn strip_code_fence(text: &str) -> String {
    let mut lines: Vec<&str> = text.split('\n').collect();

    if lines.first().is_some_and(|l| l.trim().starts_with("```")) {
        lines.remove(0);
    }
    if lines.last().is_some_and(|l| l.trim() == "```") {
        lines.pop();
    }

    lines.join("\n").trim().to_string()
}

/// Parse a fragment's text into a JSON object.
///
/// Anything that is not a JSON object after fence stripping is kept as
/// `{"raw_text": <original text>}` so it stays visible for debugging.
pub fn parse_fragment_text(text: &str) -> Map<String, Value> {
    let cleaned = strip_code_fence(text);

    match serde_json::from_str::<Value>(&cleaned) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            tracing::debug!(kind = json_kind(&other), "Fragment JSON is not an object");
            raw_text(text)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Fragment text is not JSON, keeping raw text");
            raw_text(text)
        }
    }
}

fn raw_text(text: &str) -> Map<String, Value> {
    match json!({ "raw_text": text }) {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

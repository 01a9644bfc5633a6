// src/llm/json.rs
// Best-effort JSON recovery from model replies that wrap an object in prose

use serde_json::Value;

/// Try to pull a JSON object out of free text.
///
/// Strategy: parse the whole string first, then the widest `{...}` substring.
/// Returns None when neither parse yields an object; the caller falls through
/// to its deterministic heuristic.
pub fn best_effort_json(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text)
        && value.is_object()
    {
        return Some(value);
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }

    serde_json::from_str::<Value>(&text[start..=end])
        .ok()
        .filter(|v| v.is_object())
}

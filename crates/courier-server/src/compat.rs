//! Param normalization for older clients.
//!
//! Handlers read snake_case keys only; this layer folds the camelCase and
//! legacy spellings into them before dispatch.

/// camelCase keys and their snake_case equivalents.
const CAMEL_TO_SNAKE: &[(&str, &str)] = &[("timeoutMs", "timeout_ms")];

/// Spellings of the session key older clients send.
const SESSION_ALIASES: &[&str] = &["sessionId", "session_id"];

/// Normalize params. Existing canonical keys win over aliases, and the
/// aliases are dropped either way. Non-object params pass through unchanged.
pub fn normalize_params(params: &serde_json::Value) -> serde_json::Value {
    let Some(obj) = params.as_object() else {
        return params.clone();
    };
    let mut result = obj.clone();

    for &(camel, snake) in CAMEL_TO_SNAKE {
        if let Some(val) = result.remove(camel) {
            result.entry(snake.to_string()).or_insert(val);
        }
    }

    for alias in SESSION_ALIASES {
        if let Some(val) = result.remove(*alias) {
            result.entry("session".to_string()).or_insert(val);
        }
    }

    // `session: { id: "..." }` is accepted as the plain id.
    if let Some(id) = result
        .get("session")
        .and_then(|s| s.get("id"))
        .and_then(|id| id.as_str())
        .map(str::to_string)
    {
        result.insert("session".to_string(), serde_json::Value::String(id));
    }

    serde_json::Value::Object(result)
}

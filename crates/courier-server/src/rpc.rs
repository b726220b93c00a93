use serde::{Deserialize, Serialize};

/// JSON-RPC 2.0 request.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    pub method: String,
    pub params: Option<serde_json::Value>,
    pub id: Option<serde_json::Value>,
}

/// Response envelope: `{ id, success, result?, error?: { code: String, message } }`.
///
/// Exactly one of `result` and `error` is present.
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    pub id: Option<serde_json::Value>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// Error object. `code` is a stable string, see [`error_code_to_string`].
#[derive(Debug, Serialize)]
pub struct RpcError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

// Standard JSON-RPC error codes
pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

// Application error codes
pub const SESSION_NOT_FOUND: i32 = -32001;
pub const SESSION_NOT_READY: i32 = -32002;
pub const UPSTREAM_ERROR: i32 = -32003;
pub const CANCELLED: i32 = -32004;
pub const TIMEOUT: i32 = -32005;

/// Map numeric error codes to the string codes sent on the wire.
pub fn error_code_to_string(code: i32) -> &'static str {
    match code {
        PARSE_ERROR => "PARSE_ERROR",
        INVALID_REQUEST => "INVALID_REQUEST",
        METHOD_NOT_FOUND => "METHOD_NOT_FOUND",
        INVALID_PARAMS => "INVALID_PARAMS",
        INTERNAL_ERROR => "INTERNAL_ERROR",
        SESSION_NOT_FOUND => "SESSION_NOT_FOUND",
        SESSION_NOT_READY => "SESSION_NOT_READY",
        UPSTREAM_ERROR => "UPSTREAM_ERROR",
        CANCELLED => "CANCELLED",
        TIMEOUT => "TIMEOUT",
        _ => "UNKNOWN_ERROR",
    }
}

impl RpcResponse {
    pub fn success(id: Option<serde_json::Value>, result: serde_json::Value) -> Self {
        Self {
            id,
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<serde_json::Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            id,
            success: false,
            result: None,
            error: Some(RpcError {
                code: error_code_to_string(code).to_string(),
                message: message.into(),
                data: None,
            }),
        }
    }

    pub fn method_not_found(id: Option<serde_json::Value>, method: &str) -> Self {
        Self::error(id, METHOD_NOT_FOUND, format!("Method not found: {method}"))
    }

    pub fn invalid_request(id: Option<serde_json::Value>, msg: impl Into<String>) -> Self {
        Self::error(id, INVALID_REQUEST, msg)
    }

    pub fn parse_error() -> Self {
        Self::error(None, PARSE_ERROR, "Parse error")
    }

    /// Error code string, if this is an error response.
    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.code.as_str())
    }
}

/// Decode one inbound frame. Malformed JSON is a parse error. Well-formed
/// JSON that is not a request envelope is an invalid request, answered with
/// its `id` when it carries one.
pub fn parse_request(raw: &str) -> Result<RpcRequest, RpcResponse> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|_| RpcResponse::parse_error())?;
    let id = value.get("id").cloned();
    serde_json::from_value(value)
        .map_err(|e| RpcResponse::invalid_request(id, format!("Invalid request: {e}")))
}

/// Extract a required string param from the RPC params object.
pub fn require_str<'a>(params: &'a serde_json::Value, key: &str) -> Result<&'a str, String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("Missing required parameter: {key}"))
}

/// Extract an optional string param.
pub fn optional_str<'a>(params: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

/// Extract a required boolean param.
pub fn require_bool(params: &serde_json::Value, key: &str) -> Result<bool, String> {
    params
        .get(key)
        .and_then(|v| v.as_bool())
        .ok_or_else(|| format!("Missing required parameter: {key}"))
}

/// Extract an optional u64 param.
pub fn optional_u64(params: &serde_json::Value, key: &str) -> Option<u64> {
    params.get(key).and_then(|v| v.as_u64())
}

/// Extract a required array of strings. Any non-string element is an error.
pub fn require_str_array(params: &serde_json::Value, key: &str) -> Result<Vec<String>, String> {
    let items = params
        .get(key)
        .and_then(|v| v.as_array())
        .ok_or_else(|| format!("Missing required parameter: {key}"))?;
    items
        .iter()
        .enumerate()
        .map(|(i, v)| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| format!("Parameter {key}[{i}] must be a string"))
        })
        .collect()
}

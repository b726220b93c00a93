//! Settings type definitions.
//!
//! All types use camelCase JSON keys and `#[serde(default)]`, so a settings
//! file only needs the fields it overrides.

use serde::{Deserialize, Serialize};

/// Root settings type.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CourierSettings {
    pub server: ServerSettings,
    pub telemetry: TelemetrySettings,
}

/// RPC server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Outbound messages buffered per WebSocket client before dropping.
    pub max_send_queue: usize,
    /// Deadline applied to a request that does not carry its own `timeout_ms`.
    pub request_timeout_ms: u64,
    /// Upper bound for a caller-supplied `timeout_ms`.
    pub max_request_timeout_ms: u64,
    pub heartbeat_interval_ms: u64,
    /// Clients silent for longer than this are dropped by the cleanup task.
    pub client_timeout_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9092,
            max_send_queue: 256,
            request_timeout_ms: 30_000,
            max_request_timeout_ms: 300_000,
            heartbeat_interval_ms: 30_000,
            client_timeout_ms: 90_000,
        }
    }
}

/// Logging and metrics settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TelemetrySettings {
    /// Default level (`trace`..`error`). `RUST_LOG` wins when set.
    pub log_level: String,
    /// Per-module overrides, e.g. `[["courier_server", "debug"]]`.
    pub module_levels: Vec<(String, String)>,
    /// JSON lines on stdout instead of human-readable output.
    pub json: bool,
    pub metrics_enabled: bool,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            module_levels: Vec::new(),
            json: true,
            metrics_enabled: true,
        }
    }
}

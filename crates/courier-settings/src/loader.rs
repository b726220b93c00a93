//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`CourierSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over defaults
//! 3. Apply `COURIER_*` environment variable overrides (highest priority)
//! 4. Check every numeric field against [`bounds`]; the env layer already
//!    skips values outside them, so only the file layer can fail here

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::CourierSettings;

/// Inclusive ranges for numeric settings, shared by both layers.
pub mod bounds {
    pub const PORT: (u64, u64) = (1, 65_535);
    pub const MAX_SEND_QUEUE: (u64, u64) = (1, 65_536);
    pub const REQUEST_TIMEOUT_MS: (u64, u64) = (100, 3_600_000);
    pub const MAX_REQUEST_TIMEOUT_MS: (u64, u64) = (100, 3_600_000);
    pub const HEARTBEAT_INTERVAL_MS: (u64, u64) = (1000, 600_000);
    pub const CLIENT_TIMEOUT_MS: (u64, u64) = (1000, 3_600_000);
}

/// Resolve the default settings file path (`~/.courier/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".courier").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<CourierSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON and out-of-range numbers
/// are errors.
pub fn load_settings_from_path(path: &Path) -> Result<CourierSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

/// Check every numeric setting against its range in [`bounds`].
pub fn validate(settings: &CourierSettings) -> Result<()> {
    let server = &settings.server;
    let checks = [
        ("server.port", u64::from(server.port), bounds::PORT),
        ("server.maxSendQueue", server.max_send_queue as u64, bounds::MAX_SEND_QUEUE),
        ("server.requestTimeoutMs", server.request_timeout_ms, bounds::REQUEST_TIMEOUT_MS),
        (
            "server.maxRequestTimeoutMs",
            server.max_request_timeout_ms,
            bounds::MAX_REQUEST_TIMEOUT_MS,
        ),
        (
            "server.heartbeatIntervalMs",
            server.heartbeat_interval_ms,
            bounds::HEARTBEAT_INTERVAL_MS,
        ),
        ("server.clientTimeoutMs", server.client_timeout_ms, bounds::CLIENT_TIMEOUT_MS),
    ];
    for (field, value, (min, max)) in checks {
        if value < min || value > max {
            return Err(SettingsError::OutOfRange {
                field,
                value,
                min,
                max,
            });
        }
    }
    Ok(())
}

fn load_file_layer(path: &Path) -> Result<CourierSettings> {
    let defaults = serde_json::to_value(CourierSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
///
/// Objects merge per key, arrays and primitives are replaced, and nulls in
/// `source` leave `target` untouched.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides. Invalid values are ignored with a
/// warning and the file/default value stays.
pub fn apply_env_overrides(settings: &mut CourierSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

fn apply_overrides_from(settings: &mut CourierSettings, get: impl Fn(&str) -> Option<String>) {
    let env = EnvReader { get };

    if let Some(v) = env.string("COURIER_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = env.ranged("COURIER_PORT", bounds::PORT) {
        settings.server.port = v;
    }
    if let Some(v) = env.ranged("COURIER_MAX_SEND_QUEUE", bounds::MAX_SEND_QUEUE) {
        settings.server.max_send_queue = v;
    }
    if let Some(v) = env.ranged("COURIER_REQUEST_TIMEOUT_MS", bounds::REQUEST_TIMEOUT_MS) {
        settings.server.request_timeout_ms = v;
    }
    if let Some(v) = env.ranged("COURIER_MAX_REQUEST_TIMEOUT_MS", bounds::MAX_REQUEST_TIMEOUT_MS) {
        settings.server.max_request_timeout_ms = v;
    }
    if let Some(v) = env.ranged("COURIER_HEARTBEAT_INTERVAL_MS", bounds::HEARTBEAT_INTERVAL_MS) {
        settings.server.heartbeat_interval_ms = v;
    }
    if let Some(v) = env.ranged("COURIER_CLIENT_TIMEOUT_MS", bounds::CLIENT_TIMEOUT_MS) {
        settings.server.client_timeout_ms = v;
    }
    if let Some(v) = env.string("COURIER_LOG_LEVEL") {
        settings.telemetry.log_level = v;
    }
    if let Some(v) = env.module_levels("COURIER_LOG_MODULES") {
        settings.telemetry.module_levels = v;
    }
    if let Some(v) = env.bool("COURIER_LOG_JSON") {
        settings.telemetry.json = v;
    }
    if let Some(v) = env.bool("COURIER_METRICS_ENABLED") {
        settings.telemetry.metrics_enabled = v;
    }
}

// ── Pure parsing functions ──

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a number within an inclusive range.
pub fn parse_range<T: std::str::FromStr + PartialOrd>(val: &str, min: T, max: T) -> Option<T> {
    let n: T = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse `module=level` pairs separated by commas, e.g.
/// `courier_server=debug,tower_http=warn`. Any malformed pair rejects the
/// whole list.
pub fn parse_module_levels(val: &str) -> Option<Vec<(String, String)>> {
    val.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (module, level) = pair.split_once('=')?;
            let (module, level) = (module.trim(), level.trim());
            (!module.is_empty() && !level.is_empty())
                .then(|| (module.to_string(), level.to_string()))
        })
        .collect()
}

struct EnvReader<F> {
    get: F,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    fn string(&self, name: &str) -> Option<String> {
        (self.get)(name).filter(|v| !v.is_empty())
    }

    fn bool(&self, name: &str) -> Option<bool> {
        let val = (self.get)(name)?;
        let result = parse_bool(&val);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
        }
        result
    }

    /// Parse within `(min, max)`, then narrow to the field's type.
    fn ranged<T: TryFrom<u64>>(&self, name: &str, (min, max): (u64, u64)) -> Option<T> {
        let val = (self.get)(name)?;
        let result = parse_range(&val, min, max).and_then(|n| T::try_from(n).ok());
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid numeric env var, ignoring");
        }
        result
    }

    fn module_levels(&self, name: &str) -> Option<Vec<(String, String)>> {
        let val = self.string(name)?;
        let result = parse_module_levels(&val);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid module level list, ignoring");
        }
        result
    }
}

mod metrics;

pub use metrics::{HistogramSummary, MethodSnapshot, RequestMetrics};

use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Configuration for the telemetry subsystem.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Default log level. Overridden by RUST_LOG env var.
    pub log_level: Level,
    /// Per-module level overrides (e.g. "courier_server" => DEBUG).
    pub module_levels: Vec<(String, Level)>,
    /// JSON lines instead of the human-readable format.
    pub json: bool,
    /// Whether request metrics are recorded.
    pub metrics_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            module_levels: Vec::new(),
            json: true,
            metrics_enabled: true,
        }
    }
}

/// Handle to the telemetry state created at startup.
pub struct TelemetryGuard {
    metrics: Option<Arc<RequestMetrics>>,
}

impl TelemetryGuard {
    /// A guard with metrics but no installed subscriber. Used by tests and
    /// by embedders that own the global subscriber themselves.
    pub fn detached(metrics_enabled: bool) -> Self {
        Self {
            metrics: metrics_enabled.then(|| Arc::new(RequestMetrics::new())),
        }
    }

    /// The request metrics recorder, when enabled.
    pub fn metrics(&self) -> Option<&Arc<RequestMetrics>> {
        self.metrics.as_ref()
    }
}

/// Filter directives built from config, e.g. `info,courier_server=debug`.
pub fn filter_directives(config: &TelemetryConfig) -> String {
    let mut filter = config.log_level.to_string().to_lowercase();
    for (module, level) in &config.module_levels {
        filter.push_str(&format!(",{}={}", module, level.to_string().to_lowercase()));
    }
    filter
}

/// Initialize the telemetry subsystem. Call once at startup.
pub fn init_telemetry(config: TelemetryConfig) -> TelemetryGuard {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(&config)));

    let fmt_layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_span_list(true)
            .with_filter(env_filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_filter(env_filter)
            .boxed()
    };

    // A second init (tests, embedding) keeps the first subscriber.
    if tracing_subscriber::registry().with(fmt_layer).try_init().is_err() {
        tracing::debug!("global subscriber already installed");
    }

    TelemetryGuard::detached(config.metrics_enabled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_include_module_overrides() {
        let config = TelemetryConfig {
            log_level: Level::WARN,
            module_levels: vec![("courier_server".into(), Level::DEBUG)],
            ..Default::default()
        };
        assert_eq!(filter_directives(&config), "warn,courier_server=debug");
    }

    #[test]
    fn detached_guard_respects_metrics_flag() {
        assert!(TelemetryGuard::detached(true).metrics().is_some());
        assert!(TelemetryGuard::detached(false).metrics().is_none());
    }

    #[test]
    fn init_twice_does_not_panic() {
        let _a = init_telemetry(TelemetryConfig::default());
        let b = init_telemetry(TelemetryConfig {
            metrics_enabled: false,
            ..Default::default()
        });
        assert!(b.metrics().is_none());
    }
}

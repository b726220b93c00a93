use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use courier_server::{HandlerState, ServerConfig, SessionRegistry};
use courier_settings::CourierSettings;
use courier_telemetry::TelemetryConfig;
use tracing::Level;

/// Multi-tenant messaging session gateway.
#[derive(Debug, Parser)]
#[command(name = "courier", version)]
struct Args {
    /// Settings file (defaults to ~/.courier/settings.json).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bind address, overrides settings.
    #[arg(long)]
    host: Option<String>,

    /// Listen port, overrides settings.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let path = args.config.clone().unwrap_or_else(courier_settings::settings_path);
    let mut settings = courier_settings::load_settings_from_path(&path)
        .with_context(|| format!("failed to load settings from {}", path.display()))?;
    if let Some(host) = args.host {
        settings.server.host = host;
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }

    let telemetry = courier_telemetry::init_telemetry(telemetry_config(&settings));
    tracing::info!(path = %path.display(), "Starting courier");

    let sessions = Arc::new(SessionRegistry::new());
    let mut handler_state = HandlerState::new(sessions);
    if let Some(metrics) = telemetry.metrics() {
        handler_state = handler_state.with_metrics(Arc::clone(metrics));
    }

    let handle = courier_server::start(server_config(&settings), Arc::new(handler_state))
        .await
        .context("failed to start server")?;
    tracing::info!(port = handle.port, "Courier ready");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    tracing::info!("Shutting down");
    handle.shutdown().await;
    Ok(())
}

fn server_config(settings: &CourierSettings) -> ServerConfig {
    let s = &settings.server;
    ServerConfig {
        host: s.host.clone(),
        port: s.port,
        max_send_queue: s.max_send_queue,
        request_timeout: Duration::from_millis(s.request_timeout_ms),
        max_request_timeout: Duration::from_millis(s.max_request_timeout_ms),
        heartbeat_interval: Duration::from_millis(s.heartbeat_interval_ms),
        client_timeout: Duration::from_millis(s.client_timeout_ms),
    }
}

/// Unknown level names fall back to INFO; unknown module levels are skipped.
fn telemetry_config(settings: &CourierSettings) -> TelemetryConfig {
    let t = &settings.telemetry;
    TelemetryConfig {
        log_level: t.log_level.parse().unwrap_or(Level::INFO),
        module_levels: t
            .module_levels
            .iter()
            .filter_map(|(module, level)| level.parse().ok().map(|l| (module.clone(), l)))
            .collect(),
        json: t.json,
        metrics_enabled: t.metrics_enabled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_converts_millis() {
        let mut settings = CourierSettings::default();
        settings.server.request_timeout_ms = 1_500;
        let config = server_config(&settings);
        assert_eq!(config.request_timeout, Duration::from_millis(1_500));
        assert_eq!(config.port, settings.server.port);
    }

    #[test]
    fn telemetry_levels_parse_leniently() {
        let mut settings = CourierSettings::default();
        settings.telemetry.log_level = "verbose".into();
        settings.telemetry.module_levels = vec![
            ("courier_server".into(), "debug".into()),
            ("tower_http".into(), "loud".into()),
        ];
        let config = telemetry_config(&settings);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.module_levels, vec![("courier_server".to_string(), Level::DEBUG)]);
    }

    #[test]
    fn cli_overrides_parse() {
        let args = Args::parse_from(["courier", "--port", "9999", "--host", "127.0.0.1"]);
        assert_eq!(args.port, Some(9999));
        assert_eq!(args.host.as_deref(), Some("127.0.0.1"));
        assert!(args.config.is_none());
    }
}

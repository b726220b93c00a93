use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use courier_core::CallContext;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::client::{self, ClientId, ClientRegistry};
use crate::handlers::HandlerState;
use crate::rpc::{self, RpcRequest, RpcResponse};

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_send_queue: usize,
    /// Deadline for requests without their own `timeout_ms`.
    pub request_timeout: Duration,
    /// Cap on a caller-supplied `timeout_ms`.
    pub max_request_timeout: Duration,
    pub heartbeat_interval: Duration,
    pub client_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9092,
            max_send_queue: 256,
            request_timeout: Duration::from_secs(30),
            max_request_timeout: Duration::from_secs(300),
            heartbeat_interval: Duration::from_secs(30),
            client_timeout: Duration::from_secs(90),
        }
    }
}

impl ServerConfig {
    /// Deadline for one request: its `timeout_ms` clamped to the maximum,
    /// or the default when absent or zero.
    pub fn request_deadline(&self, params: &serde_json::Value) -> Duration {
        match rpc::optional_u64(params, "timeout_ms").filter(|ms| *ms > 0) {
            Some(ms) => Duration::from_millis(ms).min(self.max_request_timeout),
            None => self.request_timeout,
        }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub handler_state: Arc<HandlerState>,
    pub client_registry: Arc<ClientRegistry>,
    pub message_tx: mpsc::Sender<(ClientId, String)>,
    pub heartbeat_interval: Duration,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind the listener and start serving. Returns once the server is accepting.
pub async fn start(
    config: ServerConfig,
    handler_state: Arc<HandlerState>,
) -> Result<ServerHandle, std::io::Error> {
    let client_registry = Arc::new(ClientRegistry::new(
        config.max_send_queue,
        config.client_timeout,
    ));

    let cleanup =
        client::start_cleanup_task(Arc::clone(&client_registry), config.heartbeat_interval);

    let (msg_tx, msg_rx) = mpsc::channel::<(ClientId, String)>(1024);

    let app_state = AppState {
        handler_state: Arc::clone(&handler_state),
        client_registry: Arc::clone(&client_registry),
        message_tx: msg_tx,
        heartbeat_interval: config.heartbeat_interval,
    };

    let rpc_handle = tokio::spawn(process_rpc_messages(
        msg_rx,
        handler_state,
        Arc::clone(&client_registry),
        config.clone(),
    ));

    let router = build_router(app_state);
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(addr = %local_addr, "Courier server started");

    let shutdown = CancellationToken::new();
    let server_shutdown = shutdown.clone();
    let server = tokio::spawn(async move {
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(server_shutdown.cancelled_owned())
            .await;
        if let Err(e) = result {
            tracing::error!(error = %e, "Server exited with error");
        }
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        shutdown,
        server,
        rpc: rpc_handle,
        cleanup,
    })
}

/// Handle returned by [`start`]. Keeps background tasks alive.
pub struct ServerHandle {
    pub port: u16,
    shutdown: CancellationToken,
    server: tokio::task::JoinHandle<()>,
    rpc: tokio::task::JoinHandle<()>,
    cleanup: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// Stop accepting connections and wait for the listener to close.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        self.cleanup.abort();
        self.rpc.abort();
        let _ = self.server.await;
        tracing::info!("Courier server stopped");
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (client_id, rx) = state.client_registry.register();
    tracing::info!(client_id = %client_id, "WebSocket client connected");

    client::handle_ws_connection(
        socket,
        client_id,
        rx,
        state.client_registry,
        state.message_tx,
        state.heartbeat_interval,
    )
    .await;
}

/// Health check HTTP endpoint.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let resp = crate::handlers::dispatch(
        &state.handler_state,
        "health",
        &serde_json::json!({}),
        None,
        &CallContext::background(),
    )
    .await;
    (axum::http::StatusCode::OK, axum::Json(resp.result.unwrap_or_default()))
}

/// Process incoming RPC messages. Each request runs in its own task with a
/// context derived from its client, so requests never wait on each other.
async fn process_rpc_messages(
    mut rx: mpsc::Receiver<(ClientId, String)>,
    state: Arc<HandlerState>,
    registry: Arc<ClientRegistry>,
    config: ServerConfig,
) {
    while let Some((client_id, raw_message)) = rx.recv().await {
        let request = match rpc::parse_request(&raw_message) {
            Ok(req) => req,
            Err(response) => {
                tracing::debug!(
                    client_id = %client_id,
                    code = response.error_code().unwrap_or_default(),
                    "Rejected request envelope"
                );
                reply(&registry, &client_id, &response);
                continue;
            }
        };

        let Some(token) = registry.request_token(&client_id) else {
            continue;
        };

        let RpcRequest { method, params, id } = request;
        let params = params.unwrap_or_else(|| serde_json::json!({}));
        let ctx = CallContext::with_timeout(
            token,
            config.request_deadline(&crate::compat::normalize_params(&params)),
        );

        let state = Arc::clone(&state);
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            let response = crate::handlers::dispatch(&state, &method, &params, id, &ctx).await;
            reply(&registry, &client_id, &response);
        });
    }
}

fn reply(registry: &ClientRegistry, client_id: &ClientId, response: &RpcResponse) {
    match serde_json::to_string(response) {
        Ok(json) => {
            registry.send_to(client_id, json);
        }
        Err(e) => {
            tracing::error!(client_id = %client_id, error = %e, "Failed to serialize response")
        }
    }
}

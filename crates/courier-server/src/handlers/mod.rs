//! RPC method handlers organized by domain.
//!
//! Each domain module exposes typed handlers (`SessionId` plus operation
//! inputs in, mapped response or [`RequestError`] out). This module owns the
//! shared state, param extraction and routing from RPC method names.

pub mod contacts;
pub mod newsletter;
pub mod profile;
pub mod system;

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use courier_core::{CallContext, SessionId};
use courier_telemetry::RequestMetrics;
use serde::Serialize;

use crate::compat;
use crate::errors::RequestError;
use crate::registry::{ConnectionHandle, SessionLookup};
use crate::rpc::{self, RpcResponse};

/// Metrics key for every method the router does not know. Method names come
/// from clients, so only routed names get their own entry.
pub const UNKNOWN_METHOD: &str = "unknown";

/// Shared state available to all RPC handlers.
pub struct HandlerState {
    pub sessions: Arc<dyn SessionLookup>,
    pub metrics: Option<Arc<RequestMetrics>>,
    pub started_at: DateTime<Utc>,
}

impl HandlerState {
    pub fn new(sessions: Arc<dyn SessionLookup>) -> Self {
        Self {
            sessions,
            metrics: None,
            started_at: Utc::now(),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<RequestMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Resolve a session to its connection handle.
    pub(crate) fn resolve(&self, session: &SessionId) -> Result<ConnectionHandle, RequestError> {
        Ok(self.sessions.lookup(session)?)
    }
}

/// Dispatch an RPC method to the appropriate handler.
///
/// Params are normalized (see [`compat::normalize_params`]) before routing.
/// Every call is timed and recorded when metrics are enabled.
pub async fn dispatch(
    state: &Arc<HandlerState>,
    method: &str,
    params: &serde_json::Value,
    id: Option<serde_json::Value>,
    ctx: &CallContext,
) -> RpcResponse {
    let params = compat::normalize_params(params);
    let started = Instant::now();

    let response = route(state, method, &params, id, ctx).await;

    let elapsed = started.elapsed();
    match response.error.as_ref() {
        None => {
            tracing::debug!(method, elapsed_ms = elapsed.as_millis() as u64, "Request ok")
        }
        Some(err) => tracing::warn!(
            method,
            code = %err.code,
            error = %err.message,
            elapsed_ms = elapsed.as_millis() as u64,
            "Request failed"
        ),
    }
    if let Some(metrics) = &state.metrics {
        let code = response.error_code();
        let key = if code == Some("METHOD_NOT_FOUND") {
            UNKNOWN_METHOD
        } else {
            method
        };
        metrics.record(key, code, elapsed);
    }
    response
}

async fn route(
    state: &Arc<HandlerState>,
    method: &str,
    params: &serde_json::Value,
    id: Option<serde_json::Value>,
    ctx: &CallContext,
) -> RpcResponse {
    match method {
        // Profile
        "profile.picture" => profile::rpc_picture(state, params, id, ctx).await,

        // Contacts
        "contacts.checkPhones" => contacts::rpc_check_phones(state, params, id, ctx).await,

        // Newsletter
        "newsletter.list" => newsletter::rpc_list(state, params, id, ctx).await,
        "newsletter.info" => newsletter::rpc_info(state, params, id, ctx).await,
        "newsletter.create" => newsletter::rpc_create(state, params, id, ctx).await,
        "newsletter.toggleMute" => newsletter::rpc_toggle_mute(state, params, id, ctx).await,
        "newsletter.toggleFollow" => newsletter::rpc_toggle_follow(state, params, id, ctx).await,

        // System
        "system.ping" | "health" => system::health(state, id),
        "session.list" => system::session_list(state, id),
        "telemetry.metrics" => system::telemetry_metrics(state, id),

        _ => RpcResponse::method_not_found(id, method),
    }
}

/// Turn a handler outcome into a response envelope.
pub(crate) fn respond<T: Serialize>(
    id: Option<serde_json::Value>,
    result: Result<T, RequestError>,
) -> RpcResponse {
    match result {
        Ok(value) => match serde_json::to_value(value) {
            Ok(json) => RpcResponse::success(id, json),
            Err(e) => RpcResponse::error(id, rpc::INTERNAL_ERROR, e.to_string()),
        },
        Err(e) => RpcResponse::error(id, e.rpc_code(), e.to_string()),
    }
}

/// The `session` param as a [`SessionId`].
pub(crate) fn session_param(params: &serde_json::Value) -> Result<SessionId, RequestError> {
    require_str(params, "session").map(SessionId::from_raw)
}

pub(crate) fn require_str<'a>(
    params: &'a serde_json::Value,
    key: &str,
) -> Result<&'a str, RequestError> {
    rpc::require_str(params, key).map_err(RequestError::Validation)
}

pub(crate) fn require_bool(params: &serde_json::Value, key: &str) -> Result<bool, RequestError> {
    rpc::require_bool(params, key).map_err(RequestError::Validation)
}

use std::sync::Arc;

use super::HandlerState;
use crate::rpc::RpcResponse;

pub(super) fn health(state: &Arc<HandlerState>, id: Option<serde_json::Value>) -> RpcResponse {
    let sessions = state.sessions.sessions().len();
    RpcResponse::success(
        id,
        serde_json::json!({
            "status": "healthy",
            "sessions": sessions,
            "startedAt": state.started_at.to_rfc3339(),
        }),
    )
}

pub(super) fn session_list(
    state: &Arc<HandlerState>,
    id: Option<serde_json::Value>,
) -> RpcResponse {
    let sessions: Vec<_> = state
        .sessions
        .sessions()
        .into_iter()
        .map(|(session_id, status)| {
            serde_json::json!({
                "sessionId": session_id,
                "state": status,
            })
        })
        .collect();
    RpcResponse::success(id, serde_json::json!({ "sessions": sessions }))
}

pub(super) fn telemetry_metrics(
    state: &Arc<HandlerState>,
    id: Option<serde_json::Value>,
) -> RpcResponse {
    match &state.metrics {
        Some(metrics) => RpcResponse::success(
            id,
            serde_json::json!({
                "enabled": true,
                "totalRequests": metrics.total_requests(),
                "methods": metrics.snapshot(),
            }),
        ),
        None => RpcResponse::success(
            id,
            serde_json::json!({
                "enabled": false,
                "totalRequests": 0,
                "methods": {},
            }),
        ),
    }
}

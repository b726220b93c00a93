use std::sync::Arc;

use base64::Engine as _;
use courier_core::address::has_channel_suffix;
use courier_core::records::CreateChannelParams;
use courier_core::{Address, CallContext, SessionId};
use serde::Serialize;

use super::{require_bool, require_str, respond, session_param, HandlerState};
use crate::errors::RequestError;
use crate::mappers::{self, Empty, Newsletter};
use crate::rpc::{self, RpcResponse};

#[derive(Debug, Serialize)]
pub struct NewsletterList {
    pub newsletters: Vec<Newsletter>,
}

/// Parse `jid` and require it to name a channel.
fn channel_address(jid: &str) -> Result<Address, RequestError> {
    let address = Address::parse(jid)?;
    if !address.is_channel() {
        return Err(RequestError::Validation(
            "invalid jid, not a newsletter".to_string(),
        ));
    }
    Ok(address)
}

pub async fn list_subscribed_channels(
    state: &HandlerState,
    ctx: &CallContext,
    session: &SessionId,
) -> Result<Vec<Newsletter>, RequestError> {
    let conn = state.resolve(session)?;
    let channels = ctx.run(conn.subscribed_channels(ctx)).await?;
    Ok(channels.iter().map(mappers::to_newsletter).collect())
}

/// Look up a channel by address or by invite code.
///
/// Identifiers ending in `@newsletter` are parsed and looked up by address;
/// anything else is forwarded verbatim as an invite code. An invite code
/// that happens to end in `@newsletter` is routed as an address.
pub async fn get_channel_info(
    state: &HandlerState,
    ctx: &CallContext,
    session: &SessionId,
    id: &str,
) -> Result<Newsletter, RequestError> {
    let conn = state.resolve(session)?;

    let meta = if has_channel_suffix(id) {
        let address = Address::parse(id)?;
        ctx.run(conn.channel_info(ctx, &address)).await?
    } else {
        if id.is_empty() {
            return Err(RequestError::Validation("invite code is empty".to_string()));
        }
        ctx.run(conn.channel_info_by_invite(ctx, id)).await?
    };
    Ok(mappers::to_newsletter(&meta))
}

pub async fn create_channel(
    state: &HandlerState,
    ctx: &CallContext,
    session: &SessionId,
    params: CreateChannelParams,
) -> Result<Newsletter, RequestError> {
    let conn = state.resolve(session)?;
    let name = params.name.clone();
    let meta = ctx.run(conn.create_channel(ctx, params)).await?;
    tracing::info!(session_id = %session, channel = %meta.id, name = %name, "Channel created");
    Ok(mappers::to_newsletter(&meta))
}

/// Mute or unmute a channel.
pub async fn toggle_channel_mute(
    state: &HandlerState,
    ctx: &CallContext,
    session: &SessionId,
    jid: &str,
    mute: bool,
) -> Result<Empty, RequestError> {
    let conn = state.resolve(session)?;
    let address = channel_address(jid)?;
    ctx.run(conn.set_channel_mute(ctx, &address, mute)).await?;
    Ok(Empty {})
}

/// Follow (`true`) or unfollow (`false`) a channel.
pub async fn toggle_channel_follow(
    state: &HandlerState,
    ctx: &CallContext,
    session: &SessionId,
    jid: &str,
    follow: bool,
) -> Result<Empty, RequestError> {
    let conn = state.resolve(session)?;
    let address = channel_address(jid)?;
    if follow {
        ctx.run(conn.follow_channel(ctx, &address)).await?;
    } else {
        ctx.run(conn.unfollow_channel(ctx, &address)).await?;
    }
    Ok(Empty {})
}

/// Decode the optional base64 `picture` param. Absent or empty means no picture.
fn picture_param(params: &serde_json::Value) -> Result<Vec<u8>, RequestError> {
    match rpc::optional_str(params, "picture") {
        None | Some("") => Ok(Vec::new()),
        Some(encoded) => base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| RequestError::Validation(format!("invalid picture: {e}"))),
    }
}

pub(super) async fn rpc_list(
    state: &Arc<HandlerState>,
    params: &serde_json::Value,
    id: Option<serde_json::Value>,
    ctx: &CallContext,
) -> RpcResponse {
    let result = async {
        let session = session_param(params)?;
        let newsletters = list_subscribed_channels(state, ctx, &session).await?;
        Ok::<_, RequestError>(NewsletterList { newsletters })
    }
    .await;
    respond(id, result)
}

pub(super) async fn rpc_info(
    state: &Arc<HandlerState>,
    params: &serde_json::Value,
    id: Option<serde_json::Value>,
    ctx: &CallContext,
) -> RpcResponse {
    let result = async {
        let session = session_param(params)?;
        let channel_id = require_str(params, "id")?;
        get_channel_info(state, ctx, &session, channel_id).await
    }
    .await;
    respond(id, result)
}

pub(super) async fn rpc_create(
    state: &Arc<HandlerState>,
    params: &serde_json::Value,
    id: Option<serde_json::Value>,
    ctx: &CallContext,
) -> RpcResponse {
    let result = async {
        let session = session_param(params)?;
        let create = CreateChannelParams {
            name: require_str(params, "name")?.to_string(),
            description: rpc::optional_str(params, "description")
                .unwrap_or_default()
                .to_string(),
            picture: picture_param(params)?,
        };
        create_channel(state, ctx, &session, create).await
    }
    .await;
    respond(id, result)
}

pub(super) async fn rpc_toggle_mute(
    state: &Arc<HandlerState>,
    params: &serde_json::Value,
    id: Option<serde_json::Value>,
    ctx: &CallContext,
) -> RpcResponse {
    let result = async {
        let session = session_param(params)?;
        let jid = require_str(params, "jid")?;
        let mute = require_bool(params, "mute")?;
        toggle_channel_mute(state, ctx, &session, jid, mute).await
    }
    .await;
    respond(id, result)
}

pub(super) async fn rpc_toggle_follow(
    state: &Arc<HandlerState>,
    params: &serde_json::Value,
    id: Option<serde_json::Value>,
    ctx: &CallContext,
) -> RpcResponse {
    let result = async {
        let session = session_param(params)?;
        let jid = require_str(params, "jid")?;
        let follow = require_bool(params, "follow")?;
        toggle_channel_follow(state, ctx, &session, jid, follow).await
    }
    .await;
    respond(id, result)
}

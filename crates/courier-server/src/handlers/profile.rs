use std::sync::Arc;

use courier_core::{Address, BenignCondition, CallContext, SessionId};

use super::{require_str, respond, session_param, HandlerState};
use crate::errors::RequestError;
use crate::mappers::{self, ProfilePicture};
use crate::rpc::RpcResponse;

/// Upstream conditions answered with a success value instead of an error.
/// Both collapse to an empty URL, so callers cannot tell them apart.
const PROFILE_PICTURE_POLICY: &[(BenignCondition, fn() -> ProfilePicture)] = &[
    (BenignCondition::PictureNotSet, ProfilePicture::default),
    (BenignCondition::PictureUnauthorized, ProfilePicture::default),
];

fn benign_picture(condition: BenignCondition) -> Option<ProfilePicture> {
    PROFILE_PICTURE_POLICY
        .iter()
        .find(|(c, _)| *c == condition)
        .map(|(_, value)| value())
}

/// Full-size profile picture URL for `jid`.
///
/// The address is parsed before the session is resolved.
pub async fn get_profile_picture(
    state: &HandlerState,
    ctx: &CallContext,
    session: &SessionId,
    jid: &str,
) -> Result<ProfilePicture, RequestError> {
    let address = Address::parse(jid)?;
    let conn = state.resolve(session)?;

    match ctx.run(conn.profile_picture(ctx, &address, false)).await {
        Ok(info) => Ok(mappers::to_profile_picture(&info)),
        Err(e) => match e.condition().and_then(benign_picture) {
            Some(picture) => {
                tracing::debug!(
                    session_id = %session,
                    jid,
                    condition = e.error_kind(),
                    "Profile picture unavailable"
                );
                Ok(picture)
            }
            None => Err(e.into()),
        },
    }
}

pub(super) async fn rpc_picture(
    state: &Arc<HandlerState>,
    params: &serde_json::Value,
    id: Option<serde_json::Value>,
    ctx: &CallContext,
) -> RpcResponse {
    let result = async {
        let jid = require_str(params, "jid")?;
        let session = session_param(params)?;
        get_profile_picture(state, ctx, &session, jid).await
    }
    .await;
    respond(id, result)
}

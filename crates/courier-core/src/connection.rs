use async_trait::async_trait;

use crate::address::Address;
use crate::context::CallContext;
use crate::errors::ProtocolError;
use crate::records::{ChannelMetadata, CreateChannelParams, PictureInfo, RegistrationResult};

/// An authenticated connection to the messaging network, owned by the
/// protocol engine.
///
/// Implementations may be shared by many concurrent requests; any
/// serialization of network calls is the implementation's concern. Every
/// call receives the caller's [`CallContext`] and should give up once it
/// fires.
#[async_trait]
pub trait Connection: Send + Sync {
    async fn profile_picture(
        &self,
        ctx: &CallContext,
        address: &Address,
        preview: bool,
    ) -> Result<PictureInfo, ProtocolError>;

    /// Batched registration check. One result per input phone, in order.
    async fn check_registration(
        &self,
        ctx: &CallContext,
        phones: &[String],
    ) -> Result<Vec<RegistrationResult>, ProtocolError>;

    async fn subscribed_channels(
        &self,
        ctx: &CallContext,
    ) -> Result<Vec<ChannelMetadata>, ProtocolError>;

    async fn channel_info(
        &self,
        ctx: &CallContext,
        address: &Address,
    ) -> Result<ChannelMetadata, ProtocolError>;

    async fn channel_info_by_invite(
        &self,
        ctx: &CallContext,
        code: &str,
    ) -> Result<ChannelMetadata, ProtocolError>;

    async fn create_channel(
        &self,
        ctx: &CallContext,
        params: CreateChannelParams,
    ) -> Result<ChannelMetadata, ProtocolError>;

    async fn set_channel_mute(
        &self,
        ctx: &CallContext,
        address: &Address,
        mute: bool,
    ) -> Result<(), ProtocolError>;

    async fn follow_channel(
        &self,
        ctx: &CallContext,
        address: &Address,
    ) -> Result<(), ProtocolError>;

    async fn unfollow_channel(
        &self,
        ctx: &CallContext,
        address: &Address,
    ) -> Result<(), ProtocolError>;
}

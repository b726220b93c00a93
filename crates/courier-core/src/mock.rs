use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::address::Address;
use crate::connection::Connection;
use crate::context::CallContext;
use crate::errors::ProtocolError;
use crate::records::{ChannelMetadata, CreateChannelParams, PictureInfo, RegistrationResult};

/// A call observed by [`MockConnection`], with its arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MockCall {
    ProfilePicture { address: Address, preview: bool },
    CheckRegistration { phones: Vec<String> },
    SubscribedChannels,
    ChannelInfo { address: Address },
    ChannelInfoByInvite { code: String },
    CreateChannel { params: CreateChannelParams },
    SetChannelMute { address: Address, mute: bool },
    FollowChannel { address: Address },
    UnfollowChannel { address: Address },
}

/// In-memory connection for deterministic testing without a network.
///
/// Each method returns its pre-programmed result (cloned per call) and
/// records the call. Unprogrammed methods fail with `ProtocolError::Other`,
/// except the registration check, which echoes every phone as unregistered.
pub struct MockConnection {
    picture: Option<Result<PictureInfo, ProtocolError>>,
    registration: Option<Result<Vec<RegistrationResult>, ProtocolError>>,
    channels: Option<Result<Vec<ChannelMetadata>, ProtocolError>>,
    channel: Option<Result<ChannelMetadata, ProtocolError>>,
    ack: Result<(), ProtocolError>,
    delay: Option<Duration>,
    calls: Mutex<Vec<MockCall>>,
}

impl Default for MockConnection {
    fn default() -> Self {
        Self {
            picture: None,
            registration: None,
            channels: None,
            channel: None,
            ack: Ok(()),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_picture(mut self, result: Result<PictureInfo, ProtocolError>) -> Self {
        self.picture = Some(result);
        self
    }

    pub fn with_registration(
        mut self,
        result: Result<Vec<RegistrationResult>, ProtocolError>,
    ) -> Self {
        self.registration = Some(result);
        self
    }

    pub fn with_channels(mut self, result: Result<Vec<ChannelMetadata>, ProtocolError>) -> Self {
        self.channels = Some(result);
        self
    }

    /// Result for channel lookups (by address or invite) and creation.
    pub fn with_channel(mut self, result: Result<ChannelMetadata, ProtocolError>) -> Self {
        self.channel = Some(result);
        self
    }

    /// Result for mute and follow toggles.
    pub fn with_ack(mut self, result: Result<(), ProtocolError>) -> Self {
        self.ack = result;
        self
    }

    /// Sleep this long before answering any call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    async fn record(&self, call: MockCall) {
        self.calls.lock().push(call);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn unprogrammed<T>(method: &str) -> Result<T, ProtocolError> {
    Err(ProtocolError::Other(format!("MockConnection: no response configured for {method}")))
}

#[async_trait]
impl Connection for MockConnection {
    async fn profile_picture(
        &self,
        _ctx: &CallContext,
        address: &Address,
        preview: bool,
    ) -> Result<PictureInfo, ProtocolError> {
        self.record(MockCall::ProfilePicture {
            address: address.clone(),
            preview,
        })
        .await;
        self.picture.clone().unwrap_or_else(|| unprogrammed("profile_picture"))
    }

    async fn check_registration(
        &self,
        _ctx: &CallContext,
        phones: &[String],
    ) -> Result<Vec<RegistrationResult>, ProtocolError> {
        self.record(MockCall::CheckRegistration {
            phones: phones.to_vec(),
        })
        .await;
        match &self.registration {
            Some(result) => result.clone(),
            None => Ok(phones
                .iter()
                .map(|p| RegistrationResult {
                    query: p.clone(),
                    address: None,
                    is_registered: false,
                })
                .collect()),
        }
    }

    async fn subscribed_channels(
        &self,
        _ctx: &CallContext,
    ) -> Result<Vec<ChannelMetadata>, ProtocolError> {
        self.record(MockCall::SubscribedChannels).await;
        self.channels.clone().unwrap_or_else(|| unprogrammed("subscribed_channels"))
    }

    async fn channel_info(
        &self,
        _ctx: &CallContext,
        address: &Address,
    ) -> Result<ChannelMetadata, ProtocolError> {
        self.record(MockCall::ChannelInfo {
            address: address.clone(),
        })
        .await;
        self.channel.clone().unwrap_or_else(|| unprogrammed("channel_info"))
    }

    async fn channel_info_by_invite(
        &self,
        _ctx: &CallContext,
        code: &str,
    ) -> Result<ChannelMetadata, ProtocolError> {
        self.record(MockCall::ChannelInfoByInvite { code: code.to_string() })
            .await;
        self.channel
            .clone()
            .unwrap_or_else(|| unprogrammed("channel_info_by_invite"))
    }

    async fn create_channel(
        &self,
        _ctx: &CallContext,
        params: CreateChannelParams,
    ) -> Result<ChannelMetadata, ProtocolError> {
        self.record(MockCall::CreateChannel { params }).await;
        self.channel.clone().unwrap_or_else(|| unprogrammed("create_channel"))
    }

    async fn set_channel_mute(
        &self,
        _ctx: &CallContext,
        address: &Address,
        mute: bool,
    ) -> Result<(), ProtocolError> {
        self.record(MockCall::SetChannelMute {
            address: address.clone(),
            mute,
        })
        .await;
        self.ack.clone()
    }

    async fn follow_channel(
        &self,
        _ctx: &CallContext,
        address: &Address,
    ) -> Result<(), ProtocolError> {
        self.record(MockCall::FollowChannel {
            address: address.clone(),
        })
        .await;
        self.ack.clone()
    }

    async fn unfollow_channel(
        &self,
        _ctx: &CallContext,
        address: &Address,
    ) -> Result<(), ProtocolError> {
        self.record(MockCall::UnfollowChannel {
            address: address.clone(),
        })
        .await;
        self.ack.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel_addr() -> Address {
        Address::parse("120363144038483540@newsletter").unwrap()
    }

    #[tokio::test]
    async fn records_calls_in_order() {
        let mock = MockConnection::new();
        let ctx = CallContext::background();
        mock.follow_channel(&ctx, &channel_addr()).await.unwrap();
        mock.set_channel_mute(&ctx, &channel_addr(), true).await.unwrap();

        assert_eq!(mock.call_count(), 2);
        assert_eq!(
            mock.calls(),
            vec![
                MockCall::FollowChannel { address: channel_addr() },
                MockCall::SetChannelMute {
                    address: channel_addr(),
                    mute: true
                },
            ]
        );
    }

    #[tokio::test]
    async fn unprogrammed_method_errors() {
        let mock = MockConnection::new();
        let err = mock
            .channel_info(&CallContext::background(), &channel_addr())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("channel_info"));
    }

    #[tokio::test]
    async fn default_registration_echoes_phones() {
        let mock = MockConnection::new();
        let phones = vec!["+1".to_string(), "+2".to_string()];
        let out = mock
            .check_registration(&CallContext::background(), &phones)
            .await
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].query, "+2");
        assert!(!out[0].is_registered);
    }

    #[tokio::test]
    async fn programmed_error_is_returned_each_call() {
        let mock = MockConnection::new().with_picture(Err(ProtocolError::PictureNotSet));
        let addr = Address::parse("1@s.whatsapp.net").unwrap();
        for _ in 0..2 {
            let err = mock
                .profile_picture(&CallContext::background(), &addr, false)
                .await
                .unwrap_err();
            assert!(matches!(err, ProtocolError::PictureNotSet));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn delay_is_applied() {
        let mock = MockConnection::new().with_delay(Duration::from_secs(5));
        let start = tokio::time::Instant::now();
        mock.follow_channel(&CallContext::background(), &channel_addr())
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_secs(5));
    }
}

//! Records returned by the protocol connection.
//!
//! These mirror what the messaging network hands back and are not exposed to
//! callers directly; the server maps them into its own response shapes.

use serde::{Deserialize, Serialize};

use crate::address::Address;

/// Profile picture metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PictureInfo {
    pub id: String,
    pub kind: String,
    pub url: String,
    pub direct_path: String,
}

/// One entry of a batched registration check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationResult {
    /// The phone number as the network echoed it back.
    pub query: String,
    pub address: Option<Address>,
    pub is_registered: bool,
}

/// A media reference that may carry a direct URL, a content path, or both.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub url: String,
    pub direct_path: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationState {
    Verified,
    #[default]
    Unverified,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelRole {
    Owner,
    Admin,
    Subscriber,
    Guest,
}

impl ChannelRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Subscriber => "subscriber",
            Self::Guest => "guest",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MuteState {
    On,
    #[default]
    Off,
}

/// Channel-wide metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadMeta {
    pub name: String,
    pub description: String,
    pub invite_code: String,
    pub subscriber_count: u64,
    pub verification: VerificationState,
    /// Absent for channels that never set a picture.
    pub picture: Option<MediaRef>,
    pub preview: MediaRef,
}

/// Per-viewer membership data. Absent when the viewer has no channel-scoped
/// membership record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerMeta {
    pub role: ChannelRole,
    pub mute: MuteState,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMetadata {
    pub id: Address,
    pub thread: ThreadMeta,
    pub viewer: Option<ViewerMeta>,
}

/// Parameters for creating a channel. Forwarded verbatim.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CreateChannelParams {
    pub name: String,
    pub description: String,
    pub picture: Vec<u8>,
}

//! Translation from protocol records to the response shapes callers see.
//!
//! Every function here is pure and total: any record maps to a value.

use courier_core::records::{
    ChannelMetadata, MediaRef, PictureInfo, RegistrationResult, VerificationState,
};
use serde::Serialize;

/// Channel (newsletter) as returned to callers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Newsletter {
    pub id: String,
    pub name: String,
    pub description: String,
    pub invite: String,
    pub picture: String,
    pub preview: String,
    pub verified: bool,
    /// Lowercase role name, empty when the viewer has no membership record.
    pub role: String,
}

/// Registration result for one input phone.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PhoneInfo {
    pub phone: String,
    pub jid: String,
    pub registered: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProfilePicture {
    pub url: String,
}

/// Acknowledgement with no payload; serializes as `{}`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Empty {}

/// Prefer the direct URL, fall back to the content path.
pub fn media_fallback(url: &str, direct_path: &str) -> String {
    if url.is_empty() {
        direct_path.to_string()
    } else {
        url.to_string()
    }
}

fn media_ref(media: Option<&MediaRef>) -> String {
    media
        .map(|m| media_fallback(&m.url, &m.direct_path))
        .unwrap_or_default()
}

pub fn to_newsletter(meta: &ChannelMetadata) -> Newsletter {
    let thread = &meta.thread;
    Newsletter {
        id: meta.id.to_string(),
        name: thread.name.clone(),
        description: thread.description.clone(),
        invite: thread.invite_code.clone(),
        picture: media_ref(thread.picture.as_ref()),
        preview: media_ref(Some(&thread.preview)),
        verified: thread.verification == VerificationState::Verified,
        role: meta
            .viewer
            .as_ref()
            .map(|v| v.role.as_str().to_string())
            .unwrap_or_default(),
    }
}

/// `phone` is the normalized input, not the network's echo of it.
pub fn to_phone_info(phone: &str, result: &RegistrationResult) -> PhoneInfo {
    PhoneInfo {
        phone: phone.to_string(),
        jid: result
            .address
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default(),
        registered: result.is_registered,
    }
}

pub fn to_profile_picture(info: &PictureInfo) -> ProfilePicture {
    ProfilePicture {
        url: info.url.clone(),
    }
}

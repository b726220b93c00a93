use std::time::Duration;

/// Upstream conditions that callers observe as a normal result rather than
/// an error. Which value each maps to is decided by the caller's policy table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BenignCondition {
    PictureNotSet,
    PictureUnauthorized,
}

/// Errors surfaced by a protocol connection.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("the user has no profile picture set")]
    PictureNotSet,
    #[error("not authorized to view the profile picture")]
    PictureUnauthorized,
    #[error("cancelled")]
    Cancelled,
    #[error("timeout after {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Other(String),
}

impl ProtocolError {
    /// The benign condition this error represents, if any.
    pub fn condition(&self) -> Option<BenignCondition> {
        match self {
            Self::PictureNotSet => Some(BenignCondition::PictureNotSet),
            Self::PictureUnauthorized => Some(BenignCondition::PictureUnauthorized),
            _ => None,
        }
    }

    /// Short classification string for logging/metrics.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::PictureNotSet => "picture_not_set",
            Self::PictureUnauthorized => "picture_unauthorized",
            Self::Cancelled => "cancelled",
            Self::Timeout(_) => "timeout",
            Self::Other(_) => "other",
        }
    }
}

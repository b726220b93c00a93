use std::time::Duration;

use courier_core::{AddressError, ProtocolError, SessionId};

use crate::registry::RegistryError;
use crate::rpc;

/// Outcome categories a request handler can fail with.
///
/// Validation and session errors are always produced before the protocol
/// connection is contacted.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("{0}")]
    Validation(String),

    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("session not ready: {0}")]
    SessionNotReady(SessionId),

    /// The connection call failed; carries the upstream message unchanged.
    #[error("{0}")]
    Upstream(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Internal(String),
}

impl RequestError {
    /// Numeric RPC code for this error.
    pub fn rpc_code(&self) -> i32 {
        match self {
            Self::Validation(_) => rpc::INVALID_PARAMS,
            Self::SessionNotFound(_) => rpc::SESSION_NOT_FOUND,
            Self::SessionNotReady(_) => rpc::SESSION_NOT_READY,
            Self::Upstream(_) => rpc::UPSTREAM_ERROR,
            Self::Cancelled => rpc::CANCELLED,
            Self::Timeout(_) => rpc::TIMEOUT,
            Self::Internal(_) => rpc::INTERNAL_ERROR,
        }
    }

    /// Wire code string, e.g. `INVALID_PARAMS`.
    pub fn code(&self) -> &'static str {
        rpc::error_code_to_string(self.rpc_code())
    }
}

impl From<AddressError> for RequestError {
    fn from(e: AddressError) -> Self {
        Self::Validation(format!("invalid jid: {e}"))
    }
}

impl From<RegistryError> for RequestError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::NotFound(id) => Self::SessionNotFound(id),
            RegistryError::NotReady(id) => Self::SessionNotReady(id),
        }
    }
}

impl From<ProtocolError> for RequestError {
    fn from(e: ProtocolError) -> Self {
        match e {
            ProtocolError::Cancelled => Self::Cancelled,
            ProtocolError::Timeout(d) => Self::Timeout(d),
            other => Self::Upstream(other.to_string()),
        }
    }
}

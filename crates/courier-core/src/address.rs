//! Network addresses.
//!
//! An [`Address`] names a contact, group, or channel on the messaging network.
//! The canonical string form is `user[.agent][:device]@server`, or just
//! `server` for server-only addresses. Parsing is all-or-nothing: input is
//! either a canonical address or an [`AddressError`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Server of regular user accounts.
pub const USER_SERVER: &str = "s.whatsapp.net";
/// Server of broadcast channels (newsletters).
pub const CHANNEL_SERVER: &str = "newsletter";

const CHANNEL_SUFFIX: &str = "@newsletter";

/// Servers the network is known to route. Anything else is rejected.
pub const KNOWN_SERVERS: &[&str] = &[
    USER_SERVER,
    "g.us",
    "broadcast",
    CHANNEL_SERVER,
    "lid",
    "c.us",
    "call",
    "hosted",
    "hosted.lid",
    "msgr",
    "interop",
    "bot",
];

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address is empty")]
    Empty,
    #[error("address contains whitespace: {0:?}")]
    Whitespace(String),
    #[error("address has more than one '@': {0}")]
    MultipleAt(String),
    #[error("address has an empty user part: {0}")]
    EmptyUser(String),
    #[error("address has an empty server part: {0}")]
    EmptyServer(String),
    #[error("unknown address server: {0}")]
    UnknownServer(String),
    #[error("unexpected number of dots in address: {0}")]
    TooManyDots(String),
    #[error("unexpected number of colons in address: {0}")]
    TooManyColons(String),
    #[error("invalid agent component {component:?} in address {raw}")]
    InvalidAgent { raw: String, component: String },
    #[error("invalid device component {component:?} in address {raw}")]
    InvalidDevice { raw: String, component: String },
}

/// Canonical network address.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    user: String,
    agent: u8,
    device: u16,
    server: String,
}

impl Address {
    /// Parse the canonical wire form.
    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        if raw.is_empty() {
            return Err(AddressError::Empty);
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(AddressError::Whitespace(raw.to_string()));
        }

        let (user_part, server) = match raw.split_once('@') {
            None => ("", raw),
            Some((user, server)) => {
                if server.contains('@') {
                    return Err(AddressError::MultipleAt(raw.to_string()));
                }
                if user.is_empty() {
                    return Err(AddressError::EmptyUser(raw.to_string()));
                }
                (user, server)
            }
        };

        if server.is_empty() {
            return Err(AddressError::EmptyServer(raw.to_string()));
        }
        if !KNOWN_SERVERS.contains(&server) {
            return Err(AddressError::UnknownServer(server.to_string()));
        }

        let (user, agent, device) = split_user(raw, user_part)?;
        Ok(Self {
            user: user.to_string(),
            agent,
            device,
            server: server.to_string(),
        })
    }

    /// Build a plain `user@server` address.
    pub fn new(user: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            agent: 0,
            device: 0,
            server: server.into(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn agent(&self) -> u8 {
        self.agent
    }

    pub fn device(&self) -> u16 {
        self.device
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    /// True for channel (newsletter) addresses. A bare `newsletter` server
    /// address names no channel and is not channel-type.
    pub fn is_channel(&self) -> bool {
        self.server == CHANNEL_SERVER && !self.user.is_empty()
    }
}

/// Whether a raw identifier has the channel-address suffix. Used to route
/// channel lookups between address and invite-code forms without parsing.
pub fn has_channel_suffix(raw: &str) -> bool {
    raw.ends_with(CHANNEL_SUFFIX)
}

fn split_user<'a>(raw: &str, part: &'a str) -> Result<(&'a str, u8, u16), AddressError> {
    let (user, agent, device) = if let Some((user, rest)) = part.split_once('.') {
        if rest.contains('.') {
            return Err(AddressError::TooManyDots(raw.to_string()));
        }
        let (agent, device) = match rest.split_once(':') {
            Some((agent, device)) => (agent, Some(device)),
            None => (rest, None),
        };
        if device.is_some_and(|d| d.contains(':')) {
            return Err(AddressError::TooManyColons(raw.to_string()));
        }
        let agent = parse_number::<u8>(agent).ok_or_else(|| AddressError::InvalidAgent {
            raw: raw.to_string(),
            component: agent.to_string(),
        })?;
        let device = match device {
            Some(d) => parse_device(raw, d)?,
            None => 0,
        };
        (user, agent, device)
    } else if let Some((user, device)) = part.split_once(':') {
        if device.contains(':') {
            return Err(AddressError::TooManyColons(raw.to_string()));
        }
        (user, 0, parse_device(raw, device)?)
    } else {
        (part, 0, 0)
    };

    if user.is_empty() && !part.is_empty() {
        return Err(AddressError::EmptyUser(raw.to_string()));
    }
    Ok((user, agent, device))
}

fn parse_device(raw: &str, component: &str) -> Result<u16, AddressError> {
    parse_number::<u16>(component).ok_or_else(|| AddressError::InvalidDevice {
        raw: raw.to_string(),
        component: component.to_string(),
    })
}

// Digits only: `str::parse` would also take a leading '+'.
fn parse_number<T: FromStr>(s: &str) -> Option<T> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.agent > 0 {
            write!(f, "{}.{}:{}@{}", self.user, self.agent, self.device, self.server)
        } else if self.device > 0 {
            write!(f, "{}:{}@{}", self.user, self.device, self.server)
        } else if !self.user.is_empty() {
            write!(f, "{}@{}", self.user, self.server)
        } else {
            f.write_str(&self.server)
        }
    }
}

impl FromStr for Address {
    type Err = AddressError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Address> for String {
    fn from(a: Address) -> Self {
        a.to_string()
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! opaque_id {
    ($name:ident) => {
        #[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn from_raw(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::convert::Infallible;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.to_owned()))
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

// Session ids are chosen by the caller, never generated here.
opaque_id!(SessionId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_preserves_value() {
        let id = SessionId::from_raw("tenant-a");
        assert_eq!(id.as_str(), "tenant-a");
        assert_eq!(id.to_string(), "tenant-a");
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = SessionId::from_raw("default");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"default\"");
        let parsed: SessionId = serde_json::from_str("\"default\"").unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn parse_is_infallible() {
        let id: SessionId = "".parse().unwrap();
        assert_eq!(id.as_str(), "");
    }
}

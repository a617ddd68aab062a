//! The authenticated caller identity.
//!
//! An identity is the user name the cluster's access-review authority knows
//! the caller by. It is resolved per request by the web layer; an absent
//! identity is modelled as `Option<Identity>::None`, never as an empty name.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when an identity string is not usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdentityError {
    /// The reason the value was rejected.
    pub reason: &'static str,
}

impl fmt::Display for ParseIdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid identity: {}", self.reason)
    }
}

impl std::error::Error for ParseIdentityError {}

/// A non-empty caller name, e.g. `alice@example.com`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Creates an identity, rejecting empty or whitespace-only names.
    ///
    /// The name is kept exactly as given.
    ///
    /// # Errors
    ///
    /// Returns `ParseIdentityError` if the name has no visible characters.
    pub fn new(name: impl Into<String>) -> Result<Self, ParseIdentityError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ParseIdentityError {
                reason: "identity must not be empty",
            });
        }
        Ok(Self(name))
    }

    /// Returns the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Identity {
    type Err = ParseIdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Identity {
    type Error = ParseIdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Identity> for String {
    fn from(identity: Identity) -> Self {
        identity.0
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_keeps_name() {
        let identity = Identity::new("alice").expect("valid identity");
        assert_eq!(identity.as_str(), "alice");
        assert_eq!(identity.to_string(), "alice");
    }

    #[test]
    fn identity_is_not_trimmed() {
        let identity: Identity = " bob@example.com".parse().expect("valid identity");
        assert_eq!(identity.as_str(), " bob@example.com");
    }

    #[test]
    fn identity_keeps_non_ascii_name() {
        let identity = Identity::new("jörg@example.com").expect("valid identity");
        assert_eq!(identity.as_str(), "jörg@example.com");
    }

    #[test]
    fn identity_rejects_empty() {
        assert!(Identity::new("").is_err());
        assert!(Identity::new("   ").is_err());
    }

    #[test]
    fn identity_serde_is_transparent() {
        let identity = Identity::new("alice").expect("valid identity");
        let json = serde_json::to_string(&identity).expect("serialize");
        assert_eq!(json, "\"alice\"");

        let parsed: Identity = serde_json::from_str("\"alice\"").expect("deserialize");
        assert_eq!(parsed, identity);

        assert!(serde_json::from_str::<Identity>("\"\"").is_err());
    }
}

//! Validated email identities keying records in the secret store.

#[cfg(feature = "serde_support")]
use serde::{Deserialize, Serialize};

use core::fmt;
use std::str::FromStr;

/// The candidate string does not look like an email address.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct InvalidIdentity(pub String);

impl std::error::Error for InvalidIdentity {}

impl fmt::Display for InvalidIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" is not a valid email address", self.0)
    }
}

/// An email address accepted as the unique key for one enrollment.
///
/// The format check mirrors `^[^@]+@[^@]+\.[^@]+$`: one `@` separating a
/// non-empty local part from a domain containing at least one dot with
/// something on both sides. Intentionally permissive, nowhere near full
/// rfc-5322, and not a security boundary.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde_support", serde(try_from = "String", into = "String"))]
pub struct Identity(String);

impl Identity {
    /// Validates and wraps a candidate email address.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidIdentity`] when the candidate does not match the
    /// `local@domain.tld` shape.
    pub fn new(candidate: &str) -> Result<Identity, InvalidIdentity> {
        let Some((local, domain)) = candidate.split_once('@') else {
            return Err(InvalidIdentity(candidate.to_string()));
        };
        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(InvalidIdentity(candidate.to_string()));
        }
        // At least one dot in the domain, not dangling at either end.
        if !domain
            .split_once('.')
            .is_some_and(|(head, tail)| !head.is_empty() && !tail.is_empty())
        {
            return Err(InvalidIdentity(candidate.to_string()));
        }
        Ok(Identity(candidate.to_string()))
    }

    /// The validated address as a plain string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Identity {
    type Err = InvalidIdentity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Identity::new(s)
    }
}

impl TryFrom<String> for Identity {
    type Error = InvalidIdentity;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Identity::new(&s)
    }
}

impl From<Identity> for String {
    fn from(identity: Identity) -> String {
        identity.0
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        for ok in ["a@b.com", "alice@example.com", "first.last@sub.domain.org"] {
            assert!(Identity::new(ok).is_ok(), "{} should be accepted", ok);
        }
    }

    #[test]
    fn rejects_shapes_without_at_or_dotted_domain() {
        for bad in [
            "not-an-email",
            "a@b",
            "@b.com",
            "a@",
            "a@@b.com",
            "a@.com",
            "a@b.",
            "",
        ] {
            assert_eq!(
                Identity::new(bad).unwrap_err(),
                InvalidIdentity(bad.to_string()),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn parse_and_display_roundtrip() {
        let identity: Identity = "alice@example.com".parse().unwrap();
        assert_eq!(identity.to_string(), "alice@example.com");
        assert_eq!(identity.as_str(), "alice@example.com");
    }
}

//! Representation of a secret, either raw bytes or base32 text.
//!
//! The external, human-typeable form of a secret is unpadded upper-case
//! [rfc-4648](https://tools.ietf.org/html/rfc4648) base32; that is the form
//! authenticator apps expect inside provisioning URIs. Decoding is
//! case-insensitive and tolerates trailing `=` padding.
//!
//! # Examples
//!
//! ```rust
//! use totp_enroll::Secret;
//!
//! let secret = Secret::Encoded("OBWGC2LOFVZXI4TJNZTS243FMNZGK5BNGEZDG".to_string());
//! let bytes = secret.to_bytes().unwrap();
//! assert_eq!(Secret::Raw(bytes).to_encoded(), secret);
//! ```
//!
//! ```rust
//! use totp_enroll::Secret;
//!
//! // Fresh 160-bit secret for a new enrollment.
//! let secret = Secret::generate();
//! assert_eq!(secret.to_bytes().unwrap().len(), 20);
//! ```

use base32::{self, Alphabet};

use constant_time_eq::constant_time_eq;

/// Number of CSPRNG bytes behind a generated secret, the recommended
/// 160 bits from [rfc-4226](https://www.rfc-editor.org/rfc/rfc4226#section-4).
const GENERATED_SECRET_LEN: usize = 20;

/// Ways base32 decoding can fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A character outside `A`-`Z` / `2`-`7`.
    Alphabet(String),
    /// A length whose bit count is not a whole number of bytes.
    Length(usize),
}

impl std::error::Error for DecodeError {}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Alphabet(s) => {
                write!(f, "\"{}\" contains characters outside the base32 alphabet", s)
            }
            DecodeError::Length(len) => write!(
                f,
                "{} base32 characters do not decode to a whole number of bytes",
                len
            ),
        }
    }
}

/// Encodes bytes to unpadded upper-case base32 text.
pub(crate) fn encode(data: &[u8]) -> String {
    base32::encode(Alphabet::RFC4648 { padding: false }, data)
}

/// Decodes base32 text, case-insensitively, with or without `=` padding.
pub(crate) fn decode(text: &str) -> Result<Vec<u8>, DecodeError> {
    let trimmed = text.trim_end_matches('=');
    // 5 bits per character; remainders 1, 3 and 6 leave dangling bits that
    // no byte string encodes to.
    if matches!(trimmed.len() % 8, 1 | 3 | 6) {
        return Err(DecodeError::Length(trimmed.len()));
    }
    base32::decode(Alphabet::RFC4648 { padding: false }, trimmed)
        .ok_or_else(|| DecodeError::Alphabet(text.to_string()))
}

/// Shared secret between server and authenticator, in raw or encoded form.
#[derive(Debug, Clone, Eq)]
#[cfg_attr(feature = "zeroize", derive(zeroize::Zeroize, zeroize::ZeroizeOnDrop))]
pub enum Secret {
    /// Non-encoded bytes.
    Raw(Vec<u8>),
    /// Base32 text.
    Encoded(String),
}

impl PartialEq for Secret {
    /// Compares the decoded byte forms in constant time, so a `Raw` secret
    /// can equal its `Encoded` counterpart.
    fn eq(&self, other: &Self) -> bool {
        match (self.to_bytes(), other.to_bytes()) {
            (Ok(a), Ok(b)) => constant_time_eq(&a, &b),
            _ => false,
        }
    }
}

impl Default for Secret {
    fn default() -> Self {
        Secret::generate()
    }
}

impl Secret {
    /// The secret as raw bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] when an `Encoded` secret is not valid
    /// base32.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DecodeError> {
        match self {
            Secret::Raw(bytes) => Ok(bytes.clone()),
            Secret::Encoded(text) => decode(text),
        }
    }

    /// Transforms an `Encoded` secret into its `Raw` form.
    pub fn to_raw(&self) -> Result<Self, DecodeError> {
        Ok(Secret::Raw(self.to_bytes()?))
    }

    /// Transforms a `Raw` secret into its unpadded `Encoded` form.
    pub fn to_encoded(&self) -> Self {
        match self {
            Secret::Raw(bytes) => Secret::Encoded(encode(bytes)),
            Secret::Encoded(_) => self.clone(),
        }
    }

    /// The padded `Encoded` form, `=`-filled to a multiple of 8 characters
    /// per [rfc-4648 section 6](https://tools.ietf.org/html/rfc4648#section-6).
    /// Storage and URIs use [`to_encoded`](Secret::to_encoded) instead.
    pub fn to_padded(&self) -> Result<Self, DecodeError> {
        Ok(Secret::Encoded(base32::encode(
            Alphabet::RFC4648 { padding: true },
            &self.to_bytes()?,
        )))
    }

    /// Generates a fresh CSPRNG secret of 160 bits.
    ///
    /// ⚠️ The generated bytes are not guaranteed to be a valid UTF-8
    /// sequence; use [`to_encoded`](Secret::to_encoded) for display.
    pub fn generate() -> Secret {
        use rand::Rng;

        let mut rng = rand::rng();
        let mut secret = [0u8; GENERATED_SECRET_LEN];
        rng.fill(&mut secret[..]);
        Secret::Raw(secret.to_vec())
    }
}

impl std::fmt::Display for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Secret::Raw(bytes) => {
                for b in bytes {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
            Secret::Encoded(text) => write!(f, "{}", text),
        }
    }
}

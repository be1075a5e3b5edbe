//! The thin layer a host calls into: get-or-create a secret for an
//! identity, hand back the provisioning URI, compute and verify codes.
//!
//! Nothing here prints or logs; every failure kind comes back as a
//! distinct [`EnrollError`] variant for the caller to report.

use std::time::SystemTimeError;

use crate::secret::DecodeError;
use crate::store::{AlreadyExists, SecretStore};
use crate::{AccountRecord, ConfigError, Identity, InvalidIdentity, Secret, DEFAULT_WINDOW};

use core::fmt;

/// Ways an enrollment operation can fail. All are local, recoverable
/// conditions; none is fatal to the process.
#[derive(Debug)]
pub enum EnrollError {
    /// The supplied identity is not an email address.
    InvalidIdentity(InvalidIdentity),
    /// A code was requested for an identity that was never enrolled.
    UnknownIdentity(Identity),
    /// The store already holds a record for this identity.
    AlreadyExists(AlreadyExists),
    /// Code parameters out of range.
    Config(ConfigError),
    /// Stored secret material failed base32 decoding.
    Decode(DecodeError),
    /// The system clock is set before the Unix epoch.
    Time(SystemTimeError),
}

impl std::error::Error for EnrollError {}

impl fmt::Display for EnrollError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnrollError::InvalidIdentity(e) => e.fmt(f),
            EnrollError::UnknownIdentity(identity) => {
                write!(f, "\"{}\" is not enrolled", identity)
            }
            EnrollError::AlreadyExists(e) => e.fmt(f),
            EnrollError::Config(e) => e.fmt(f),
            EnrollError::Decode(e) => e.fmt(f),
            EnrollError::Time(e) => e.fmt(f),
        }
    }
}

impl From<InvalidIdentity> for EnrollError {
    fn from(e: InvalidIdentity) -> Self {
        EnrollError::InvalidIdentity(e)
    }
}

impl From<AlreadyExists> for EnrollError {
    fn from(e: AlreadyExists) -> Self {
        EnrollError::AlreadyExists(e)
    }
}

impl From<ConfigError> for EnrollError {
    fn from(e: ConfigError) -> Self {
        EnrollError::Config(e)
    }
}

impl From<DecodeError> for EnrollError {
    fn from(e: DecodeError) -> Self {
        EnrollError::Decode(e)
    }
}

impl From<SystemTimeError> for EnrollError {
    fn from(e: SystemTimeError) -> Self {
        EnrollError::Time(e)
    }
}

/// Composes the store, the code generator and the URI builder behind the
/// two use cases a host has: enroll an identity, and compute or verify its
/// current code.
///
/// # Examples
///
/// ```rust
/// use totp_enroll::{Enrollment, MemoryStore};
///
/// let mut enrollment = Enrollment::new(MemoryStore::new(), "Example");
/// let (record, uri) = enrollment.enroll("alice@example.com").unwrap();
///
/// // Enrolling again returns the same secret, never a second one.
/// let (again, _) = enrollment.enroll("alice@example.com").unwrap();
/// assert_eq!(record, again);
/// # let _ = uri;
/// ```
#[derive(Debug)]
pub struct Enrollment<S> {
    store: S,
    issuer: String,
}

impl<S: SecretStore> Enrollment<S> {
    /// Wraps a store under the issuer label that will appear in
    /// provisioning URIs.
    pub fn new(store: S, issuer: impl Into<String>) -> Enrollment<S> {
        Enrollment {
            store,
            issuer: issuer.into(),
        }
    }

    /// The wrapped store, for hosts that need direct access.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn lookup(&self, raw_identity: &str) -> Result<AccountRecord, EnrollError> {
        let identity = Identity::new(raw_identity)?;
        self.store
            .find(&identity)
            .ok_or(EnrollError::UnknownIdentity(identity))
    }

    /// Returns the record for an identity, creating it on first sight with
    /// a fresh 160-bit secret and default parameters, together with the
    /// provisioning URI to hand to an authenticator.
    ///
    /// Calling this twice for the same identity returns the same record
    /// both times; a second secret is never generated.
    ///
    /// # Errors
    ///
    /// Returns [`EnrollError::InvalidIdentity`] for a malformed email
    /// address. [`EnrollError::AlreadyExists`] can only surface when a
    /// concurrent writer slips a record in between the lookup and the
    /// create; with a single writer it never does.
    pub fn enroll(&mut self, raw_identity: &str) -> Result<(AccountRecord, String), EnrollError> {
        let identity = Identity::new(raw_identity)?;
        let record = match self.store.find(&identity) {
            Some(record) => record,
            None => {
                let secret = Secret::generate().to_bytes()?;
                let record = AccountRecord::with_defaults(identity, secret)?;
                self.store.insert(record.clone())?;
                record
            }
        };
        let uri = record.provisioning_uri(&self.issuer);
        Ok((record, uri))
    }

    /// The code for an enrolled identity at the given timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`EnrollError::UnknownIdentity`] when the identity was
    /// never enrolled; enrollment is an explicit step, not a side effect
    /// of asking for a code.
    pub fn code_at(&self, raw_identity: &str, time: u64) -> Result<String, EnrollError> {
        Ok(self.lookup(raw_identity)?.code_at(time))
    }

    /// The code for an enrolled identity at the current system time.
    pub fn current_code(&self, raw_identity: &str) -> Result<String, EnrollError> {
        let record = self.lookup(raw_identity)?;
        Ok(record.current_code()?)
    }

    /// Checks a candidate code at the given timestamp with the default
    /// one-step window.
    pub fn verify_at(
        &self,
        raw_identity: &str,
        code: &str,
        time: u64,
    ) -> Result<bool, EnrollError> {
        Ok(self
            .lookup(raw_identity)?
            .verify_at(code, time, DEFAULT_WINDOW))
    }

    /// Checks a candidate code at the current system time with the default
    /// one-step window.
    pub fn verify(&self, raw_identity: &str, code: &str) -> Result<bool, EnrollError> {
        let record = self.lookup(raw_identity)?;
        Ok(record.verify_current(code)?)
    }
}

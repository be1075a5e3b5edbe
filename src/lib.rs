//! One-time-password engine for second-factor enrollment.
//!
//! This crate issues and verifies time-based one-time passwords per
//! [rfc-4226](https://tools.ietf.org/html/rfc4226) and
//! [rfc-6238](https://tools.ietf.org/html/rfc6238), keeps per-identity
//! secret material behind the [`SecretStore`] trait, and builds/parses the
//! `otpauth://` provisioning URIs consumed by authenticator apps.
//!
//! Be aware that some authenticator apps will accept the `SHA256`
//! and `SHA512` algorithms but silently fall back to `SHA1`, which
//! makes verification fail due to mismatched algorithms. Stick with
//! `SHA1` unless you control the client.
//!
//! # Examples
//!
//! Enrolling an identity and verifying a code at a fixed timestamp:
//!
//! ```rust
//! use totp_enroll::{Enrollment, MemoryStore};
//!
//! let mut enrollment = Enrollment::new(MemoryStore::new(), "Example");
//! let (record, uri) = enrollment.enroll("alice@example.com").unwrap();
//! assert!(uri.starts_with("otpauth://totp/Example:alice%40example.com?secret="));
//!
//! let code = record.code_at(1_700_000_000);
//! assert!(record.verify_at(&code, 1_700_000_000, 1));
//! ```
//!
//! Driving the generator directly with a known secret:
//!
//! ```rust
//! use totp_enroll::{AccountRecord, Algorithm, Identity};
//!
//! let record = AccountRecord::new(
//!     "alice@example.com".parse::<Identity>().unwrap(),
//!     b"TestSecretSuperSecret".to_vec(),
//!     Algorithm::SHA1,
//!     6,
//!     30,
//! )
//! .unwrap();
//! println!("{}", record.code_at(1_700_000_000));
//! ```

mod config;
mod enroll;
mod identity;
mod secret;
mod store;
mod uri;

pub use config::ConfigError;
pub use enroll::{EnrollError, Enrollment};
pub use identity::{Identity, InvalidIdentity};
pub use secret::{DecodeError, Secret};
pub use store::{AlreadyExists, MemoryStore, SecretStore};
pub use uri::{ParsedUri, UriError};

use constant_time_eq::constant_time_eq;

#[cfg(feature = "serde_support")]
use serde::{Deserialize, Serialize};

use core::fmt;

use hmac::Mac;
use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};

type HmacSha1 = hmac::Hmac<sha1::Sha1>;
type HmacSha256 = hmac::Hmac<sha2::Sha256>;
type HmacSha512 = hmac::Hmac<sha2::Sha512>;

/// Default number of code digits, per [rfc-4226](https://tools.ietf.org/html/rfc4226#section-5.3).
pub const DEFAULT_DIGITS: usize = 6;
/// Default step duration in seconds, per [rfc-6238](https://tools.ietf.org/html/rfc6238#section-5.2).
pub const DEFAULT_PERIOD: u64 = 30;
/// Default verification window, in steps each side of the current one.
pub const DEFAULT_WINDOW: u8 = 1;

/// The three keyed-hash algorithms permitted by the
/// [rfc-6238 reference implementation](https://tools.ietf.org/html/rfc6238#appendix-A).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
pub enum Algorithm {
    SHA1,
    SHA256,
    SHA512,
}

impl Default for Algorithm {
    fn default() -> Self {
        Algorithm::SHA1
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::SHA1 => f.write_str("SHA1"),
            Algorithm::SHA256 => f.write_str("SHA256"),
            Algorithm::SHA512 => f.write_str("SHA512"),
        }
    }
}

impl std::str::FromStr for Algorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SHA1" => Ok(Algorithm::SHA1),
            "SHA256" => Ok(Algorithm::SHA256),
            "SHA512" => Ok(Algorithm::SHA512),
            _ => Err(ConfigError::UnknownAlgorithm(s.to_string())),
        }
    }
}

impl Algorithm {
    fn hash<D>(mut digest: D, data: &[u8]) -> Vec<u8>
    where
        D: Mac,
    {
        digest.update(data);
        digest.finalize().into_bytes().to_vec()
    }

    /// Keyed-hash of `data` under `key`. The digest is 20, 32 or 64 bytes
    /// long for SHA1, SHA256 and SHA512 respectively.
    pub(crate) fn sign(&self, key: &[u8], data: &[u8]) -> Vec<u8> {
        match self {
            Algorithm::SHA1 => Algorithm::hash(HmacSha1::new_from_slice(key).unwrap(), data),
            Algorithm::SHA256 => Algorithm::hash(HmacSha256::new_from_slice(key).unwrap(), data),
            Algorithm::SHA512 => Algorithm::hash(HmacSha512::new_from_slice(key).unwrap(), data),
        }
    }
}

pub(crate) fn system_time() -> Result<u64, SystemTimeError> {
    let t = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    Ok(t)
}

/// The enduring unit of storage: one enrolled identity with its secret and
/// code parameters. The secret is sensitive data, treat it accordingly.
///
/// Records are created once per identity, read on every code request, and
/// never mutated by this crate. The fields only go through the validating
/// constructors, so a record in hand always satisfies the parameter
/// bounds. Rotation and deletion are repository operations callers may
/// layer on top.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
pub struct AccountRecord {
    /// Validated email address keying this record in the store.
    identity: Identity,
    /// Raw (non-encoded) secret. Per [rfc-4226](https://tools.ietf.org/html/rfc4226#section-4)
    /// it should come from a CSPRNG and be at least 128 bits; 160 are recommended.
    secret: Vec<u8>,
    /// SHA-1 is the most widespread choice and the only one every
    /// authenticator app gets right.
    algorithm: Algorithm,
    /// Number of digits composing the code, between 6 and 8.
    digits: usize,
    /// Duration in seconds of a step.
    period: u64,
}

impl PartialEq for AccountRecord {
    /// Identity is not taken into account, only the code parameters.
    /// Secrets are compared in constant time.
    fn eq(&self, other: &Self) -> bool {
        if self.algorithm != other.algorithm {
            return false;
        }
        if self.digits != other.digits {
            return false;
        }
        if self.period != other.period {
            return false;
        }
        constant_time_eq(&self.secret, &other.secret)
    }
}

impl fmt::Display for AccountRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "identity: {}; alg: {}; digits: {}; period: {}",
            self.identity, self.algorithm, self.digits, self.period
        )
    }
}

impl AccountRecord {
    /// Creates a record after validating its code parameters.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when `digits` is outside 6..=8, `period`
    /// is zero, or the secret is shorter than 128 bits.
    pub fn new(
        identity: Identity,
        secret: Vec<u8>,
        algorithm: Algorithm,
        digits: usize,
        period: u64,
    ) -> Result<AccountRecord, ConfigError> {
        config::assert_digits(digits)?;
        config::assert_period(period)?;
        config::assert_secret_length(&secret)?;
        Ok(AccountRecord {
            identity,
            secret,
            algorithm,
            digits,
            period,
        })
    }

    /// Creates a record with the default SHA1 / 6 digits / 30 seconds
    /// parameters every authenticator app supports.
    pub fn with_defaults(
        identity: Identity,
        secret: Vec<u8>,
    ) -> Result<AccountRecord, ConfigError> {
        AccountRecord::new(
            identity,
            secret,
            Algorithm::default(),
            DEFAULT_DIGITS,
            DEFAULT_PERIOD,
        )
    }

    /// The identity keying this record.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The raw secret bytes.
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn digits(&self) -> usize {
        self.digits
    }

    pub fn period(&self) -> u64 {
        self.period
    }

    /// Derives the code for an explicit 64-bit counter, per
    /// [rfc-4226 section 5.3](https://tools.ietf.org/html/rfc4226#section-5.3).
    ///
    /// The counter is packed big-endian into 8 bytes before signing; the
    /// digest is then dynamically truncated to a 31-bit integer and reduced
    /// modulo `10^digits`.
    pub fn hotp(&self, counter: u64) -> String {
        let digest = self.algorithm.sign(&self.secret, &counter.to_be_bytes());
        let offset = (digest.last().unwrap() & 0x0f) as usize;
        let value =
            u32::from_be_bytes(digest[offset..offset + 4].try_into().unwrap()) & 0x7fff_ffff;
        format!(
            "{:0width$}",
            value % 10_u32.pow(self.digits as u32),
            width = self.digits
        )
    }

    /// The step counter for the given timestamp in seconds.
    pub fn counter_at(&self, time: u64) -> u64 {
        time / self.period
    }

    /// Derives the code for the given timestamp in seconds.
    pub fn code_at(&self, time: u64) -> String {
        self.hotp(self.counter_at(time))
    }

    /// Derives the code for the current system time.
    pub fn current_code(&self) -> Result<String, SystemTimeError> {
        let t = system_time()?;
        Ok(self.code_at(t))
    }

    /// Checks a candidate code against the given timestamp, accepting a
    /// drift of `window` steps on each side. Every candidate within the
    /// window is compared in constant time; the first match wins.
    ///
    /// Steps that would reach below counter 0 are skipped, not shifted
    /// forward: near the epoch the window shrinks rather than admitting
    /// extra future counters.
    pub fn verify_at(&self, code: &str, time: u64, window: u8) -> bool {
        let counter = self.counter_at(time);
        for delta in -(window as i64)..=window as i64 {
            let Some(candidate) = counter.checked_add_signed(delta) else {
                continue;
            };
            if constant_time_eq(self.hotp(candidate).as_bytes(), code.as_bytes()) {
                return true;
            }
        }
        false
    }

    /// Checks a candidate code against the current system time with the
    /// default one-step window.
    pub fn verify_current(&self, code: &str) -> Result<bool, SystemTimeError> {
        let t = system_time()?;
        Ok(self.verify_at(code, t, DEFAULT_WINDOW))
    }

    /// The unpadded base32 form of the secret, the one users type into an
    /// authenticator manually.
    pub fn secret_base32(&self) -> String {
        Secret::Raw(self.secret.clone()).to_encoded().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(secret: &[u8], algorithm: Algorithm, digits: usize, period: u64) -> AccountRecord {
        AccountRecord::new(
            "rfc@example.com".parse().unwrap(),
            secret.to_vec(),
            algorithm,
            digits,
            period,
        )
        .unwrap()
    }

    // Appendix D of rfc-4226: 20-byte ASCII secret, counters 0 through 9.
    #[test]
    fn rfc4226_reference_sequence() {
        let r = record(b"12345678901234567890", Algorithm::SHA1, 6, 30);
        let expected = [
            "755224", "287082", "359152", "969429", "338314", "254676", "287922", "162583",
            "399871", "520489",
        ];
        for (counter, code) in expected.iter().enumerate() {
            assert_eq!(r.hotp(counter as u64), *code);
        }
    }

    // Appendix B of rfc-6238. Each algorithm has its own seed length.
    #[test]
    fn rfc6238_sha1_vectors() {
        let r = record(b"12345678901234567890", Algorithm::SHA1, 8, 30);
        assert_eq!(r.code_at(59), "94287082");
        assert_eq!(r.code_at(1111111109), "07081804");
        assert_eq!(r.code_at(1111111111), "14050471");
        assert_eq!(r.code_at(1234567890), "89005924");
        assert_eq!(r.code_at(2000000000), "69279037");
        assert_eq!(r.code_at(20000000000), "65353130");
    }

    #[test]
    fn rfc6238_sha256_vectors() {
        let r = record(
            b"12345678901234567890123456789012",
            Algorithm::SHA256,
            8,
            30,
        );
        assert_eq!(r.code_at(59), "46119246");
        assert_eq!(r.code_at(1111111109), "68084774");
        assert_eq!(r.code_at(1234567890), "91819424");
        assert_eq!(r.code_at(20000000000), "77737706");
    }

    #[test]
    fn rfc6238_sha512_vectors() {
        let r = record(
            b"1234567890123456789012345678901234567890123456789012345678901234",
            Algorithm::SHA512,
            8,
            30,
        );
        assert_eq!(r.code_at(59), "90693936");
        assert_eq!(r.code_at(1111111109), "25091201");
        assert_eq!(r.code_at(1234567890), "93441116");
        assert_eq!(r.code_at(20000000000), "47863826");
    }

    // Unix time 59 with a 30-second period is counter 1. Catches the
    // classic little-endian counter-packing mistake.
    #[test]
    fn counter_packs_big_endian() {
        let r = record(b"12345678901234567890", Algorithm::SHA1, 8, 30);
        assert_eq!(1u64.to_be_bytes(), [0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(r.code_at(59), r.hotp(1));
        assert_ne!(r.code_at(59), r.hotp(1u64.swap_bytes()));
    }

    #[test]
    fn codes_are_zero_padded() {
        let r = record(b"12345678901234567890", Algorithm::SHA1, 8, 30);
        let code = r.code_at(1111111109);
        assert_eq!(code.len(), 8);
        assert!(code.starts_with('0'));
    }

    #[test]
    fn digit_counts_and_defaults() {
        let identity: Identity = "rfc@example.com".parse().unwrap();
        for digits in 0..=10 {
            let made = AccountRecord::new(
                identity.clone(),
                b"12345678901234567890".to_vec(),
                Algorithm::SHA1,
                digits,
                30,
            );
            if (6..=8).contains(&digits) {
                assert!(made.is_ok());
            } else {
                assert_eq!(made.unwrap_err(), ConfigError::InvalidDigits(digits));
            }
        }
        let def = AccountRecord::with_defaults(identity, b"12345678901234567890".to_vec()).unwrap();
        assert_eq!(def.algorithm, Algorithm::SHA1);
        assert_eq!(def.digits, 6);
        assert_eq!(def.period, 30);
    }

    #[test]
    fn rejects_zero_period_and_short_secret() {
        let identity: Identity = "rfc@example.com".parse().unwrap();
        let zero = AccountRecord::new(
            identity.clone(),
            b"12345678901234567890".to_vec(),
            Algorithm::SHA1,
            6,
            0,
        );
        assert_eq!(zero.unwrap_err(), ConfigError::InvalidPeriod(0));
        let short = AccountRecord::new(identity, b"short".to_vec(), Algorithm::SHA1, 6, 30);
        assert_eq!(short.unwrap_err(), ConfigError::SecretTooSmall(40));
    }

    #[test]
    fn verify_accepts_adjacent_steps_within_window() {
        let r = record(b"12345678901234567890", Algorithm::SHA1, 6, 30);
        let now = 1_700_000_015;
        let counter = r.counter_at(now);

        assert!(r.verify_at(&r.hotp(counter), now, 0));
        assert!(r.verify_at(&r.hotp(counter - 1), now, 1));
        assert!(r.verify_at(&r.hotp(counter + 1), now, 1));

        assert!(!r.verify_at(&r.hotp(counter - 1), now, 0));
        assert!(!r.verify_at(&r.hotp(counter + 1), now, 0));
        assert!(!r.verify_at(&r.hotp(counter - 2), now, 1));
        assert!(!r.verify_at(&r.hotp(counter + 2), now, 1));
    }

    #[test]
    fn verify_near_epoch_does_not_underflow() {
        let r = record(b"12345678901234567890", Algorithm::SHA1, 6, 30);
        assert!(r.verify_at(&r.code_at(10), 10, 1));
    }

    // At counter 0 a window of 1 reaches counter 1 at most; the window
    // must shrink at the lower edge, not slide forward over counter 2.
    #[test]
    fn window_clamps_at_epoch_instead_of_shifting() {
        let r = record(b"12345678901234567890", Algorithm::SHA1, 6, 30);
        assert!(r.verify_at(&r.hotp(0), 10, 1));
        assert!(r.verify_at(&r.hotp(1), 10, 1));
        assert!(!r.verify_at(&r.hotp(2), 10, 1));
        assert!(!r.verify_at(&r.hotp(1), 10, 0));
    }

    #[test]
    fn verify_current_roundtrip() {
        let r = record(b"12345678901234567890", Algorithm::SHA1, 6, 30);
        assert!(r.verify_current(&r.current_code().unwrap()).unwrap());
        assert!(!r.verify_current("bogus").unwrap());
    }

    #[test]
    fn digest_lengths_per_algorithm() {
        let key = b"12345678901234567890";
        assert_eq!(Algorithm::SHA1.sign(key, &0u64.to_be_bytes()).len(), 20);
        assert_eq!(Algorithm::SHA256.sign(key, &0u64.to_be_bytes()).len(), 32);
        assert_eq!(Algorithm::SHA512.sign(key, &0u64.to_be_bytes()).len(), 64);
    }

    #[test]
    fn algorithm_names_roundtrip() {
        for alg in [Algorithm::SHA1, Algorithm::SHA256, Algorithm::SHA512] {
            assert_eq!(alg.to_string().parse::<Algorithm>().unwrap(), alg);
        }
        assert!(matches!(
            "MD5".parse::<Algorithm>(),
            Err(ConfigError::UnknownAlgorithm(_))
        ));
    }

    #[test]
    fn comparison_ignores_identity() {
        let a = record(b"12345678901234567890", Algorithm::SHA1, 6, 30);
        let mut b = a.clone();
        b.identity = "other@example.com".parse().unwrap();
        assert_eq!(a, b);
        b.secret = b"12345678901234567891".to_vec();
        assert_ne!(a, b);
    }

    // Parameters are only settable through the validating constructors;
    // the accessors hand back exactly what was validated.
    #[test]
    fn accessors_expose_validated_parameters() {
        let r = record(b"12345678901234567890", Algorithm::SHA1, 6, 30);
        assert_eq!(r.identity().as_str(), "rfc@example.com");
        assert_eq!(r.secret(), b"12345678901234567890");
        assert_eq!(r.algorithm(), Algorithm::SHA1);
        assert_eq!(r.digits(), 6);
        assert_eq!(r.period(), 30);
    }

    #[test]
    fn secret_base32_matches_known_form() {
        let r = record(b"TestSecretSuperSecret", Algorithm::SHA1, 6, 30);
        assert_eq!(r.secret_base32(), "KRSXG5CTMVRXEZLUKN2XAZLSKNSWG4TFOQ");
    }
}

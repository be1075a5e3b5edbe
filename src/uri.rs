//! Building and parsing the `otpauth://` provisioning URI handed to
//! authenticator apps, usually through a QR code.
//!
//! The wire format is consumed by third-party apps and has to be
//! reproduced exactly:
//!
//! `otpauth://totp/<issuer>:<identity>?secret=<base32>&issuer=<issuer>&algorithm=<ALG>&digits=<d>&period=<p>`
//!
//! with issuer and identity percent-encoded and the secret in unpadded
//! base32.

use url::{Host, Url};

use crate::identity::InvalidIdentity;
use crate::secret::{self, DecodeError};
use crate::{AccountRecord, Algorithm, ConfigError, Identity};

use core::fmt;

/// The outcome of parsing a provisioning URI: the reconstructed record
/// plus the issuer label, which is not part of the record itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedUri {
    pub record: AccountRecord,
    pub issuer: Option<String>,
}

/// Ways a provisioning URI can be malformed.
#[derive(Debug, PartialEq)]
pub enum UriError {
    Url(url::ParseError),
    Scheme(String),
    Host(String),
    MissingSecret,
    Secret(String),
    Algorithm(String),
    Digits(String),
    Period(String),
    LabelDecoding(String),
    Identity(InvalidIdentity),
    IssuerMismatch(String, String),
    Config(ConfigError),
}

impl std::error::Error for UriError {}

impl fmt::Display for UriError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UriError::Url(e) => write!(f, "Error parsing URL: {}", e),
            UriError::Scheme(scheme) => {
                write!(f, "Scheme should be otpauth, not \"{}\"", scheme)
            }
            UriError::Host(host) => write!(f, "Host should be totp, not \"{}\"", host),
            UriError::MissingSecret => write!(f, "URI carries no secret parameter"),
            UriError::Secret(secret) => write!(
                f,
                "Secret \"{}\" is not a valid non-padded base32 string",
                secret
            ),
            UriError::Algorithm(algo) => write!(
                f,
                "Algorithm can only be SHA1, SHA256 or SHA512, not \"{}\"",
                algo
            ),
            UriError::Digits(digits) => {
                write!(f, "Could not parse \"{}\" as a number.", digits)
            }
            UriError::Period(period) => {
                write!(f, "Could not parse \"{}\" as a number.", period)
            }
            UriError::LabelDecoding(label) => write!(f, "Couldn't URL decode \"{}\"", label),
            UriError::Identity(e) => e.fmt(f),
            UriError::IssuerMismatch(path_issuer, issuer) => write!(
                f,
                "An issuer \"{}\" could be retrieved from the path, but a different issuer \"{}\" was found in the issuer URL parameter",
                path_issuer, issuer
            ),
            UriError::Config(e) => e.fmt(f),
        }
    }
}

impl From<ConfigError> for UriError {
    fn from(e: ConfigError) -> Self {
        UriError::Config(e)
    }
}

impl From<InvalidIdentity> for UriError {
    fn from(e: InvalidIdentity) -> Self {
        UriError::Identity(e)
    }
}

impl AccountRecord {
    /// Builds the provisioning URI for this record under the given issuer
    /// label.
    ///
    /// Issuer and identity are percent-encoded; the secret is base32
    /// without padding, as authenticator apps expect.
    pub fn provisioning_uri(&self, issuer: &str) -> String {
        let issuer = urlencoding::encode(issuer);
        let identity = urlencoding::encode(self.identity.as_str());
        format!(
            "otpauth://totp/{}:{}?secret={}&issuer={}&algorithm={}&digits={}&period={}",
            issuer,
            identity,
            self.secret_base32(),
            issuer,
            self.algorithm,
            self.digits,
            self.period
        )
    }

    /// Reconstructs a record from a provisioning URI.
    ///
    /// Unknown query parameters are ignored; algorithm, digits and period
    /// fall back to their defaults when absent.
    ///
    /// # Errors
    ///
    /// Returns a [`UriError`] on a wrong scheme or type, a missing or
    /// undecodable `secret`, unparsable parameters, an identity that is
    /// not an email address, or an issuer label that contradicts the
    /// `issuer` parameter.
    pub fn from_uri<S: AsRef<str>>(uri: S) -> Result<ParsedUri, UriError> {
        let url = Url::parse(uri.as_ref()).map_err(UriError::Url)?;
        if url.scheme() != "otpauth" {
            return Err(UriError::Scheme(url.scheme().to_string()));
        }
        match url.host() {
            Some(Host::Domain("totp")) => {}
            Some(host) => return Err(UriError::Host(host.to_string())),
            None => return Err(UriError::Host(String::new())),
        }

        let mut algorithm = Algorithm::default();
        let mut digits = crate::DEFAULT_DIGITS;
        let mut period = crate::DEFAULT_PERIOD;
        let mut secret: Option<Vec<u8>> = None;
        let mut issuer: Option<String> = None;

        let path = url.path().trim_start_matches('/');
        let account_name = if let Some((before, after)) = path.split_once(':') {
            issuer = Some(
                urlencoding::decode(before)
                    .map_err(|_| UriError::LabelDecoding(before.to_string()))?
                    .to_string(),
            );
            after.trim_start_matches(':')
        } else {
            path
        };
        let account_name = urlencoding::decode(account_name)
            .map_err(|_| UriError::LabelDecoding(account_name.to_string()))?
            .to_string();
        let identity = Identity::new(&account_name)?;

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "algorithm" => {
                    algorithm = value
                        .parse()
                        .map_err(|_| UriError::Algorithm(value.to_string()))?;
                }
                "digits" => {
                    digits = value
                        .parse::<usize>()
                        .map_err(|_| UriError::Digits(value.to_string()))?;
                }
                "period" => {
                    period = value
                        .parse::<u64>()
                        .map_err(|_| UriError::Period(value.to_string()))?;
                }
                "secret" => {
                    secret = Some(
                        secret::decode(value.as_ref())
                            .map_err(|_: DecodeError| UriError::Secret(value.to_string()))?,
                    );
                }
                "issuer" => {
                    let param_issuer = value.to_string();
                    if let Some(path_issuer) = &issuer {
                        if path_issuer != &param_issuer {
                            return Err(UriError::IssuerMismatch(
                                path_issuer.clone(),
                                param_issuer,
                            ));
                        }
                    }
                    issuer = Some(param_issuer);
                }
                _ => {}
            }
        }

        let secret = secret.ok_or(UriError::MissingSecret)?;
        let record = AccountRecord::new(identity, secret, algorithm, digits, period)?;
        Ok(ParsedUri { record, issuer })
    }

    /// Renders the provisioning URI as a base64-encoded PNG QR code, ready
    /// to embed in HTML. The image mechanics are entirely
    /// `qrcodegen-image`'s business.
    ///
    /// # Errors
    ///
    /// Returns an error when the URI is too long to fit a QR code or the
    /// PNG encoding fails.
    #[cfg(feature = "qr")]
    #[cfg_attr(docsrs, doc(cfg(feature = "qr")))]
    pub fn provisioning_qr(&self, issuer: &str) -> Result<String, String> {
        qrcodegen_image::draw_base64(&self.provisioning_uri(issuer))
    }
}

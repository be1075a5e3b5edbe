/// Code parameters are not compliant to
/// [rfc-4226](https://tools.ietf.org/html/rfc4226) /
/// [rfc-6238](https://tools.ietf.org/html/rfc6238).
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ConfigError {
    /// Implementations MUST extract a 6-digit code at a minimum and
    /// possibly 7 and 8-digit codes.
    InvalidDigits(usize),
    /// A zero-length step would make the counter undefined.
    InvalidPeriod(u64),
    /// The length of the shared secret MUST be at least 128 bits.
    SecretTooSmall(usize),
    /// Only SHA1, SHA256 and SHA512 are negotiated.
    UnknownAlgorithm(String),
}

impl std::error::Error for ConfigError {}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidDigits(digits) => write!(
                f,
                "Implementations MUST extract a 6-digit code at a minimum and possibly 7 and 8-digit code. {} digits is not allowed",
                digits
            ),
            ConfigError::InvalidPeriod(period) => {
                write!(f, "Period must be a positive number of seconds, not {}", period)
            }
            ConfigError::SecretTooSmall(bits) => write!(
                f,
                "The length of the shared secret MUST be at least 128 bits. {} bits is not enough",
                bits
            ),
            ConfigError::UnknownAlgorithm(name) => write!(
                f,
                "Algorithm can only be SHA1, SHA256 or SHA512, not \"{}\"",
                name
            ),
        }
    }
}

pub(crate) fn assert_digits(digits: usize) -> Result<(), ConfigError> {
    if !(6..=8).contains(&digits) {
        Err(ConfigError::InvalidDigits(digits))
    } else {
        Ok(())
    }
}

pub(crate) fn assert_period(period: u64) -> Result<(), ConfigError> {
    if period == 0 {
        Err(ConfigError::InvalidPeriod(period))
    } else {
        Ok(())
    }
}

pub(crate) fn assert_secret_length(secret: &[u8]) -> Result<(), ConfigError> {
    if secret.len() < 16 {
        Err(ConfigError::SecretTooSmall(secret.len() * 8))
    } else {
        Ok(())
    }
}

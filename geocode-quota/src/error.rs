use chrono::{DateTime, Utc};
use thiserror::Error;

/// Generic error type returned by [`Transport`](crate::Transport) and
/// [`StateStore`](crate::StateStore) implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A `Result` typedef to use with the [`BoxError`] type
pub type Result<T> = std::result::Result<T, BoxError>;

/// Errors surfaced by [`GeocodeClient`](crate::GeocodeClient).
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GeocodeError {
    /// The daily quota is exhausted until `reset_at`.
    #[error("the maximum daily queries have been exceeded, the limit will be reset at {reset_at}")]
    QuotaExceeded {
        /// Instant after which requests are admitted again
        reset_at: DateTime<Utc>,
    },
    /// The outbound call failed at the network layer (or timed out).
    #[error("error geocoding address: {0}")]
    Transport(#[source] BoxError),
    /// The response body did not match the expected schema.
    #[error("error decoding geocoder result: {0}")]
    Decode(#[from] serde_json::Error),
    /// Durable state could not be read or written.
    #[error("error persisting geocoder state: {0}")]
    Persistence(#[source] BoxError),
    /// No usable API credential could be obtained.
    #[error("error acquiring API credential: {0}")]
    Credential(String),
    /// The configured reset timezone is not a known IANA name.
    #[error("unknown timezone '{0}', needed to compute quota resets")]
    InvalidTimezone(String),
}

impl GeocodeError {
    /// Returns true if this is a [`GeocodeError::QuotaExceeded`] error
    #[must_use]
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }

    /// The quota reset instant, if this error carries one
    #[must_use]
    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::QuotaExceeded { reset_at } => Some(*reset_at),
            _ => None,
        }
    }

    /// Returns true for errors that leave the rate-limit guarantees
    /// unenforceable for the rest of the process.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}

/// A single field of a persisted state record that failed to parse.
///
/// Loading continues with the field's zero value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line} ({field}): {message}")]
pub struct FieldError {
    /// One-based line number in the record
    pub line: usize,
    /// Name of the field on that line
    pub field: &'static str,
    /// Description of the parse failure
    pub message: String,
}

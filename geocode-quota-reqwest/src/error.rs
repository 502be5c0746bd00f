use std::fmt;

/// Error type for a geocoding response with a non-success HTTP status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadStatus(pub u16);

impl fmt::Display for BadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "geocoder responded with HTTP status {}", self.0)
    }
}

impl std::error::Error for BadStatus {}

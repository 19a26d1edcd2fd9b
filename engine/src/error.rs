//! Error types for the canopy engine.

use thiserror::Error;

/// All possible errors from the canopy engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Lookup errors
    #[error("record not found: {0}")]
    RecordNotFound(String),

    #[error("resource has never been stored: {0}")]
    MissingResource(String),

    // Identity errors
    #[error("record has neither an id nor a guid")]
    MissingIdentity,

    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    // Data errors
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    // Configuration and state errors
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::RecordNotFound("42".into());
        assert_eq!(err.to_string(), "record not found: 42");

        let err = Error::MissingResource("7_/projects".into());
        assert_eq!(err.to_string(), "resource has never been stored: 7_/projects");

        let err = Error::MissingIdentity;
        assert_eq!(err.to_string(), "record has neither an id nor a guid");
    }
}

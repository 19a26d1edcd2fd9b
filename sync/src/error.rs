//! Unified error handling for the sync runtime.

use thiserror::Error;

/// Failure of a single remote fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("remote returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

/// Runtime error type.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("engine error: {0}")]
    Engine(#[from] canopy_engine::Error),

    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("no active session")]
    NoSession,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for the runtime.
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_engine_errors() {
        let err: SyncError = canopy_engine::Error::RecordNotFound("9".into()).into();
        assert_eq!(err.to_string(), "engine error: record not found: 9");
        assert!(matches!(
            err,
            SyncError::Engine(canopy_engine::Error::RecordNotFound(_))
        ));
    }

    #[test]
    fn status_display() {
        let err = FetchError::Status {
            status: 503,
            url: "http://remote/projects".into(),
        };
        assert_eq!(err.to_string(), "remote returned 503 for http://remote/projects");
    }
}

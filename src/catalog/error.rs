// src/catalog/error.rs
use thiserror::Error;

/// Failure fetching or decoding one upstream source.
///
/// Recorded per source by the aggregator; a `SourceError` is never fatal to
/// the whole request.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),

    #[error("unexpected payload: {0}")]
    Schema(String),
}

impl SourceError {
    pub fn schema(msg: impl Into<String>) -> Self {
        SourceError::Schema(msg.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, SourceError::Transport(msg) if msg.contains("timed out"))
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SourceError::Transport(format!("request timed out: {e}"))
        } else if e.is_decode() {
            SourceError::Schema(e.to_string())
        } else {
            SourceError::Transport(e.to_string())
        }
    }
}

/// Caller-input rejection. Raised before any upstream call is made and is
/// the only error that fails the whole request.
#[derive(Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("query must be at least {min} characters long")]
    QueryTooShort { min: usize },
}

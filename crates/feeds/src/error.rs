//! Error types for quote lookups.

use thiserror::Error;

/// Errors that can occur while fetching quotes.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("price source returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("failed to parse response: {0}")]
    Parse(String),
}

impl FeedError {
    /// True when the failure was a request timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, FeedError::Request(e) if e.is_timeout())
    }
}

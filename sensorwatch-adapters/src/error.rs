//! Error types for adapters.

use thiserror::Error;

/// Errors that can occur when collecting telemetry from adapters.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Failed to parse a payload (malformed or misaligned response).
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// Missing or invalid configuration. Terminal for the adapter: the
    /// next poll tick will not fix it, so callers should not retry.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AdapterError {
    /// True for errors that no retry can resolve.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AdapterError::Config(_))
    }
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AdapterError::Timeout
        } else if err.is_connect() {
            AdapterError::Connection(err.to_string())
        } else {
            AdapterError::Http(err.to_string())
        }
    }
}

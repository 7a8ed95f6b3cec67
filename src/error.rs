//! Error types for the fetch/cache layer.

use thiserror::Error;

/// Unified error type for fetch and cache operations.
///
/// Nothing here is fatal to the process: pool jobs catch these at the job
/// boundary and convert them into error deliveries for the consumer.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Scryfall returned a structured error response
    #[error("{code}: {details}")]
    Api { code: String, details: String },

    /// HTTP error status without a parseable error body
    #[error("HTTP error: {0}")]
    HttpStatus(reqwest::StatusCode),

    /// Failed to parse a JSON response or cache entry
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Fetched bytes are not a recognizable image
    #[error("image decode error: {0}")]
    Decode(String),
}

impl FetchError {
    /// True for errors where a later retry (via re-navigation) could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::Network(_) | FetchError::HttpStatus(_) | FetchError::Api { .. }
        )
    }
}

/// Result type alias for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;

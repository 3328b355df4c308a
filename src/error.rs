//! Error types for gator.

use thiserror::Error;

/// Common error type for gator.
#[derive(Error, Debug)]
pub enum GatorError {
    /// Configuration error (bad config file, invalid interval).
    ///
    /// These are only raised at startup, before the aggregation loop runs.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or migration error.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Store operation error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Feed fetch error.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The background aggregation task panicked or was aborted.
    #[error("aggregator task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<sqlx::Error> for GatorError {
    fn from(e: sqlx::Error) -> Self {
        GatorError::Database(e.to_string())
    }
}

/// Error returned by the feed and post stores.
///
/// A duplicate post URL is not an error; see [`crate::rss::InsertOutcome`].
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying database failure.
    #[error("store error: {0}")]
    Database(#[from] sqlx::Error),

    /// The referenced record does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// A stored value could not be decoded.
    #[error("invalid stored data: {0}")]
    InvalidData(String),
}

/// Error returned by a single feed fetch.
#[derive(Error, Debug)]
pub enum FetchError {
    /// URL rejected before any request was made.
    #[error("invalid feed URL: {0}")]
    InvalidUrl(String),

    /// Transport failure: DNS, connection refused, timeout, truncated body.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response status was not 2xx.
    #[error("unexpected HTTP status: {0}")]
    HttpStatus(reqwest::StatusCode),

    /// Response exceeded the configured size limit.
    #[error("feed too large: {size} bytes (max {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    /// Body is not RSS markup.
    #[error("failed to parse feed: {0}")]
    Parse(String),
}

/// Result type alias for gator operations.
pub type Result<T> = std::result::Result<T, GatorError>;

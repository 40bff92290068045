//! Error types for article-checker.
//!
//! One `thiserror` enum per layer. Lower layers convert upward with `#[from]`;
//! the run loop decides which failures are fatal.

use std::time::Duration;

/// Failures talking to an HTTP API (metrics lookup or gist).
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// Connection, DNS or TLS failure.
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered 429.
    #[error("Rate limited by API, retry after {retry_after:?}")]
    RateLimited {
        /// Wait requested by the server, or the default.
        retry_after: Duration,
    },

    /// The API answered 404.
    #[error("Not found: {resource}")]
    NotFound {
        /// Response body, usually naming what is missing.
        resource: String,
    },

    /// The API answered 400.
    #[error("Request rejected: {message}")]
    BadRequest {
        /// Why the request was rejected.
        message: String,
    },

    /// No response within the configured timeout.
    #[error("No response within {0:?}")]
    Timeout(Duration),

    /// Body was not the expected JSON.
    #[error("Unreadable response body: {0}")]
    Parse(#[from] serde_json::Error),

    /// The API answered 5xx.
    #[error("API server error {status}: {message}")]
    Server {
        /// Status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// Any other non-success status.
    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus {
        /// Status code.
        status: u16,
        /// Response body.
        message: String,
    },
}

impl ClientError {
    /// 429 with a wait in seconds.
    #[must_use]
    pub fn rate_limited(wait_secs: u64) -> Self {
        Self::RateLimited { retry_after: Duration::from_secs(wait_secs) }
    }

    /// 404 with the response body.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound { resource: resource.into() }
    }

    /// 400 with the response body.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest { message: message.into() }
    }

    /// 5xx with the response body.
    #[must_use]
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server { status, message: message.into() }
    }

    /// Map a transport error, keeping timeouts distinguishable.
    #[must_use]
    pub fn from_transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() { Self::Timeout(timeout) } else { Self::Http(err) }
    }

    /// Whether the failure is likely to clear up on a later run.
    ///
    /// Nothing in this crate retries; the flag only picks the log level.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Server { .. } | Self::Timeout(_))
    }

    /// Server-requested wait, for 429 only.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        if let Self::RateLimited { retry_after } = self { Some(*retry_after) } else { None }
    }
}

/// Errors from the persistence backends.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// Remote store request failed
    #[error("Remote store error: {0}")]
    Client(#[from] ClientError),

    /// Local file could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Local file is not valid JSON for the record type
    #[error("Malformed cache file: {0}")]
    Json(#[from] serde_json::Error),

    /// Tabular document could not be parsed
    #[error("Malformed tabular data: {0}")]
    Malformed(String),
}

impl StoreError {
    /// Create a malformed-data error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }
}

/// Errors raised while assembling the startup configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that failed to open
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid YAML
    #[error("Invalid feeds configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A required value is missing
    #[error("Missing required configuration: {0}")]
    Missing(&'static str),

    /// A value is present but unusable
    #[error("Invalid value for '{field}': {message}")]
    Invalid {
        /// Offending setting
        field: String,
        /// Why it was rejected
        message: String,
    },
}

impl ConfigError {
    /// Create an invalid-value error.
    #[must_use]
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid { field: field.into(), message: message.into() }
    }
}

/// Errors from fetching or parsing a feed.
#[derive(thiserror::Error, Debug)]
pub enum FeedError {
    /// Feed could not be downloaded
    #[error("Failed to fetch feed: {0}")]
    Http(#[from] reqwest::Error),

    /// Feed server answered with a non-success status
    #[error("Feed returned status {0}")]
    Status(u16),

    /// Feed body is not RSS/Atom
    #[error("Failed to parse feed: {0}")]
    Parse(#[from] feed_rs::parser::ParseFeedError),
}

/// Errors from mail delivery.
#[derive(thiserror::Error, Debug)]
pub enum NotifyError {
    /// Sender or recipient address is malformed
    #[error("Invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// Message could not be assembled
    #[error("Failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    /// SMTP exchange failed
    #[error("SMTP error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

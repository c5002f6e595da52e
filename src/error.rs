//! Error types for sprite-harvest
//!
//! Two layers of failure exist:
//! - [`Error`] covers conditions that abort an operation outright (bad
//!   configuration, an unreachable catalog page, a report that cannot be written).
//! - [`DownloadFailure`] classifies a single failed fetch attempt inside the
//!   downloader. These never escape as errors; they are retried and finally
//!   demoted to a failed [`DownloadOutcome`](crate::types::DownloadOutcome).

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for sprite-harvest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for sprite-harvest
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "maxConcurrent")
        key: Option<String>,
    },

    /// A page could not be retrieved (network failure, timeout or non-2xx status)
    #[error("failed to fetch {url}: {reason}")]
    Fetch {
        /// The URL that was requested
        url: String,
        /// Why the fetch failed
        reason: String,
    },

    /// Network error raised while building or using the HTTP client
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Build a configuration error tied to a specific key
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

/// Why a single download attempt failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DownloadFailure {
    /// Connection could not be established or was dropped
    #[error("network error: {0}")]
    Network(String),

    /// Request did not complete within the configured timeout
    #[error("request timed out")]
    Timeout,

    /// Server answered with a non-2xx status
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    /// Response was not an image (usually an HTML error page served by the CDN)
    #[error("non-image response")]
    NonImage {
        /// The declared content type, if any
        content_type: Option<String>,
    },

    /// Response body could not be read
    #[error("failed to read response body: {0}")]
    Body(String),

    /// Bytes could not be persisted to the destination
    #[error("failed to write {path}: {reason}")]
    Write {
        /// Destination that could not be written
        path: PathBuf,
        /// Underlying I/O error text
        reason: String,
    },
}

impl From<reqwest::Error> for DownloadFailure {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            DownloadFailure::Timeout
        } else if let Some(status) = e.status() {
            DownloadFailure::HttpStatus(status.as_u16())
        } else if e.is_body() || e.is_decode() {
            DownloadFailure::Body(e.to_string())
        } else {
            DownloadFailure::Network(e.to_string())
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_image_failure_reads_as_non_image_response() {
        let failure = DownloadFailure::NonImage {
            content_type: Some("text/html; charset=utf-8".to_string()),
        };
        assert_eq!(failure.to_string(), "non-image response");
    }

    #[test]
    fn config_error_carries_key() {
        let err = Error::config("maxConcurrent", "must be at least 1");
        match &err {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("maxConcurrent")),
            other => panic!("unexpected variant: {other:?}"),
        }
        assert_eq!(err.to_string(), "configuration error: must be at least 1");
    }

    #[test]
    fn fetch_error_names_url() {
        let err = Error::Fetch {
            url: "https://example.com/catalog/".to_string(),
            reason: "HTTP status 503".to_string(),
        };
        assert!(err.to_string().contains("https://example.com/catalog/"));
        assert!(err.to_string().contains("503"));
    }
}

//! Error types for the xvenue-state crate.
//!
//! This module defines the errors surfaced by the book synchronizer and the
//! position reconciler. Sequence gaps and missing data are local, non-fatal
//! conditions; poll failures are retried inside the reconciler and only
//! escape as [`Error::PollExhausted`].

use thiserror::Error as ThisError;

use crate::types::Venue;

/// The main error type for this crate
#[derive(Debug, ThisError)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration (missing fields, bad format)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Venue API returned an error response
    #[error("API error ({}): {}", .0.status, .0.message)]
    Api(ApiError),

    /// Rate limit exceeded
    #[error("Rate limited{}", retry_suffix(.retry_after_ms))]
    RateLimited {
        /// Retry after this many milliseconds
        retry_after_ms: Option<u64>,
    },

    /// Book delta arrived out of order or duplicated
    #[error("Sequence gap: current offset {current}, got {got}")]
    SequenceGap {
        /// Offset the book currently holds
        current: u64,
        /// Offset carried by the rejected delta
        got: u64,
    },

    /// Delta arrived before the initial snapshot
    #[error("Order book has not received its snapshot")]
    BookNotReady,

    /// A derived value needs data the book does not have
    #[error("Missing data: {0}")]
    MissingData(&'static str),

    /// A venue collaborator was never configured
    #[error("{0} client is not initialized")]
    NotInitialized(Venue),

    /// Response body was empty or lacked the expected structure
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The venue trading client reported a failure
    #[error("{venue} client error: {message}")]
    VenueClient {
        /// Venue whose client failed
        venue: Venue,
        /// Failure reported by the client
        message: String,
    },

    /// Blocking worker task panicked or was cancelled
    #[error("Worker task failed: {0}")]
    Worker(String),

    /// All poll attempts for a venue failed
    #[error("{venue} position poll failed after {attempts} attempts")]
    PollExhausted {
        /// Venue that could not be polled
        venue: Venue,
        /// Number of attempts made
        attempts: u32,
    },
}

fn retry_suffix(retry_after_ms: &Option<u64>) -> String {
    retry_after_ms
        .map(|ms| format!(", retry after {}ms", ms))
        .unwrap_or_default()
}

/// Error returned by a venue API
#[derive(Debug, Clone)]
pub struct ApiError {
    /// HTTP status code
    pub status: u16,
    /// Error code from API (if provided)
    pub code: Option<String>,
    /// Error message
    pub message: String,
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Worker(err.to_string())
    }
}

impl ApiError {
    /// Create a new API error
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            code: None,
            message: message.into(),
        }
    }

    /// Create an API error with an error code
    pub fn with_code(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

impl Error {
    /// Whether a poll that failed with this error may succeed if retried
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Http(_)
                | Error::Json(_)
                | Error::Api(_)
                | Error::RateLimited { .. }
                | Error::MalformedResponse(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = Error::Api(ApiError::new(400, "Bad request"));
        assert!(err.to_string().contains("400"));
        assert!(err.to_string().contains("Bad request"));
    }

    #[test]
    fn test_rate_limited_display() {
        let err = Error::RateLimited {
            retry_after_ms: Some(1000),
        };
        assert!(err.to_string().contains("1000"));
        let err = Error::RateLimited {
            retry_after_ms: None,
        };
        assert_eq!(err.to_string(), "Rate limited");
    }

    #[test]
    fn test_sequence_gap() {
        let err = Error::SequenceGap { current: 5, got: 5 };
        assert_eq!(err.to_string(), "Sequence gap: current offset 5, got 5");
    }

    #[test]
    fn test_poll_exhausted_display() {
        let err = Error::PollExhausted {
            venue: Venue::Lighter,
            attempts: 10,
        };
        assert_eq!(
            err.to_string(),
            "lighter position poll failed after 10 attempts"
        );
        assert!(!err.is_transient());
    }

    #[test]
    fn test_transient_classification() {
        assert!(Error::MalformedResponse("empty body".into()).is_transient());
        assert!(Error::Api(ApiError::with_code(503, "busy", "try later")).is_transient());
        assert!(!Error::MissingData("ask").is_transient());
        assert!(!Error::NotInitialized(Venue::Paradex).is_transient());
    }
}

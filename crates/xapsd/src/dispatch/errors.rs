//! Errors raised while handing registrations to the daemon.

use thiserror::Error;

/// Synchronous submission failures.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The dispatcher no longer accepts work because the service is stopping.
    #[error("dispatcher is closed")]
    Closed,
    /// The payload could not be serialised.
    #[error("failed to encode registration payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Failures reported by a transport after submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The configured HTTP timeout elapsed.
    #[error("registration request timed out")]
    Timeout,
    /// The request could not be sent or the connection failed.
    #[error("registration request failed: {message}")]
    Request {
        /// Client error text.
        message: String,
    },
    /// The response body could not be read.
    #[error("failed to read daemon response: {message}")]
    Body {
        /// Client error text.
        message: String,
    },
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {message}")]
    Client {
        /// Builder error text.
        message: String,
    },
}

impl TransportError {
    /// Classifies a `reqwest` error raised while sending.
    #[must_use]
    pub fn from_request(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else {
            Self::Request {
                message: error.to_string(),
            }
        }
    }

    /// Classifies a `reqwest` error raised while reading the body.
    #[must_use]
    pub fn from_body(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else {
            Self::Body {
                message: error.to_string(),
            }
        }
    }
}

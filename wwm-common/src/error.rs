//! Common error types for WWM

use thiserror::Error;

/// Common result type for WWM operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the WWM crates
///
/// Pull-path failures (snapshot loads, correction round trips) surface to the
/// caller as one of these. Push-path payload failures are logged and dropped
/// by the stream client and never reach the reconciler.
#[derive(Error, Debug)]
pub enum Error {
    /// Request could not be sent, the connection failed, or the backend
    /// answered with a non-success status
    #[error("Transport error: {message}")]
    Transport {
        /// HTTP status when the backend answered at all
        status: Option<u16>,
        message: String,
    },

    /// Request exceeded the configured timeout
    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    /// Response or push body failed shape validation
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (engine stopped, task panicked)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a transport error without a status code
    pub fn transport(message: impl Into<String>) -> Self {
        Error::Transport {
            status: None,
            message: message.into(),
        }
    }

    /// Build a transport error for a non-success HTTP status
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Error::Transport {
            status: Some(status),
            message: message.into(),
        }
    }

    /// True for request failures, including timeouts
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. } | Error::Timeout(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::MalformedPayload(e.to_string())
    }
}

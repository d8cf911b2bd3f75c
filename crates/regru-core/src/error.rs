//! Error types for the REG.RU client
//!
//! This module defines all error types used throughout the crate.
//!
//! Protocol-level failures (the registrar answered, but said "no") are NOT
//! errors: they come back as an [`ApiResponse`](crate::ApiResponse) with
//! `success == false`. Everything in here stops the call.

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Classification of a failed connection attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionFailure {
    /// The remote server refused the connection
    Refused,
    /// The remote server reset the connection
    Reset,
    /// The remote server dropped the connection mid-response
    Dropped,
    /// Connection establishment or response read exceeded its timeout
    TimedOut,
    /// Any other connection-level failure
    Other,
    /// The request failed outside the connection layer (TLS validation,
    /// malformed URL, client setup); never retried
    Request,
}

impl ConnectionFailure {
    /// Whether this failure may be retried outside of retry-safe mode
    pub fn is_retriable(self) -> bool {
        matches!(self, ConnectionFailure::Refused)
    }

    /// Whether the failure happened at the connection level
    ///
    /// Only connection-level failures are eligible in retry-safe mode.
    pub fn is_connection_level(self) -> bool {
        !matches!(self, ConnectionFailure::Request)
    }

    /// Human-readable description of the failure
    pub fn describe(self) -> &'static str {
        match self {
            ConnectionFailure::Refused => "The remote server refused the connection",
            ConnectionFailure::Reset => "The remote server reset the connection",
            ConnectionFailure::Dropped => "The remote server dropped the connection",
            ConnectionFailure::TimedOut => "The connection to the remote server timed out",
            ConnectionFailure::Other => "The connection to the remote server failed",
            ConnectionFailure::Request => "The request to the remote server failed",
        }
    }
}

impl std::fmt::Display for ConnectionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.describe())
    }
}

/// Failure of a single transport attempt
///
/// Produced by [`Transport`](crate::traits::Transport) implementations and
/// consumed by the retry loop, which decides whether another attempt is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct TransportError {
    /// What went wrong
    pub kind: ConnectionFailure,
    /// Underlying detail from the HTTP stack
    pub message: String,
}

impl TransportError {
    /// Create a new transport error
    pub fn new(kind: ConnectionFailure, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Connection refused (the only retriable kind)
    pub fn refused(message: impl Into<String>) -> Self {
        Self::new(ConnectionFailure::Refused, message)
    }

    /// Whether this failure may be retried outside of retry-safe mode
    pub fn is_retriable(&self) -> bool {
        self.kind.is_retriable()
    }

    /// Whether the failure happened at the connection level
    pub fn is_connection_level(&self) -> bool {
        self.kind.is_connection_level()
    }
}

/// Core error type for the REG.RU client
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (missing trust anchor, credentials, key password)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A method-required argument was missing or malformed
    #[error("Invalid argument: {0}")]
    InvalidInput(String),

    /// Connection-level failure after the retry policy gave up
    #[error("Connection error ({kind:?}): {message}")]
    Connection {
        /// Classification of the last failed attempt
        kind: ConnectionFailure,
        /// Error message
        message: String,
    },

    /// The registrar rejected the caller's source IP address
    #[error(
        "Access denied from this IP address ({detail}). Add it to the allowed list in the \
         REG.RU account: Settings => Security settings => Account access restrictions"
    )]
    AccessDenied {
        /// Raw `error_params` returned by the registrar
        detail: String,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors that are not connection failures
    #[error("HTTP error: {0}")]
    Http(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an access-denied error
    pub fn access_denied(detail: impl Into<String>) -> Self {
        Self::AccessDenied {
            detail: detail.into(),
        }
    }

    /// Whether this error is a connection failure
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection { .. })
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        if !err.is_connection_level() {
            return Self::Http(err.message);
        }

        Self::Connection {
            kind: err.kind,
            message: err.message,
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

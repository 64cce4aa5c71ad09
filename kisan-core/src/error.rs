//! Error types for the Kisan Mitra client

use thiserror::Error;

/// The main error type for chat client operations
#[derive(Error, Debug)]
pub enum Error {
    /// Network or server failure on any backend call
    #[error("Remote unavailable ({operation}): {reason}")]
    RemoteUnavailable {
        /// Backend operation that failed
        operation: &'static str,
        /// Transport or server reason
        reason: String,
    },

    /// Session selection referenced an unknown id
    #[error("Not found: {0}")]
    NotFound(String),

    /// Send attempted with blank text or without an active session
    #[error("Empty input")]
    EmptyInput,

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a `RemoteUnavailable` error for a backend operation
    pub fn remote(operation: &'static str, reason: impl ToString) -> Self {
        Error::RemoteUnavailable {
            operation,
            reason: reason.to_string(),
        }
    }
}

/// A specialized Result type for chat client operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

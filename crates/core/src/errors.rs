//! Core error types for the Tally engine.
//!
//! This module defines backend-agnostic error types. Collaborators (query stores,
//! change feeds, identity providers) report failures as [`DataError`] so the
//! classifier can work on structure instead of on message text.

use std::time::Duration;

use chrono::ParseError as ChronoParseError;
use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Data operation failed: {0}")]
    Data(#[from] DataError),

    #[error("Authentication required: {0}")]
    Auth(String),

    #[error("Input validation failed: {0}")]
    Validation(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Failure reported by a data collaborator.
///
/// Backends should map their transport and query failures into the typed
/// variants. `Other` exists for errors that arrive as plain text (for example
/// from a foreign client library) and is classified by message inspection.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    /// The request never reached the store or the connection dropped.
    #[error("Network error: {0}")]
    Network(String),

    /// A bounded operation exceeded its deadline.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// No authenticated identity is available for the request.
    #[error("No authenticated user")]
    Unauthenticated,

    /// The store rejected a well-formed request.
    #[error("Query failed ({code}): {message}")]
    Query { code: String, message: String },

    /// Untyped failure text.
    #[error("{0}")]
    Other(String),
}

impl DataError {
    /// Convenience constructor for query rejections.
    pub fn query(code: impl Into<String>, message: impl Into<String>) -> Self {
        DataError::Query {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<ChronoParseError> for Error {
    fn from(err: ChronoParseError) -> Self {
        Error::Validation(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(err.to_string())
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}

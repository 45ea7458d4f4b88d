//! Error types and HTTP response conversion
//!
//! Every failure in the request spine is an [`Error`]. Guards and the query
//! engine raise the classes they understand (`InvalidId`, `Unauthorized`,
//! `Forbidden`, `NotFound`); storage failures travel upward untouched as
//! [`Error::Storage`] and are only classified once, by the
//! [`ErrorTranslator`](crate::translator::ErrorTranslator).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::query::StorageError;
use crate::translator::ErrorTranslator;

/// Message used for malformed identifiers, from the guard or the store
pub const INVALID_ID_MESSAGE: &str = "Invalid ID Format";

/// Result type alias using the service error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the service
///
/// Large error variants are boxed to reduce stack size
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Token decoding or signature verification failed
    #[error("JWT error: {0}")]
    Jwt(Box<jsonwebtoken::errors::Error>),

    /// Path identifier does not match the storage identifier grammar
    #[error("{}", INVALID_ID_MESSAGE)]
    InvalidId,

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Authentication error
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Authorization error
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource or page not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Failure raised by the backing collection
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Failure raised by the file-upload collaborator
    #[error("Upload error: {0}")]
    Upload(String),

    /// A handler chose the status code explicitly
    #[error("{message}")]
    Status {
        /// Status code set by the handler
        status: StatusCode,
        /// Message reported to the client
        message: String,
    },

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl Error {
    /// Build an error carrying an explicit status code
    pub fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Production-safe rendering; the translator layer upgrades it with a
        // diagnostic trace when the service is not in production.
        ErrorTranslator::production().render(&self)
    }
}

// Manual From implementations for boxed errors
impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Error::Jwt(Box::new(err))
    }
}

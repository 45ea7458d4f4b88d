//! Storage error types
//!
//! Failures raised by a [`Collection`](super::Collection) implementation.
//! The query engine never inspects them; they travel upward unchanged inside
//! [`Error::Storage`](crate::error::Error::Storage) and are classified once by
//! the error translator.
//!
//! # Example
//!
//! ```rust
//! use catalog_service::query::{StorageError, StorageErrorKind, StorageOperation};
//!
//! let error = StorageError::malformed_id(StorageOperation::Find, "abc");
//! assert_eq!(error.kind, StorageErrorKind::MalformedId);
//! ```

use std::fmt;

/// Operation being performed when the storage error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageOperation {
    /// Bounded, sorted retrieval of documents
    Find,
    /// Counting documents matching a filter
    Count,
    /// Resolving related documents for populate
    Populate,
    /// Inserting or updating a document
    Write,
}

impl fmt::Display for StorageOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Find => write!(f, "find"),
            Self::Count => write!(f, "count"),
            Self::Populate => write!(f, "populate"),
            Self::Write => write!(f, "write"),
        }
    }
}

/// Category of storage error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageErrorKind {
    /// A value could not be cast to the store's identifier type
    MalformedId,
    /// A unique index rejected the write
    DuplicateKey,
    /// Schema validation performed by the store failed
    ValidationFailed,
    /// The store could not be reached
    Unavailable,
    /// Operation timed out
    Timeout,
    /// Other unclassified error
    Other,
}

impl fmt::Display for StorageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedId => write!(f, "malformed_id"),
            Self::DuplicateKey => write!(f, "duplicate_key"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::Unavailable => write!(f, "unavailable"),
            Self::Timeout => write!(f, "timeout"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Structured storage error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageError {
    /// The operation being performed when the error occurred
    pub operation: StorageOperation,
    /// The category of error
    pub kind: StorageErrorKind,
    /// Human-readable error message, may be empty
    pub message: String,
}

impl StorageError {
    /// Create a new storage error
    pub fn new(
        operation: StorageOperation,
        kind: StorageErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
        }
    }

    /// A value that is not a valid identifier reached the store
    pub fn malformed_id(operation: StorageOperation, value: impl fmt::Display) -> Self {
        Self::new(
            operation,
            StorageErrorKind::MalformedId,
            format!("cast to identifier failed for value \"{value}\""),
        )
    }

    /// A unique index rejected a write
    pub fn duplicate_key(field: impl fmt::Display) -> Self {
        Self::new(
            StorageOperation::Write,
            StorageErrorKind::DuplicateKey,
            format!("duplicate key on field \"{field}\""),
        )
    }

    /// The store could not be reached
    pub fn unavailable(operation: StorageOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StorageErrorKind::Unavailable, message)
    }

    /// The store's own schema validation rejected a document
    pub fn validation_failed(operation: StorageOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StorageErrorKind::ValidationFailed, message)
    }

    /// The store did not answer in time
    pub fn timeout(operation: StorageOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StorageErrorKind::Timeout, message)
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: StorageOperation) -> Self {
        self.operation = operation;
        self
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Storage {} error during {}: {}",
            self.kind, self.operation, self.message
        )
    }
}

impl std::error::Error for StorageError {}

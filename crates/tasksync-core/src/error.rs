//! Error types for tasksync-core

use thiserror::Error;

/// Result type alias using tasksync-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tasksync-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Referenced task row does not exist
    #[error("Task not found: {0}")]
    NotFound(String),

    /// Insert collided with an existing primary or server key
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Stored row could not be coerced into a task
    #[error("Malformed task row: {0}")]
    MalformedRow(String),

    /// Client-supplied data is missing required fields
    #[error("Validation error: {0}")]
    Validation(String),

    /// Submitted item could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Classify a libSQL failure raised by an insert.
    ///
    /// Unique and primary key failures become `ConstraintViolation`, anything
    /// else is passed through unchanged.
    pub fn from_insert(error: libsql::Error) -> Self {
        let message = error.to_string();
        if message
            .to_ascii_lowercase()
            .contains("unique constraint failed")
        {
            Self::ConstraintViolation(message)
        } else {
            Self::LibSql(error)
        }
    }
}

//! Task store error types.

use thiserror::Error;

/// Errors that can occur during task store operations.
#[derive(Debug, Error)]
pub enum TaskStoreError {
    /// Caller supplied malformed or out-of-range input.
    #[error("{0}")]
    Validation(String),

    /// Entity not found in the caller's scope.
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A required dependency could not be reached.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Caller-visible classification of a [`TaskStoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input; never retried.
    Validation,
    /// No matching task in scope.
    NotFound,
    /// Durable store or another required dependency failed.
    Unavailable,
}

impl TaskStoreError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a not found error.
    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    /// Returns the caller-visible kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Database(_) | Self::Unavailable(_) => ErrorKind::Unavailable,
        }
    }

    /// Returns true if this is a not found error.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Returns true if this is a validation error.
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}

/// Result type for task store operations.
pub type TaskStoreResult<T> = Result<T, TaskStoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            TaskStoreError::validation("invalid limit").kind(),
            ErrorKind::Validation
        );
        assert!(TaskStoreError::not_found("Task", 3).is_not_found());
        assert_eq!(
            TaskStoreError::Database(sqlx::Error::PoolTimedOut).kind(),
            ErrorKind::Unavailable
        );
    }

    #[test]
    fn test_not_found_message() {
        let err = TaskStoreError::not_found("Task", 42);
        assert_eq!(err.to_string(), "Task not found: 42");
    }
}

//! Structured error types for store and planner operations.

use crate::types::TodoId;
use serde::Serialize;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    InvalidInput,
    CycleError,
    TransactionFailure,
}

/// Errors raised by the forest, the order planners and the store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TodoError {
    #[error("Todo not found: {0}")]
    NotFound(TodoId),

    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    /// A reparent that would make a todo its own ancestor.
    #[error("Moving todo {id} under {parent} would create a cycle")]
    Cycle { id: TodoId, parent: TodoId },

    /// The stored parent relation already loops through this todo.
    #[error("Parent relation contains a cycle through todo {0}")]
    CycleDetected(TodoId),

    #[error("Transaction failed: {0}")]
    TransactionFailure(String),
}

impl TodoError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            TodoError::NotFound(_) => ErrorCode::NotFound,
            TodoError::InvalidInput { .. } => ErrorCode::InvalidInput,
            TodoError::Cycle { .. } | TodoError::CycleDetected(_) => ErrorCode::CycleError,
            TodoError::TransactionFailure(_) => ErrorCode::TransactionFailure,
        }
    }

    /// Serializable form for JSON output.
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code(),
            message: self.to_string(),
            field: match self {
                TodoError::InvalidInput { field, .. } => Some(field.to_string()),
                _ => None,
            },
        }
    }
}

impl From<rusqlite::Error> for TodoError {
    fn from(err: rusqlite::Error) -> Self {
        TodoError::TransactionFailure(err.to_string())
    }
}

impl From<serde_json::Error> for TodoError {
    fn from(err: serde_json::Error) -> Self {
        TodoError::invalid("payload", err.to_string())
    }
}

/// Structured error for JSON responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Result type for todo operations.
pub type Result<T> = std::result::Result<T, TodoError>;

//! Error types for query execution.

use thiserror::Error;

/// Errors that can occur while executing a query plan.
///
/// Variants are ordered by increasing severity. Execution code propagates
/// these with `?`; the only operator that swallows one is `CreateIndex`,
/// which ignores [`ExecError::IndexExists`].
#[derive(Debug, Clone, Error)]
pub enum ExecError {
    /// A value was not acceptable for an operation (non-boolean filter
    /// result, comparison between incomparable types, UNWIND over a
    /// non-list and similar).
    #[error("type error: {0}")]
    Type(String),

    /// A semantically invalid runtime action (deleting a non-entity,
    /// negative SKIP/LIMIT, touching a deleted record and similar).
    #[error("query runtime error: {0}")]
    Runtime(String),

    /// Cooperative cancellation requested by the storage layer.
    #[error("query execution aborted")]
    Aborted,

    /// The requested index already exists.
    #[error("index already exists")]
    IndexExists,

    /// An error propagated unchanged from the storage layer.
    #[error("storage error: {0}")]
    Storage(String),
}

impl ExecError {
    /// Creates a type error with the given message.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::Type(message.into())
    }

    /// Creates a query runtime error with the given message.
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime(message.into())
    }
}

/// Result type for execution operations.
pub type ExecResult<T> = Result<T, ExecError>;

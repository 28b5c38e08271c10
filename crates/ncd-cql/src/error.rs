//! Error types for CQL operations.

use thiserror::Error;

/// CQL-specific errors.
#[derive(Debug, Error)]
pub enum CqlError {
    /// Error parsing CQL source.
    #[error("CQL parse error: {0}")]
    Parse(String),

    /// Error parsing CQL source with a known source location.
    #[error("CQL parse error at line {line}, column {column}: {message}")]
    ParseError {
        /// Description of what went wrong.
        message: String,
        /// 1-indexed line number.
        line: usize,
        /// 1-indexed column number.
        column: usize,
    },

    /// Error evaluating a stored rule against a value.
    #[error("CQL evaluation error: {0}")]
    Evaluation(String),

    /// Error during ELM execution.
    #[error("CQL execution error: {0}")]
    Execution(String),

    /// Library not found.
    #[error("Library not found: {0}")]
    LibraryNotFound(String),

    /// Type error during evaluation.
    #[error("Type error: {0}")]
    TypeError(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for CQL operations.
pub type Result<T> = std::result::Result<T, CqlError>;

//! Storage error types.
//!
//! Errors never leak the underlying driver's text verbatim when it could
//! echo interpolated values; every variant here is built from a fixed
//! message plus the parametrised query's shape, never its bound values.

use ncd_foundation::FoundationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("query failed: {message}")]
    Query { message: String, query: Option<String> },

    #[error("command failed: {message}")]
    Command { message: String, query: Option<String> },

    #[error("transaction failed: {message}")]
    Transaction { message: String },

    #[error("connection failed: {message}")]
    Connection { message: String },

    #[error(transparent)]
    Foundation(#[from] FoundationError),
}

impl StorageError {
    pub fn query(message: impl Into<String>, query: Option<&str>) -> Self {
        Self::Query {
            message: message.into(),
            query: query.map(|q| q.to_string()),
        }
    }

    pub fn command(message: impl Into<String>, query: Option<&str>) -> Self {
        Self::Command {
            message: message.into(),
            query: query.map(|q| q.to_string()),
        }
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Query {
            message: err.to_string(),
            query: None,
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;

//! Validation error types.
//!
//! This module provides the unified error type for the validator crate,
//! extending `FoundationError` with domain-specific validation errors that
//! mirror the taxonomy of the broader data engine (storage, import, repository
//! layers all surface the same vocabulary so the CLI can map them to exit
//! codes uniformly).

use ncd_foundation::FoundationError;
use thiserror::Error;

/// Errors that can occur during data validation operations.
#[derive(Error, Debug)]
pub enum ValidatorError {
    /// Requested entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A record with the same natural key already exists.
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// A database constraint (foreign key, unique, check) was violated.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// Underlying storage operation failed.
    #[error("storage failure: {0}")]
    StorageFailure(String),

    /// Candidate value failed validation rules.
    #[error("validation failure: {0}")]
    ValidationFailure(String),

    /// An observation could not be mapped to a visit.
    #[error("cannot map visit: {0}")]
    CannotMapVisit(String),

    /// A visit could not be mapped to a patient.
    #[error("cannot map patient: {0}")]
    CannotMapPatient(String),

    /// A transaction exceeded its configured timeout.
    #[error("transaction timeout: {0}")]
    TransactionTimeout(String),

    /// Import content could not be parsed into a canonical structure.
    #[error("parse failure: {0}")]
    ParseFailure(String),

    /// Foundation error (covers IO, JSON, generic context errors).
    #[error(transparent)]
    Foundation(#[from] FoundationError),

    /// Rule evaluation failed at the CQL seam.
    #[error(transparent)]
    Cql(#[from] ncd_cql::CqlError),
}

impl From<std::io::Error> for ValidatorError {
    fn from(err: std::io::Error) -> Self {
        ValidatorError::Foundation(FoundationError::Io(err))
    }
}

impl From<serde_json::Error> for ValidatorError {
    fn from(err: serde_json::Error) -> Self {
        ValidatorError::Foundation(FoundationError::Serialization(err))
    }
}

impl Clone for ValidatorError {
    fn clone(&self) -> Self {
        match self {
            Self::NotFound(m) => Self::NotFound(m.clone()),
            Self::Duplicate(m) => Self::Duplicate(m.clone()),
            Self::ConstraintViolation(m) => Self::ConstraintViolation(m.clone()),
            Self::StorageFailure(m) => Self::StorageFailure(m.clone()),
            Self::ValidationFailure(m) => Self::ValidationFailure(m.clone()),
            Self::CannotMapVisit(m) => Self::CannotMapVisit(m.clone()),
            Self::CannotMapPatient(m) => Self::CannotMapPatient(m.clone()),
            Self::TransactionTimeout(m) => Self::TransactionTimeout(m.clone()),
            Self::ParseFailure(m) => Self::ParseFailure(m.clone()),
            Self::Foundation(e) => Self::ValidationFailure(e.to_string()),
            Self::Cql(e) => Self::ValidationFailure(e.to_string()),
        }
    }
}

impl PartialEq for ValidatorError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::Duplicate(a), Self::Duplicate(b)) => a == b,
            (Self::ConstraintViolation(a), Self::ConstraintViolation(b)) => a == b,
            (Self::StorageFailure(a), Self::StorageFailure(b)) => a == b,
            (Self::ValidationFailure(a), Self::ValidationFailure(b)) => a == b,
            (Self::CannotMapVisit(a), Self::CannotMapVisit(b)) => a == b,
            (Self::CannotMapPatient(a), Self::CannotMapPatient(b)) => a == b,
            (Self::TransactionTimeout(a), Self::TransactionTimeout(b)) => a == b,
            (Self::ParseFailure(a), Self::ParseFailure(b)) => a == b,
            _ => false,
        }
    }
}

/// Result type for validator operations.
pub type Result<T> = std::result::Result<T, ValidatorError>;

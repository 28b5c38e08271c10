use ncd_repo::RepoError;
use ncd_storage::StorageError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single parser or structural-validation failure (spec.md §4.7/§4.8).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportError {
    pub code: String,
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl ImportError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into(), line: None, column: None }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("duplicate patient {0}")]
    DuplicatePatient(String),

    #[error("cannot map visit: {0}")]
    CannotMapVisit(String),

    #[error("invalid import structure: {0}")]
    InvalidStructure(String),

    #[error("transaction timeout: {0}")]
    TransactionTimeout(String),

    #[error(transparent)]
    Concept(#[from] ncd_concept::ConceptCacheError),

    #[error(transparent)]
    Validate(#[from] ncd_validate::ValidatorError),
}

pub type Result<T> = std::result::Result<T, ServiceError>;

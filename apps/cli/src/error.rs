//! Central exit-code mapping (spec.md §6): every subcommand returns an
//! `AppError`, and `main` is the only place that turns one into a process
//! exit code. No subcommand calls `std::process::exit` itself.

use ncd_import::ServiceError;
use ncd_repo::RepoError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0} structural error(s) rejected the import; see stderr for detail")]
    ImportRejected(usize),

    #[error(transparent)]
    Import(#[from] ServiceError),

    #[error(transparent)]
    Export(#[from] ncd_export::ExportError),

    #[error(transparent)]
    Migrate(#[from] ncd_migrate::MigrateError),

    #[error(transparent)]
    Storage(#[from] ncd_storage::StorageError),

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error(transparent)]
    Seed(#[from] ncd_seed::SeedError),

    #[error(transparent)]
    Demo(#[from] ncd_demo::DemoError),

    #[error(transparent)]
    Search(#[from] ncd_search::SearchError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::ImportRejected(_) => 2,
            AppError::Import(ServiceError::DuplicatePatient(_)) => 4,
            AppError::Import(ServiceError::InvalidStructure(_) | ServiceError::CannotMapVisit(_)) => 2,
            AppError::Import(ServiceError::Repo(_) | ServiceError::Storage(_) | ServiceError::TransactionTimeout(_)) => 3,
            AppError::Import(ServiceError::Concept(_) | ServiceError::Validate(_)) => 2,
            AppError::Export(_) => 2,
            AppError::Migrate(_) => 3,
            AppError::Storage(_) => 3,
            AppError::Repo(RepoError::Duplicate(_)) => 4,
            AppError::Repo(_) => 3,
            AppError::Seed(_) => 3,
            AppError::Demo(_) => 2,
            AppError::Search(_) => 3,
            AppError::Io(_) => 5,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

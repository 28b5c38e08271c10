use ncd_concept::ConceptCacheError;
use ncd_storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Concept(#[from] ConceptCacheError),
}

pub type Result<T> = std::result::Result<T, SearchError>;

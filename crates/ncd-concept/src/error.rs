use ncd_repo::RepoError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConceptCacheError {
    #[error(transparent)]
    Repo(#[from] RepoError),
}

pub type Result<T> = std::result::Result<T, ConceptCacheError>;

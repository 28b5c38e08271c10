use ncd_repo::RepoError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DemoError {
    #[error("requested patient count must be greater than zero")]
    EmptyRequest,

    #[error(transparent)]
    Repo(#[from] RepoError),
}

pub type Result<T> = std::result::Result<T, DemoError>;

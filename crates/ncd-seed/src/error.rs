use ncd_repo::RepoError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("malformed seed file {file}: {message}")]
    Malformed { file: &'static str, message: String },

    #[error(transparent)]
    Repo(#[from] RepoError),
}

pub type Result<T> = std::result::Result<T, SeedError>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("json encode failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv encode failed: {0}")]
    Csv(String),

    #[error("signing key is malformed: {0}")]
    InvalidKey(String),

    #[error("signature verification failed")]
    SignatureInvalid,

    #[error("bundle carries no embedded signature")]
    MissingSignature,

    #[error(transparent)]
    Concept(#[from] ncd_concept::ConceptCacheError),
}

pub type Result<T> = std::result::Result<T, ExportError>;

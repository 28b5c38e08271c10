use ncd_storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("migration '{name}' failed: {cause}")]
    MigrationFailed { name: String, cause: String },

    #[error("migration '{name}' checksum mismatch: recorded {recorded}, computed {computed}")]
    ChecksumMismatch {
        name: String,
        recorded: String,
        computed: String,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, MigrateError>;

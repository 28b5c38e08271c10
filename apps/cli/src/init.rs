use crate::error::Result;
use clap::Args;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Args)]
pub struct InitArgs {
    /// Database file to create; defaults to the resolved --db-path/BEST_DB_PATH
    path: Option<PathBuf>,
}

pub fn run(db_path: &Path, args: InitArgs) -> Result<()> {
    let path = args.path.as_deref().unwrap_or(db_path);
    let storage = ncd_storage::Storage::connect(path)?;
    storage.disconnect();
    info!(path = %path.display(), "database file initialized");
    Ok(())
}

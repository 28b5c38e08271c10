use crate::error::Result;
use ncd_storage::Storage;
use std::path::Path;
use tracing::info;

pub fn run(db_path: &Path) -> Result<()> {
    let storage = Storage::connect(db_path)?;
    let reports = ncd_seed::load_all(&storage)?;
    for report in reports {
        info!(file = report.file, inserted = report.inserted, skipped = report.skipped, "seed file loaded");
    }
    Ok(())
}

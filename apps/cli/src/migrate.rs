use crate::error::Result;
use ncd_migrate::{standard_migrations, MigrationRuntime};
use ncd_storage::Storage;
use std::path::Path;
use tracing::info;

pub fn run(db_path: &Path) -> Result<()> {
    let mut storage = Storage::connect(db_path)?;
    let mut runtime = MigrationRuntime::new();
    for migration in standard_migrations() {
        runtime = runtime.register(migration);
    }
    runtime.apply_all(&mut storage)?;

    let status = runtime.migration_status(&storage)?;
    info!(total = status.total, executed = status.executed, pending = status.pending, "migrations applied");
    Ok(())
}

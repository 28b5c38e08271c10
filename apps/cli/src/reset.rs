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
    runtime.reset(&mut storage)?;
    info!("database reset: all tables dropped and migrations re-applied");
    Ok(())
}

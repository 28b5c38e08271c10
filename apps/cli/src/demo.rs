use crate::error::Result;
use clap::Args;
use ncd_demo::{generate, Repos};
use ncd_storage::Storage;
use std::path::Path;
use tracing::info;

#[derive(Args)]
pub struct DemoArgs {
    /// Number of demo patients to generate
    #[clap(long, default_value_t = 10)]
    count: u32,
}

pub fn run(db_path: &Path, args: DemoArgs) -> Result<()> {
    let storage = Storage::connect(db_path)?;
    let repos = Repos::new(&storage);
    let report = generate(&repos, args.count)?;

    info!(
        patients = report.patients_created,
        visits = report.visits_created,
        observations = report.observations_created,
        "demo data generated"
    );
    Ok(())
}

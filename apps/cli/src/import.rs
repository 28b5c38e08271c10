use crate::error::{AppError, Result};
use clap::Args;
use ncd_import::{import_file, import_to_database, DuplicateStrategy, ImportServiceOptions};
use ncd_storage::Storage;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Args)]
pub struct ImportArgs {
    /// CSV/JSON/HL7-CDA file to import
    file: PathBuf,

    /// How to handle a patient code that already exists: skip, update, error
    #[clap(long, default_value = "skip")]
    strategy: StrategyArg,
}

#[derive(Clone, Copy, Debug)]
struct StrategyArg(DuplicateStrategy);

impl std::str::FromStr for StrategyArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skip" => Ok(StrategyArg(DuplicateStrategy::Skip)),
            "update" => Ok(StrategyArg(DuplicateStrategy::Update)),
            "error" => Ok(StrategyArg(DuplicateStrategy::Error)),
            _ => Err(format!("invalid strategy: {s}. Valid options: skip, update, error")),
        }
    }
}

pub fn run(db_path: &Path, args: ImportArgs) -> Result<()> {
    let content = std::fs::read(&args.file)?;
    let filename = args.file.file_name().and_then(|n| n.to_str()).unwrap_or("upload");

    let outcome = import_file(&content, filename);
    if !outcome.success {
        for err in &outcome.errors {
            error!(code = %err.code, message = %err.message, "import parse error");
        }
        return Err(AppError::ImportRejected(outcome.errors.len()));
    }
    for err in &outcome.errors {
        warn!(code = %err.code, message = %err.message, "non-fatal import row error");
    }

    let structure = outcome.data.expect("successful outcome carries data");
    let storage = Storage::connect(db_path)?;
    let result = import_to_database(&storage, &structure, ImportServiceOptions { duplicate_strategy: args.strategy.0, ..Default::default() })?;

    info!(
        patients = result.statistics.patient_count,
        visits = result.statistics.visit_count,
        observations = result.statistics.observation_count,
        "import complete"
    );
    Ok(())
}

use crate::error::Result;
use clap::Args;
use ncd_model::ImportStructure;
use ncd_repo::{FindOptions, Repository, SqliteObservationRepository, SqlitePatientRepository, SqliteVisitRepository};
use ncd_storage::Storage;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Args)]
pub struct ExportArgs {
    /// Destination file
    file: PathBuf,

    /// Output format: csv, json, hl7
    #[clap(long, default_value = "json")]
    format: FormatArg,
}

#[derive(Clone, Copy, Debug)]
enum FormatArg {
    Csv,
    Json,
    Hl7,
}

impl std::str::FromStr for FormatArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(FormatArg::Csv),
            "json" => Ok(FormatArg::Json),
            "hl7" => Ok(FormatArg::Hl7),
            _ => Err(format!("invalid format: {s}. Valid options: csv, json, hl7")),
        }
    }
}

fn snapshot(storage: &Storage, format: &str) -> Result<ImportStructure> {
    let patients = SqlitePatientRepository::new(storage).find_all(&FindOptions::default())?;
    let visits = SqliteVisitRepository::new(storage).find_all(&FindOptions::default())?;
    let observations = SqliteObservationRepository::new(storage).find_all(&FindOptions::default())?;
    Ok(ImportStructure::from_data(format, patients, visits, observations, chrono::Utc::now().naive_utc()))
}

pub fn run(db_path: &Path, args: ExportArgs) -> Result<()> {
    let storage = Storage::connect(db_path)?;

    let bytes = match args.format {
        FormatArg::Csv => ncd_export::export_to_csv(&storage, &snapshot(&storage, "csv")?)?,
        FormatArg::Json => ncd_export::export_to_json(&snapshot(&storage, "json")?)?,
        FormatArg::Hl7 => ncd_export::export_to_hl7(&snapshot(&storage, "hl7-cda")?, None)?,
    };

    std::fs::write(&args.file, bytes)?;
    info!(path = %args.file.display(), format = ?args.format, "export complete");
    Ok(())
}

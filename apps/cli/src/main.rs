use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::error;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

mod config;
mod demo;
mod error;
mod export;
mod import;
mod init;
mod migrate;
mod reset;
mod seed;

/// ncd - unified CLI for the neurodata clinical data engine
#[derive(Parser)]
#[clap(name = "ncd")]
#[clap(about = "Unified CLI for the neurodata clinical data engine")]
#[clap(version)]
struct Cli {
    /// Enable debug-level logging
    #[clap(short, long, global = true)]
    verbose: bool,

    /// Path to the embedded database file (overridden by BEST_DB_PATH)
    #[clap(long, global = true)]
    db_path: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[clap(long, global = true)]
    log_file: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create (or open) the embedded database file
    Init(init::InitArgs),
    /// Apply every pending schema migration
    Migrate,
    /// Load the standard reference data (concepts, code lookups, CQL rules, users)
    Seed,
    /// Import a CSV/JSON/HL7-CDA bundle into the database
    Import(import::ImportArgs),
    /// Export the database to CSV, JSON, or HL7-CDA
    Export(export::ExportArgs),
    /// Generate deterministic demo patients/visits/observations
    Demo(demo::DemoArgs),
    /// Drop every non-migrations table and re-apply all migrations
    Reset,
}

fn init_tracing(verbose: bool, log_file: Option<&PathBuf>) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let writer = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .expect("log file path must be writable");
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };
    let subscriber = tracing_subscriber::fmt().with_max_level(level).with_writer(writer).finish();
    tracing::subscriber::set_global_default(subscriber).expect("tracing subscriber installed exactly once");
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_file.as_ref());

    let db_path = config::resolve_db_path(cli.db_path.as_ref());

    let result = match cli.command {
        Commands::Init(args) => init::run(&db_path, args),
        Commands::Migrate => migrate::run(&db_path),
        Commands::Seed => seed::run(&db_path),
        Commands::Import(args) => import::run(&db_path, args),
        Commands::Export(args) => export::run(&db_path, args),
        Commands::Demo(args) => demo::run(&db_path, args),
        Commands::Reset => reset::run(&db_path),
    };

    match result {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            error!("{err}");
            std::process::exit(err.exit_code());
        }
    }
}

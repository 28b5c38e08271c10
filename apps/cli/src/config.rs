//! Where the active database file lives (spec.md §6): `BEST_DB_PATH`
//! overrides a `--db-path` flag, which overrides the `./neurostore.db`
//! default.

use std::path::PathBuf;

const DEFAULT_DB_PATH: &str = "./neurostore.db";
const DB_PATH_ENV: &str = "BEST_DB_PATH";

pub fn resolve_db_path(flag: Option<&PathBuf>) -> PathBuf {
    if let Ok(from_env) = std::env::var(DB_PATH_ENV) {
        return PathBuf::from(from_env);
    }
    flag.cloned().unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH))
}

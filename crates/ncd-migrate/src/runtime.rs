//! Migration runtime: tracks `{unregistered -> registered -> applied}` for
//! each migration and drives `initializeDatabase`'s migration step.

use crate::error::{MigrateError, Result};
use crate::migration::{checksum_of, Migration};
use ncd_storage::Storage;
use tracing::{info, warn};

const CREATE_MIGRATIONS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS migrations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    executed_at TEXT NOT NULL,
    checksum TEXT NOT NULL,
    description TEXT NOT NULL
)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub total: usize,
    pub executed: usize,
    pub pending: usize,
    pub pending_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumMismatch {
    pub name: String,
    pub recorded: String,
    pub computed: String,
}

/// Holds the registry of known migrations in registration order. Does not
/// own the database connection — callers pass a `&mut Storage` so the
/// runtime can be reused across many databases (tests in particular).
pub struct MigrationRuntime {
    migrations: Vec<Migration>,
}

impl Default for MigrationRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationRuntime {
    pub fn new() -> Self {
        Self {
            migrations: Vec::new(),
        }
    }

    pub fn register(mut self, migration: Migration) -> Self {
        self.migrations.push(migration);
        self
    }

    fn ensure_table(&self, storage: &Storage) -> Result<()> {
        storage.execute_command(CREATE_MIGRATIONS_TABLE, [])?;
        Ok(())
    }

    fn applied_names(&self, storage: &Storage) -> Result<Vec<String>> {
        let names = storage.execute_query("SELECT name FROM migrations", [], |row| row.get(0))?;
        Ok(names)
    }

    /// Apply every registered migration not yet applied, in registration
    /// order, each inside its own transaction. Stops at the first failure.
    pub fn apply_all(&self, storage: &mut Storage) -> Result<()> {
        self.ensure_table(storage)?;
        let applied = self.applied_names(storage)?;

        for migration in &self.migrations {
            if applied.iter().any(|n| n == migration.name) {
                continue;
            }
            let checksum = migration.checksum();
            let name = migration.name;
            let description = migration.description;

            let result: Result<()> = storage.transaction(|tx| {
                migration.apply(tx).map_err(|e| MigrateError::MigrationFailed {
                    name: name.to_string(),
                    cause: e.to_string(),
                })?;
                tx.execute(
                    "INSERT INTO migrations (name, executed_at, checksum, description) \
                     VALUES (?1, datetime('now'), ?2, ?3)",
                    rusqlite::params![name, checksum, description],
                )
                .map_err(|e| MigrateError::MigrationFailed {
                    name: name.to_string(),
                    cause: e.to_string(),
                })?;
                Ok(())
            });

            match result {
                Ok(()) => info!(migration = name, "applied"),
                Err(e) => {
                    warn!(migration = name, error = %e, "migration failed, rolled back");
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    pub fn migration_status(&self, storage: &Storage) -> Result<MigrationStatus> {
        self.ensure_table(storage)?;
        let applied = self.applied_names(storage)?;
        let pending_names: Vec<String> = self
            .migrations
            .iter()
            .map(|m| m.name.to_string())
            .filter(|n| !applied.contains(n))
            .collect();
        Ok(MigrationStatus {
            total: self.migrations.len(),
            executed: applied.len(),
            pending: pending_names.len(),
            pending_names,
        })
    }

    /// Recompute each applied migration's checksum from its registered
    /// content and flag any that no longer match what's recorded.
    pub fn validate(&self, storage: &Storage) -> Result<Vec<ChecksumMismatch>> {
        self.ensure_table(storage)?;
        let rows: Vec<(String, String)> = storage.execute_query(
            "SELECT name, checksum FROM migrations",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let mut mismatches = Vec::new();
        for (name, recorded) in rows {
            if let Some(migration) = self.migrations.iter().find(|m| m.name == name) {
                let computed = checksum_of(migration.content);
                if computed != recorded {
                    mismatches.push(ChecksumMismatch {
                        name,
                        recorded,
                        computed,
                    });
                }
            }
        }
        Ok(mismatches)
    }

    /// Drop every table except `migrations`, clear the table, then
    /// re-apply every registered migration from scratch.
    pub fn reset(&self, storage: &mut Storage) -> Result<()> {
        let tables: Vec<String> = storage.execute_query(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name != 'migrations' \
             AND name NOT LIKE 'sqlite_%'",
            [],
            |row| row.get(0),
        )?;

        let result: Result<()> = storage.transaction(|tx| {
            for table in &tables {
                tx.execute_batch(&format!("DROP TABLE IF EXISTS \"{table}\""))
                    .map_err(|e| MigrateError::MigrationFailed {
                        name: table.clone(),
                        cause: e.to_string(),
                    })?;
            }
            tx.execute("DELETE FROM migrations", [])
                .map_err(|e| MigrateError::MigrationFailed {
                    name: "migrations".to_string(),
                    cause: e.to_string(),
                })?;
            Ok(())
        });
        result?;

        self.apply_all(storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_runtime() -> MigrationRuntime {
        MigrationRuntime::new()
            .register(Migration::sql(
                "0001_patients",
                "patient dimension table",
                "CREATE TABLE patients (patient_num INTEGER PRIMARY KEY, patient_cd TEXT UNIQUE NOT NULL)",
            ))
            .register(Migration::sql(
                "0002_visits",
                "visit dimension table",
                "CREATE TABLE visits (encounter_num INTEGER PRIMARY KEY, patient_num INTEGER NOT NULL REFERENCES patients(patient_num))",
            ))
    }

    #[test]
    fn applies_in_order_and_records_checksums() {
        let mut storage = Storage::connect_in_memory().unwrap();
        let runtime = sample_runtime();
        runtime.apply_all(&mut storage).unwrap();

        let status = runtime.migration_status(&storage).unwrap();
        assert_eq!(status.total, 2);
        assert_eq!(status.executed, 2);
        assert_eq!(status.pending, 0);
    }

    #[test]
    fn apply_all_is_idempotent() {
        let mut storage = Storage::connect_in_memory().unwrap();
        let runtime = sample_runtime();
        runtime.apply_all(&mut storage).unwrap();
        runtime.apply_all(&mut storage).unwrap();

        let status = runtime.migration_status(&storage).unwrap();
        assert_eq!(status.executed, 2);
        assert!(runtime.validate(&storage).unwrap().is_empty());
    }

    #[test]
    fn validate_flags_tampered_checksum() {
        let mut storage = Storage::connect_in_memory().unwrap();
        let runtime = sample_runtime();
        runtime.apply_all(&mut storage).unwrap();

        storage
            .execute_command(
                "UPDATE migrations SET checksum = 'tampered' WHERE name = '0001_patients'",
                [],
            )
            .unwrap();

        let mismatches = runtime.validate(&storage).unwrap();
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].name, "0001_patients");
    }

    #[test]
    fn failed_migration_rolls_back_and_stops() {
        let mut storage = Storage::connect_in_memory().unwrap();
        let runtime = MigrationRuntime::new()
            .register(Migration::sql("0001_ok", "fine", "CREATE TABLE ok (id INTEGER)"))
            .register(Migration::sql("0002_bad", "broken sql", "NOT VALID SQL AT ALL"))
            .register(Migration::sql("0003_never", "unreachable", "CREATE TABLE never (id INTEGER)"));

        let result = runtime.apply_all(&mut storage);
        assert!(result.is_err());

        let status = runtime.migration_status(&storage).unwrap();
        assert_eq!(status.executed, 1);
        assert_eq!(status.pending_names, vec!["0002_bad", "0003_never"]);
    }

    #[test]
    fn reset_drops_tables_and_reapplies() {
        let mut storage = Storage::connect_in_memory().unwrap();
        let runtime = sample_runtime();
        runtime.apply_all(&mut storage).unwrap();
        storage
            .execute_command("INSERT INTO patients (patient_cd) VALUES ('P1')", [])
            .unwrap();

        runtime.reset(&mut storage).unwrap();

        let count: i64 = storage
            .execute_query("SELECT COUNT(*) FROM patients", [], |row| row.get(0))
            .unwrap()[0];
        assert_eq!(count, 0);
        assert_eq!(runtime.migration_status(&storage).unwrap().executed, 2);
    }
}

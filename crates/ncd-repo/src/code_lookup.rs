//! Code lookup value-set repository (spec.md §4.4 `CodeLookupRepository`).

use crate::error::Result;
use ncd_model::CodeLookup;
use ncd_storage::Storage;
use rusqlite::{params, Row};

pub trait CodeLookupRepository {
    /// Load an entire value set for a `(TABLE_CD, COLUMN_CD)` pair.
    fn find_by_table_column(&self, table_cd: &str, column_cd: &str) -> Result<Vec<CodeLookup>>;
    fn find_by_code(&self, code_cd: &str) -> Result<Vec<CodeLookup>>;
    /// Bulk variant of [`CodeLookupRepository::find_by_code`]: every row
    /// whose `code_cd` is in `codes`, in one round trip.
    fn find_by_codes(&self, codes: &[String]) -> Result<Vec<CodeLookup>>;
    fn upsert(&self, entry: &CodeLookup) -> Result<CodeLookup>;
}

pub struct SqliteCodeLookupRepository<'a> {
    storage: &'a Storage,
}

impl<'a> SqliteCodeLookupRepository<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }
}

fn row_to_lookup(row: &Row<'_>) -> rusqlite::Result<CodeLookup> {
    let blob_json: Option<String> = row.get("lookup_blob")?;
    Ok(CodeLookup {
        table_cd: row.get("table_cd")?,
        column_cd: row.get("column_cd")?,
        code_cd: row.get("code_cd")?,
        name_char: row.get("name_char")?,
        lookup_blob: blob_json.and_then(|s| serde_json::from_str(&s).ok()),
    })
}

const SELECT_COLUMNS: &str = "table_cd, column_cd, code_cd, name_char, lookup_blob";

impl<'a> CodeLookupRepository for SqliteCodeLookupRepository<'a> {
    fn find_by_table_column(&self, table_cd: &str, column_cd: &str) -> Result<Vec<CodeLookup>> {
        Ok(self.storage.execute_query(
            &format!("SELECT {SELECT_COLUMNS} FROM code_lookup WHERE table_cd = ?1 AND column_cd = ?2"),
            params![table_cd, column_cd],
            row_to_lookup,
        )?)
    }

    fn find_by_code(&self, code_cd: &str) -> Result<Vec<CodeLookup>> {
        Ok(self.storage.execute_query(
            &format!("SELECT {SELECT_COLUMNS} FROM code_lookup WHERE code_cd = ?1"),
            params![code_cd],
            row_to_lookup,
        )?)
    }

    fn find_by_codes(&self, codes: &[String]) -> Result<Vec<CodeLookup>> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = codes.iter().enumerate().map(|(i, _)| format!("?{}", i + 1)).collect::<Vec<_>>().join(", ");
        let sql = format!("SELECT {SELECT_COLUMNS} FROM code_lookup WHERE code_cd IN ({placeholders})");
        let params = rusqlite::params_from_iter(codes.iter());
        Ok(self.storage.execute_query(&sql, params, row_to_lookup)?)
    }

    fn upsert(&self, entry: &CodeLookup) -> Result<CodeLookup> {
        let blob = entry.lookup_blob.as_ref().map(|v| v.to_string());
        self.storage.execute_command(
            "INSERT INTO code_lookup (table_cd, column_cd, code_cd, name_char, lookup_blob) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT (table_cd, column_cd, code_cd) DO UPDATE SET name_char = excluded.name_char, lookup_blob = excluded.lookup_blob",
            params![entry.table_cd, entry.column_cd, entry.code_cd, entry.name_char, blob],
        )?;
        Ok(entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ncd_migrate::{standard_migrations, MigrationRuntime};

    fn setup() -> Storage {
        let mut storage = Storage::connect_in_memory().unwrap();
        let mut runtime = MigrationRuntime::new();
        for m in standard_migrations() {
            runtime = runtime.register(m);
        }
        runtime.apply_all(&mut storage).unwrap();
        storage
    }

    #[test]
    fn upsert_then_find_by_table_column() {
        let storage = setup();
        let repo = SqliteCodeLookupRepository::new(&storage);
        repo.upsert(&CodeLookup::new("SEX_CD", "sex_cd", "M", "Male")).unwrap();
        repo.upsert(&CodeLookup::new("SEX_CD", "sex_cd", "F", "Female")).unwrap();

        let values = repo.find_by_table_column("SEX_CD", "sex_cd").unwrap();
        assert_eq!(values.len(), 2);
    }
}

//! The Storage Adapter: opens the embedded relational file and exposes
//! parametrised query/command/transaction operations. No caller ever builds
//! SQL by string concatenation of user input through this type.

use crate::error::{Result, StorageError};
use rusqlite::{Connection, Params, Row};
use std::path::Path;
use tracing::{debug, instrument};

/// Outcome of `execute_command`: the number of rows changed and, for an
/// insert, the id rusqlite assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandOutcome {
    pub last_id: i64,
    pub changes: usize,
}

/// Owns the database connection. Repositories borrow it; the import service
/// takes an exclusive write borrow for the duration of a transaction.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Open (creating if absent) the embedded relational file at `path`,
    /// enabling WAL mode, a busy timeout, and foreign-key enforcement.
    #[instrument(skip(path))]
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).map_err(|e| StorageError::Connection {
            message: e.to_string(),
        })?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| StorageError::Connection { message: e.to_string() })?;
        conn.pragma_update(None, "busy_timeout", 5000)
            .map_err(|e| StorageError::Connection { message: e.to_string() })?;
        conn.pragma_update(None, "foreign_keys", true)
            .map_err(|e| StorageError::Connection { message: e.to_string() })?;
        debug!("storage connected");
        Ok(Self { conn })
    }

    /// Open an in-memory database (used by demo/test fixtures that don't
    /// need a durable file).
    pub fn connect_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| StorageError::Connection {
            message: e.to_string(),
        })?;
        conn.pragma_update(None, "foreign_keys", true)
            .map_err(|e| StorageError::Connection { message: e.to_string() })?;
        Ok(Self { conn })
    }

    /// Run a read query, mapping each row with `row_fn`.
    pub fn execute_query<T, P, F>(&self, sql: &str, params: P, row_fn: F) -> Result<Vec<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| StorageError::query(e.to_string(), Some(sql)))?;
        let rows = stmt
            .query_map(params, row_fn)
            .map_err(|e| StorageError::query(e.to_string(), Some(sql)))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|e| StorageError::query(e.to_string(), Some(sql)))?);
        }
        Ok(out)
    }

    /// Run a write statement (insert/update/delete/DDL).
    pub fn execute_command<P: Params>(&self, sql: &str, params: P) -> Result<CommandOutcome> {
        let changes = self
            .conn
            .execute(sql, params)
            .map_err(|e| StorageError::command(e.to_string(), Some(sql)))?;
        Ok(CommandOutcome {
            last_id: self.conn.last_insert_rowid(),
            changes,
        })
    }

    /// Run `f` inside `BEGIN`/`COMMIT`. Any `Err` returned from `f` rolls the
    /// transaction back and is surfaced as-is; a panic inside `f` also rolls
    /// back (rusqlite's `Transaction` drop guard).
    pub fn transaction<T, E, F>(&mut self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&rusqlite::Transaction<'_>) -> std::result::Result<T, E>,
        E: From<StorageError>,
    {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| StorageError::Transaction { message: e.to_string() })?;
        let result = f(&tx)?;
        tx.commit()
            .map_err(|e| StorageError::Transaction { message: e.to_string() })?;
        Ok(result)
    }

    /// Access the raw connection for repository implementations that need
    /// `rusqlite`'s full API (e.g. `query_row`).
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Disconnect, dropping the underlying connection.
    pub fn disconnect(self) {
        drop(self.conn);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_enables_foreign_keys() {
        let storage = Storage::connect_in_memory().unwrap();
        let fk_enabled: i64 = storage
            .connection()
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .unwrap();
        assert_eq!(fk_enabled, 1);
    }

    #[test]
    fn transaction_rolls_back_on_error() {
        let mut storage = Storage::connect_in_memory().unwrap();
        storage
            .execute_command("CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT)", [])
            .unwrap();

        let result: std::result::Result<(), StorageError> = storage.transaction(|tx| {
            tx.execute("INSERT INTO t (v) VALUES (?1)", ["a"])
                .map_err(|e| StorageError::command(e.to_string(), None))?;
            Err(StorageError::command("boom", None))
        });
        assert!(result.is_err());

        let count: i64 = storage
            .execute_query("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .unwrap()[0];
        assert_eq!(count, 0);
    }

    #[test]
    fn transaction_commits_on_success() {
        let mut storage = Storage::connect_in_memory().unwrap();
        storage
            .execute_command("CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT)", [])
            .unwrap();

        let result: std::result::Result<(), StorageError> = storage.transaction(|tx| {
            tx.execute("INSERT INTO t (v) VALUES (?1)", ["a"])
                .map_err(|e| StorageError::command(e.to_string(), None))?;
            Ok(())
        });
        assert!(result.is_ok());

        let count: i64 = storage
            .execute_query("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .unwrap()[0];
        assert_eq!(count, 1);
    }
}

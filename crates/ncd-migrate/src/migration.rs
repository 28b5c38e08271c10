//! A single migration: either a static SQL script or a closure given a
//! transaction handle. Checksums are computed over whichever content the
//! migration carries, so a closure migration must supply stable `content`
//! text to hash (normally the SQL it executes internally).

use sha2::{Digest, Sha256};

pub enum MigrationBody {
    Sql(&'static str),
    Fn(Box<dyn Fn(&rusqlite::Transaction<'_>) -> rusqlite::Result<()> + Send + Sync>),
}

pub struct Migration {
    pub name: &'static str,
    pub description: &'static str,
    /// Text hashed for the checksum. For `Sql` bodies this is the SQL
    /// itself; for `Fn` bodies the caller supplies a stable description of
    /// what the closure does, since the closure's bytes aren't hashable.
    pub content: &'static str,
    pub body: MigrationBody,
}

impl Migration {
    pub fn sql(name: &'static str, description: &'static str, sql: &'static str) -> Self {
        Self {
            name,
            description,
            content: sql,
            body: MigrationBody::Sql(sql),
        }
    }

    pub fn function(
        name: &'static str,
        description: &'static str,
        content: &'static str,
        f: impl Fn(&rusqlite::Transaction<'_>) -> rusqlite::Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            description,
            content,
            body: MigrationBody::Fn(Box::new(f)),
        }
    }

    pub fn checksum(&self) -> String {
        checksum_of(self.content)
    }

    pub fn apply(&self, tx: &rusqlite::Transaction<'_>) -> rusqlite::Result<()> {
        match &self.body {
            MigrationBody::Sql(sql) => tx.execute_batch(sql),
            MigrationBody::Fn(f) => f(tx),
        }
    }
}

pub fn checksum_of(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

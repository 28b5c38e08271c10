//! Migration Runtime: ordered, checksummed schema migrations plus cascade
//! triggers, tracked in an append-only `migrations` table.

pub mod error;
pub mod migration;
pub mod runtime;
pub mod schema;

pub use error::{MigrateError, Result};
pub use migration::Migration;
pub use runtime::{ChecksumMismatch, MigrationRuntime, MigrationStatus};
pub use schema::standard_migrations;

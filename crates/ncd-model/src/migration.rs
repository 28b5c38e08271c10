//! Migration record (the `migrations` bookkeeping table's row shape).

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub name: String,
    pub executed_at: NaiveDateTime,
    pub checksum: String,
    pub description: String,
}

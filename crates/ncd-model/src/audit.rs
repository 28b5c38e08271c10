//! Audit fields common to every persisted entity (invariant 7: every insert
//! records `IMPORT_DATE`, `UPDATE_DATE`, `UPLOAD_ID`, `SOURCESYSTEM_CD`,
//! defaulting `SOURCESYSTEM_CD` to `"USER"`).

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default source-system tag applied when an insert does not specify one.
pub const DEFAULT_SOURCE_SYSTEM: &str = "USER";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditFields {
    pub import_date: NaiveDateTime,
    pub update_date: NaiveDateTime,
    pub upload_id: Option<i64>,
    pub source_system_cd: String,
}

impl AuditFields {
    /// Construct audit fields for a brand-new row, stamping both dates to now.
    pub fn new(upload_id: Option<i64>, source_system_cd: Option<String>) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            import_date: now,
            update_date: now,
            upload_id,
            source_system_cd: source_system_cd.unwrap_or_else(|| DEFAULT_SOURCE_SYSTEM.to_string()),
        }
    }

    /// Stamp `update_date` to now, leaving `import_date` untouched.
    pub fn touch(&mut self) {
        self.update_date = Utc::now().naive_utc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_source_system_to_user() {
        let audit = AuditFields::new(None, None);
        assert_eq!(audit.source_system_cd, "USER");
        assert_eq!(audit.import_date, audit.update_date);
    }
}

//! Visit/Encounter dimension.

use crate::audit::AuditFields;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inpatient/outpatient/emergency discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VisitKind {
    Inpatient,
    Outpatient,
    Emergency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub encounter_num: Option<i64>,
    /// Mandatory reference to the owning patient's surrogate id.
    pub patient_num: i64,
    pub start_date: NaiveDate,
    /// Must be `>= start_date` when present.
    pub end_date: Option<NaiveDate>,
    pub active_status_cd: Option<String>,
    pub visit_kind: Option<VisitKind>,
    pub location_cd: Option<String>,
    /// Opaque JSON blob, conventionally carrying `{visitType, notes}`.
    pub visit_blob: BTreeMap<String, serde_json::Value>,
    pub audit: AuditFields,
}

impl Visit {
    pub fn new(patient_num: i64, start_date: NaiveDate) -> Self {
        Self {
            encounter_num: None,
            patient_num,
            start_date,
            end_date: None,
            active_status_cd: None,
            visit_kind: None,
            location_cd: None,
            visit_blob: BTreeMap::new(),
            audit: AuditFields::new(None, None),
        }
    }

    /// Validate the end-date-after-start-date invariant.
    pub fn has_valid_date_order(&self) -> bool {
        self.end_date.map(|e| e >= self.start_date).unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_end_before_start() {
        let mut visit = Visit::new(1, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert!(visit.has_valid_date_order());
        visit.end_date = Some(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        assert!(!visit.has_valid_date_order());
    }
}

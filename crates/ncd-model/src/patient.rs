//! Patient dimension.

use crate::audit::AuditFields;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    /// Surrogate integer id, assigned by storage.
    pub patient_num: Option<i64>,
    /// Unique external code (natural key).
    pub patient_cd: String,
    pub sex_cd: Option<String>,
    pub age_in_years: Option<i32>,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
    /// Demographic code set: language, race, marital status, religion, ...
    pub language_cd: Option<String>,
    pub race_cd: Option<String>,
    pub marital_status_cd: Option<String>,
    pub religion_cd: Option<String>,
    /// Opaque JSON blob for fields with no dedicated column.
    pub patient_blob: BTreeMap<String, serde_json::Value>,
    pub audit: AuditFields,
}

impl Patient {
    /// Construct a new patient row (no surrogate id yet).
    pub fn new(patient_cd: impl Into<String>) -> Self {
        Self {
            patient_num: None,
            patient_cd: patient_cd.into(),
            sex_cd: None,
            age_in_years: None,
            birth_date: None,
            death_date: None,
            language_cd: None,
            race_cd: None,
            marital_status_cd: None,
            religion_cd: None,
            patient_blob: BTreeMap::new(),
            audit: AuditFields::new(None, None),
        }
    }

    /// Whether the patient has a recorded death date.
    pub fn is_deceased(&self) -> bool {
        self.death_date.is_some()
    }
}

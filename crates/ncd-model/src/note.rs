//! Clinical note.

use crate::audit::AuditFields;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub note_num: Option<i64>,
    pub patient_num: i64,
    /// Encounter is optional for a note (a patient-level note needs none).
    pub encounter_num: Option<i64>,
    pub category_cd: Option<String>,
    pub note_body: String,
    pub note_blob: Option<serde_json::Value>,
    pub audit: AuditFields,
}

impl Note {
    pub fn new(patient_num: i64, note_body: impl Into<String>) -> Self {
        Self {
            note_num: None,
            patient_num,
            encounter_num: None,
            category_cd: None,
            note_body: note_body.into(),
            note_blob: None,
            audit: AuditFields::new(None, None),
        }
    }
}

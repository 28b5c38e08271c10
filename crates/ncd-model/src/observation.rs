//! Observation fact.

use crate::audit::AuditFields;
use crate::value::ObservationValue;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub observation_num: Option<i64>,
    pub patient_num: i64,
    pub encounter_num: i64,
    pub concept_cd: String,
    pub value: ObservationValue,
    pub unit_cd: Option<String>,
    pub category_cd: Option<String>,
    pub provider_id: Option<String>,
    pub location_cd: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub instance_num: i32,
    pub observation_blob: BTreeMap<String, serde_json::Value>,
    pub audit: AuditFields,
}

impl Observation {
    pub fn new(
        patient_num: i64,
        encounter_num: i64,
        concept_cd: impl Into<String>,
        value: ObservationValue,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            observation_num: None,
            patient_num,
            encounter_num,
            concept_cd: concept_cd.into(),
            value,
            unit_cd: None,
            category_cd: None,
            provider_id: None,
            location_cd: None,
            start_date,
            end_date: None,
            instance_num: 1,
            observation_blob: BTreeMap::new(),
            audit: AuditFields::new(None, None),
        }
    }
}

/// Row shape of the read-time `patient_observations` view: an observation
/// joined against concept and code-lookup to resolve a display name and a
/// human-readable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientObservationRow {
    pub observation_num: i64,
    pub patient_num: i64,
    pub encounter_num: i64,
    pub concept_cd: String,
    pub concept_name_char: String,
    pub tval_resolved: String,
    pub start_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ObservationValue;

    #[test]
    fn new_observation_defaults_instance_to_one() {
        let obs = Observation::new(
            1,
            1,
            "LOINC:8462-4",
            ObservationValue::Numeric { nval_num: 140.0 },
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
        );
        assert_eq!(obs.instance_num, 1);
        assert_eq!(obs.value.numeric_value(), Some(140.0));
    }
}

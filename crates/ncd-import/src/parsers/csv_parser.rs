//! Two-row-header CSV parser (spec.md §4.7/§4.9): row 1 carries human
//! labels, row 2 the system column names and concept codes. Every data row
//! after that is one visit, pivoted by concept column.
//!
//! Patient and visit correlation keys are not yet surrogate ids at parse
//! time, so they are carried in the opaque blob (`patient_cd`,
//! `encounter_num_original`) for the Database Import Service to resolve.

use crate::error::ImportError;
use chrono::{NaiveDate, Utc};
use ncd_model::{ImportStructure, Observation, ObservationValue, Patient, Visit};
use std::collections::BTreeMap;

const FIXED_COLUMNS: usize = 5; // patient_cd, encounter_num, start_date, end_date, visit_kind

/// Parse a two-header-row CSV bundle. Row-level failures (a row with no
/// `patient_cd`, a malformed CSV record) are collected and returned
/// alongside a successful structure; only a file with no usable header or
/// no importable rows at all is a hard failure.
pub fn parse(content: &[u8]) -> Result<(ImportStructure, Vec<ImportError>), Vec<ImportError>> {
    let mut reader = csv::ReaderBuilder::new().has_headers(false).flexible(true).from_reader(content);
    let mut records = reader.records();

    let _labels = records
        .next()
        .ok_or_else(|| vec![ImportError::new("EMPTY_FILE", "CSV has no header rows")])?
        .map_err(|e| vec![ImportError::new("MALFORMED_CSV", e.to_string()).at_line(1)])?;

    let codes = records
        .next()
        .ok_or_else(|| vec![ImportError::new("MISSING_CODE_ROW", "CSV is missing the system-code header row")])?
        .map_err(|e| vec![ImportError::new("MALFORMED_CSV", e.to_string()).at_line(2)])?;

    let concept_columns: Vec<String> = codes.iter().skip(FIXED_COLUMNS).map(str::to_string).collect();

    let mut patients: BTreeMap<String, Patient> = BTreeMap::new();
    let mut visits = Vec::new();
    let mut observations = Vec::new();
    let mut errors = Vec::new();

    for (row_index, record) in records.enumerate() {
        let line = row_index + 3;
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                errors.push(ImportError::new("MALFORMED_CSV", e.to_string()).at_line(line));
                continue;
            }
        };

        let Some(patient_cd) = record.get(0).filter(|s| !s.is_empty()) else {
            errors.push(ImportError::new("MISSING_PATIENT_ID", "row has no patient_cd").at_line(line));
            continue;
        };

        patients.entry(patient_cd.to_string()).or_insert_with(|| Patient::new(patient_cd));

        let start_date = record
            .get(2)
            .filter(|s| !s.is_empty())
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
            .unwrap_or_else(|| Utc::now().date_naive());
        let end_date = record.get(3).filter(|s| !s.is_empty()).and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());
        let encounter_num_original = record.get(1).filter(|s| !s.is_empty()).map(str::to_string);

        let mut visit = Visit::new(0, start_date);
        visit.end_date = end_date;
        visit.visit_blob.insert("patient_cd".to_string(), serde_json::Value::String(patient_cd.to_string()));
        if let Some(original) = &encounter_num_original {
            visit
                .visit_blob
                .insert("encounter_num_original".to_string(), serde_json::Value::String(original.clone()));
        }
        visits.push(visit);

        for (col_index, concept_cd) in concept_columns.iter().enumerate() {
            let Some(cell) = record.get(FIXED_COLUMNS + col_index).filter(|s| !s.is_empty()) else {
                continue;
            };
            for (instance, part) in cell.split(';').enumerate() {
                let text = part.trim();
                if text.is_empty() {
                    continue;
                }
                let value = match text.parse::<f64>() {
                    Ok(n) => ObservationValue::Numeric { nval_num: n },
                    Err(_) => ObservationValue::Text { tval_char: text.to_string() },
                };
                let mut observation = Observation::new(0, 0, concept_cd.clone(), value, start_date);
                observation.instance_num = instance as i32 + 1;
                observation
                    .observation_blob
                    .insert("patient_cd".to_string(), serde_json::Value::String(patient_cd.to_string()));
                if let Some(original) = &encounter_num_original {
                    observation
                        .observation_blob
                        .insert("encounter_num_original".to_string(), serde_json::Value::String(original.clone()));
                }
                observations.push(observation);
            }
        }
    }

    if patients.is_empty() {
        errors.push(ImportError::new("NO_PATIENTS", "no row produced an importable patient"));
        return Err(errors);
    }

    let structure = ImportStructure::from_data(
        "csv",
        patients.into_values().collect(),
        visits,
        observations,
        Utc::now().naive_utc(),
    );
    Ok((structure, errors))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pivoted_observation_columns() {
        let csv = "Patient,Encounter,Start,End,Kind,Heart Rate\n\
                   patient_cd,encounter_num,start_date,end_date,visit_kind,VITAL:HEART_RATE\n\
                   DEMO_PATIENT_01,ENC1,2024-03-15,,Outpatient,72;75\n";
        let (structure, errors) = parse(csv.as_bytes()).unwrap();
        assert!(errors.is_empty());
        assert_eq!(structure.data.patients.len(), 1);
        assert_eq!(structure.data.visits.len(), 1);
        assert_eq!(structure.data.observations.len(), 2);
        assert_eq!(structure.data.observations[0].concept_cd, "VITAL:HEART_RATE");
        assert_eq!(structure.data.observations[1].instance_num, 2);
    }

    #[test]
    fn missing_patient_id_on_every_row_fails_the_parse() {
        let csv = "Patient\npatient_cd,encounter_num,start_date,end_date,visit_kind\n,,2024-01-01,,Outpatient\n";
        let errors = parse(csv.as_bytes()).unwrap_err();
        assert!(errors.iter().any(|e| e.code == "MISSING_PATIENT_ID"));
        assert!(errors.iter().any(|e| e.code == "NO_PATIENTS"));
    }

    #[test]
    fn a_bad_row_among_good_rows_is_reported_but_does_not_fail_the_parse() {
        let csv = "Patient\npatient_cd,encounter_num,start_date,end_date,visit_kind\n\
                   DEMO_PATIENT_01,,2024-01-01,,Outpatient\n\
                   ,,2024-01-02,,Outpatient\n";
        let (structure, errors) = parse(csv.as_bytes()).unwrap();
        assert_eq!(structure.data.patients.len(), 1);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, "MISSING_PATIENT_ID");
    }
}

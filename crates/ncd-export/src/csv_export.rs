//! CSV export (spec.md §4.9): the inverse pivot of
//! `ncd_import::parsers::csv_parser` — one row per visit, one column per
//! distinct concept code observed against it, `;`-joined when a concept has
//! more than one instance on the same visit.

use crate::error::Result;
use ncd_concept::ConceptCache;
use ncd_model::{ImportStructure, Observation, ObservationValue};
use ncd_storage::Storage;
use std::collections::{BTreeMap, BTreeSet};

fn format_value(value: &ObservationValue) -> String {
    match value {
        ObservationValue::Numeric { nval_num } => nval_num.to_string(),
        other => other.text_value().unwrap_or_default(),
    }
}

pub fn export_to_csv(storage: &Storage, structure: &ImportStructure) -> Result<Vec<u8>> {
    let concept_columns: BTreeSet<String> = structure.data.observations.iter().map(|o| o.concept_cd.clone()).collect();
    let concept_columns: Vec<String> = concept_columns.into_iter().collect();

    let mut observations_by_visit: BTreeMap<i64, Vec<&Observation>> = BTreeMap::new();
    for observation in &structure.data.observations {
        observations_by_visit.entry(observation.encounter_num).or_default().push(observation);
    }

    let concept_cache = ConceptCache::new();
    let resolved = concept_cache.resolve_batch(storage, &concept_columns)?;

    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(Vec::new());

    let mut labels = vec!["Patient".to_string(), "Encounter".to_string(), "Start".to_string(), "End".to_string(), "Kind".to_string()];
    labels.extend(
        concept_columns
            .iter()
            .map(|code| resolved.get(code).map(|c| c.display_label.clone()).unwrap_or_else(|| code.clone())),
    );
    writer.write_record(&labels).map_err(|e| crate::error::ExportError::Csv(e.to_string()))?;

    let mut codes = vec![
        "patient_cd".to_string(),
        "encounter_num".to_string(),
        "start_date".to_string(),
        "end_date".to_string(),
        "visit_kind".to_string(),
    ];
    codes.extend(concept_columns.iter().cloned());
    writer.write_record(&codes).map_err(|e| crate::error::ExportError::Csv(e.to_string()))?;

    let patients_by_num: BTreeMap<i64, &str> = structure
        .data
        .patients
        .iter()
        .filter_map(|p| p.patient_num.map(|n| (n, p.patient_cd.as_str())))
        .collect();

    for visit in &structure.data.visits {
        let Some(encounter_num) = visit.encounter_num else { continue };
        let patient_cd = patients_by_num.get(&visit.patient_num).copied().unwrap_or_default();
        let mut row = vec![
            patient_cd.to_string(),
            encounter_num.to_string(),
            visit.start_date.format("%Y-%m-%d").to_string(),
            visit.end_date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
            visit.visit_kind.map(|k| format!("{k:?}")).unwrap_or_default(),
        ];

        let observations = observations_by_visit.get(&encounter_num);
        for concept_cd in &concept_columns {
            let values: Vec<String> = observations
                .map(|obs| obs.iter().filter(|o| &o.concept_cd == concept_cd).map(|o| format_value(&o.value)).collect())
                .unwrap_or_default();
            row.push(values.join(";"));
        }
        writer.write_record(&row).map_err(|e| crate::error::ExportError::Csv(e.to_string()))?;
    }

    writer.into_inner().map_err(|e| crate::error::ExportError::Csv(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ncd_migrate::{standard_migrations, MigrationRuntime};
    use ncd_model::{Patient, Visit};

    fn setup() -> Storage {
        let mut storage = Storage::connect_in_memory().unwrap();
        let mut runtime = MigrationRuntime::new();
        for m in standard_migrations() {
            runtime = runtime.register(m);
        }
        runtime.apply_all(&mut storage).unwrap();
        storage
    }

    #[test]
    fn pivots_observations_by_concept_column() {
        let storage = setup();
        storage
            .execute_command(
                "INSERT INTO concepts (concept_cd, concept_path, name_char, valtype_cd) \
                 VALUES ('VITAL:HEART_RATE', '\\Vitals\\HeartRate', 'Heart Rate', 'N')",
                [],
            )
            .unwrap();

        let mut patient = Patient::new("DEMO_PATIENT_01");
        patient.patient_num = Some(1);
        let mut visit = Visit::new(1, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        visit.encounter_num = Some(10);
        let mut obs = Observation::new(1, 10, "VITAL:HEART_RATE", ObservationValue::Numeric { nval_num: 72.0 }, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        obs.observation_num = Some(100);

        let structure = ImportStructure::from_data("csv", vec![patient], vec![visit], vec![obs], chrono::Utc::now().naive_utc());
        let bytes = export_to_csv(&storage, &structure).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("Heart Rate"));
        assert!(text.contains("VITAL:HEART_RATE"));
        assert!(text.contains("DEMO_PATIENT_01"));
        assert!(text.contains("72"));
    }

    #[test]
    fn unresolved_concept_column_falls_back_to_its_raw_code_as_the_label() {
        let storage = setup();
        let mut patient = Patient::new("DEMO_PATIENT_02");
        patient.patient_num = Some(1);
        let mut visit = Visit::new(1, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        visit.encounter_num = Some(10);
        let mut obs = Observation::new(1, 10, "UNKNOWN:CODE", ObservationValue::Text { tval_char: "x".to_string() }, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        obs.observation_num = Some(100);

        let structure = ImportStructure::from_data("csv", vec![patient], vec![visit], vec![obs], chrono::Utc::now().naive_utc());
        let bytes = export_to_csv(&storage, &structure).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("UNKNOWN:CODE"));
    }
}

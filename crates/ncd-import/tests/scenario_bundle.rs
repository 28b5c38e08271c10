//! Reproduces the scenario literals from spec.md §8: a two-patient CSV
//! bundle (`DEMO_PATIENT_01`/`DEMO_PATIENT_02`), a duplicate patient
//! (`ERROR_TEST`), and an observation with no visit of its own
//! (`OBS_NO_VISIT_PATIENT`).

use ncd_import::outcome::import_file;
use ncd_import::service::{import_to_database, DuplicateStrategy, ImportServiceOptions};
use ncd_migrate::{standard_migrations, MigrationRuntime};
use ncd_repo::{PatientRepository, Repository, SqlitePatientRepository, VisitRepository, SqliteVisitRepository};
use ncd_storage::Storage;

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
fn two_patient_csv_bundle_imports_both_patients() {
    let storage = setup();
    let csv = "Patient,Encounter,Start,End,Kind,Heart Rate,Weight\n\
               patient_cd,encounter_num,start_date,end_date,visit_kind,VITAL:HEART_RATE,VITAL:WEIGHT\n\
               DEMO_PATIENT_01,ENC1,2024-03-15,2024-03-16,Outpatient,72,68.5\n\
               DEMO_PATIENT_02,ENC2,2024-03-16,,Inpatient,88,74.2\n";

    let outcome = import_file(csv.as_bytes(), "bundle.csv");
    assert!(outcome.success);
    let structure = outcome.data.unwrap();
    assert_eq!(structure.data.patients.len(), 2);

    let result = import_to_database(&storage, &structure, ImportServiceOptions::default()).unwrap();
    assert_eq!(result.statistics.patient_count, 2);
    assert_eq!(result.statistics.visit_count, 2);
    assert_eq!(result.statistics.observation_count, 4);

    let patients = SqlitePatientRepository::new(&storage);
    assert!(patients.find_by_patient_code("DEMO_PATIENT_01").unwrap().is_some());
    assert!(patients.find_by_patient_code("DEMO_PATIENT_02").unwrap().is_some());
}

#[test]
fn error_test_duplicate_patient_is_rejected_under_error_strategy() {
    let storage = setup();
    let patients = SqlitePatientRepository::new(&storage);
    patients.create(&ncd_model::Patient::new("ERROR_TEST")).unwrap();

    let csv = "Patient\npatient_cd,encounter_num,start_date,end_date,visit_kind\nERROR_TEST,,2024-01-01,,Outpatient\n";
    let outcome = import_file(csv.as_bytes(), "bundle.csv");
    let structure = outcome.data.unwrap();

    let opts = ImportServiceOptions { duplicate_strategy: DuplicateStrategy::Error, ..Default::default() };
    let result = import_to_database(&storage, &structure, opts);
    assert!(result.is_err());
}

#[test]
fn observation_with_no_visit_gets_a_default_encounter() {
    let storage = setup();
    let mut observation = ncd_model::Observation::new(
        0,
        0,
        "VITAL:HEART_RATE",
        ncd_model::ObservationValue::Numeric { nval_num: 95.0 },
        chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
    );
    observation
        .observation_blob
        .insert("patient_cd".to_string(), serde_json::Value::String("OBS_NO_VISIT_PATIENT".to_string()));

    let structure = ncd_model::ImportStructure::from_data(
        "json",
        vec![ncd_model::Patient::new("OBS_NO_VISIT_PATIENT")],
        Vec::new(),
        vec![observation],
        chrono::Utc::now().naive_utc(),
    );

    let result = import_to_database(&storage, &structure, ImportServiceOptions::default()).unwrap();
    let patient_num = *result.id_maps.patient_id_map.get("OBS_NO_VISIT_PATIENT").unwrap();

    let visits = SqliteVisitRepository::new(&storage);
    assert_eq!(visits.find_by_patient_num(patient_num).unwrap().len(), 1);
}

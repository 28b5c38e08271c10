//! Database Import Service (spec.md §4.8): takes a parsed [`ImportStructure`]
//! and writes it through the Repository Layer, resolving the natural-key
//! correlation carried in each row's opaque blob into storage-assigned
//! surrogate ids.
//!
//! Patients import first, then visits (resolving `patient_cd` against the
//! patient id map just built), then observations (resolving patient via the
//! same map and visit via the originating encounter id, falling back to a
//! default visit when observations arrive with no encounter of their own).
//! This mirrors the dependency order of the schema's foreign keys.
//!
//! Each observation is also run through the Concept Resolution Cache (its
//! authoritative `VALTYPE_CD` overrides whatever the incoming row carried,
//! per invariant 2) and the Data Validator before it is persisted; a failing
//! validation rejects that row as a non-fatal [`ImportError`] rather than
//! aborting the whole batch.

use crate::error::{ImportError, Result, ServiceError};
use chrono::NaiveDate;
use ncd_concept::ConceptCache;
use ncd_model::value::ValueType;
use ncd_model::{CqlRule, ImportStatistics, ImportStructure, Observation, ObservationValue, Patient, Visit};
use ncd_repo::{
    CqlRepository, ObservationRepository, PatientRepository, Repository, SqliteCqlRepository,
    SqliteObservationRepository, SqlitePatientRepository, SqliteVisitRepository, VisitRepository,
};
use ncd_storage::Storage;
use ncd_validate::{ConceptRule, ValidationInput, ValidationValue, Validator};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// What to do when an incoming patient's `patient_cd` already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateStrategy {
    /// Keep the existing row, skip the incoming one.
    Skip,
    /// Overwrite the existing row's mutable fields with the incoming ones.
    Update,
    /// Treat a duplicate as a hard import error.
    Error,
}

#[derive(Debug, Clone, Copy)]
pub struct ImportServiceOptions {
    pub duplicate_strategy: DuplicateStrategy,
    /// Records processed between cooperative timeout checks.
    pub batch_size: usize,
    /// Wall-clock budget for the whole import; checked every `batch_size`
    /// records. Exceeding it rolls the transaction back.
    pub transaction_timeout: Duration,
}

impl Default for ImportServiceOptions {
    fn default() -> Self {
        Self {
            duplicate_strategy: DuplicateStrategy::Skip,
            batch_size: 500,
            transaction_timeout: Duration::from_secs(30),
        }
    }
}

/// Cooperative cancellation point: called every `batch_size` records.
fn check_timeout(start: Instant, opts: &ImportServiceOptions, processed: usize) -> Result<()> {
    if opts.batch_size > 0 && processed % opts.batch_size == 0 && start.elapsed() > opts.transaction_timeout {
        return Err(ServiceError::TransactionTimeout(format!(
            "import exceeded {:?} after {processed} records",
            opts.transaction_timeout
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IdMaps {
    pub patient_id_map: HashMap<String, i64>,
    pub visit_id_map: HashMap<String, i64>,
}

#[derive(Debug, Clone)]
pub struct ImportResult {
    pub success: bool,
    pub statistics: ImportStatistics,
    pub id_maps: IdMaps,
    pub errors: Vec<ImportError>,
}

fn patch_patient(patch_target: &mut Patient, incoming: &Patient) {
    patch_target.sex_cd = incoming.sex_cd.clone().or_else(|| patch_target.sex_cd.clone());
    patch_target.age_in_years = incoming.age_in_years.or(patch_target.age_in_years);
    patch_target.birth_date = incoming.birth_date.or(patch_target.birth_date);
    patch_target.death_date = incoming.death_date.or(patch_target.death_date);
    patch_target.language_cd = incoming.language_cd.clone().or_else(|| patch_target.language_cd.clone());
    patch_target.race_cd = incoming.race_cd.clone().or_else(|| patch_target.race_cd.clone());
    patch_target.marital_status_cd = incoming.marital_status_cd.clone().or_else(|| patch_target.marital_status_cd.clone());
    patch_target.religion_cd = incoming.religion_cd.clone().or_else(|| patch_target.religion_cd.clone());
}

fn blob_str(blob: &std::collections::BTreeMap<String, serde_json::Value>, key: &str) -> Option<String> {
    blob.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

/// Recast `value` as the shape `target` demands, carrying its content across
/// as best it can (numeric text parses to a number, everything else falls
/// back to its canonical text encoding). A no-op when `value` already has
/// `target`'s shape.
fn route_value(value: &ObservationValue, target: ValueType, start_date: NaiveDate) -> ObservationValue {
    if value.value_type() == target {
        return value.clone();
    }
    match target {
        ValueType::Numeric => {
            let numeric = value.numeric_value().or_else(|| value.text_value()?.parse().ok()).unwrap_or_default();
            ObservationValue::Numeric { nval_num: numeric }
        }
        ValueType::Text => ObservationValue::Text { tval_char: value.text_value().unwrap_or_default() },
        ValueType::Date => {
            let text = value.text_value().unwrap_or_default();
            let parsed = NaiveDate::parse_from_str(&text, "%Y-%m-%d").unwrap_or(start_date);
            ObservationValue::Date { tval_char: parsed }
        }
        ValueType::Blob => ObservationValue::Blob { tval_char: ncd_model::value::BlobValue::default() },
        ValueType::Selection => ObservationValue::Selection { tval_char: value.text_value().unwrap_or_default() },
        ValueType::Finding => ObservationValue::Finding { tval_char: value.text_value().unwrap_or_default() },
        ValueType::Answer => ObservationValue::Answer { tval_char: value.text_value().unwrap_or_default() },
        ValueType::Questionnaire => ObservationValue::Questionnaire { tval_char: value.text_value().unwrap_or_default() },
    }
}

fn to_validation_value(value: &ObservationValue) -> ValidationValue {
    match value {
        ObservationValue::Numeric { nval_num } => ValidationValue::Numeric(*nval_num),
        ObservationValue::Date { tval_char } => ValidationValue::Date(*tval_char),
        ObservationValue::Blob { tval_char } => ValidationValue::Blob { size_bytes: tval_char.size_bytes().unwrap_or(0) },
        other => ValidationValue::Text(other.text_value().unwrap_or_default()),
    }
}

fn import_patients(
    storage: &Storage,
    patients: &[Patient],
    opts: &ImportServiceOptions,
    errors: &mut Vec<ImportError>,
    start: Instant,
) -> Result<HashMap<String, i64>> {
    let repo = SqlitePatientRepository::new(storage);
    let mut patient_id_map = HashMap::new();

    for (processed, patient) in patients.iter().enumerate() {
        check_timeout(start, opts, processed)?;
        match repo.find_by_patient_code(&patient.patient_cd)? {
            None => {
                let created = repo.create(patient)?;
                patient_id_map.insert(patient.patient_cd.clone(), created.patient_num.expect("create assigns an id"));
            }
            Some(existing) => match opts.duplicate_strategy {
                DuplicateStrategy::Skip => {
                    errors.push(ImportError::new("DUPLICATE_PATIENT_SKIPPED", format!("{} already exists", patient.patient_cd)));
                    patient_id_map.insert(patient.patient_cd.clone(), existing.patient_num.expect("existing row has an id"));
                }
                DuplicateStrategy::Update => {
                    let mut merged = existing.clone();
                    patch_patient(&mut merged, patient);
                    let patch = serde_json::json!({
                        "sex_cd": merged.sex_cd,
                        "age_in_years": merged.age_in_years,
                        "death_date": merged.death_date.map(|d| d.format("%Y-%m-%d").to_string()),
                        "language_cd": merged.language_cd,
                        "race_cd": merged.race_cd,
                        "marital_status_cd": merged.marital_status_cd,
                        "religion_cd": merged.religion_cd,
                    });
                    let updated = repo.update(existing.patient_num.expect("existing row has an id"), &patch)?;
                    patient_id_map.insert(patient.patient_cd.clone(), updated.patient_num.expect("updated row has an id"));
                }
                DuplicateStrategy::Error => {
                    return Err(ServiceError::DuplicatePatient(patient.patient_cd.clone()));
                }
            },
        }
    }

    Ok(patient_id_map)
}

fn import_visits(
    storage: &Storage,
    visits: &[Visit],
    patient_id_map: &HashMap<String, i64>,
    errors: &mut Vec<ImportError>,
    opts: &ImportServiceOptions,
    start: Instant,
) -> Result<HashMap<String, i64>> {
    let repo = SqliteVisitRepository::new(storage);
    let mut visit_id_map = HashMap::new();

    for (processed, visit) in visits.iter().enumerate() {
        check_timeout(start, opts, processed)?;
        let Some(patient_cd) = blob_str(&visit.visit_blob, "patient_cd") else {
            errors.push(ImportError::new("VISIT_MISSING_PATIENT_CD", "visit has no patient_cd in its blob"));
            continue;
        };
        let Some(&patient_num) = patient_id_map.get(&patient_cd) else {
            errors.push(ImportError::new("VISIT_UNRESOLVED_PATIENT", format!("no patient id mapped for {patient_cd}")));
            continue;
        };

        let mut resolved = visit.clone();
        resolved.patient_num = patient_num;
        let created = repo.create_visit(&resolved)?;
        if let Some(original) = blob_str(&visit.visit_blob, "encounter_num_original") {
            visit_id_map.insert(original, created.encounter_num.expect("create assigns an id"));
        }
    }

    Ok(visit_id_map)
}

/// Resolve (or create) the encounter an observation belongs to.
fn resolve_encounter(
    storage: &Storage,
    patient_num: i64,
    encounter_num_original: Option<&str>,
    visit_id_map: &HashMap<String, i64>,
    start_date: NaiveDate,
) -> Result<i64> {
    if let Some(original) = encounter_num_original {
        if let Some(&encounter_num) = visit_id_map.get(original) {
            return Ok(encounter_num);
        }
    }
    let repo = SqliteVisitRepository::new(storage);
    let created = repo.create_visit(&Visit::new(patient_num, start_date))?;
    Ok(created.encounter_num.expect("create assigns an id"))
}

/// Link every CQL rule attached to `concept_cd` onto `validator`, once per
/// concept code for the lifetime of an import call.
fn ensure_concept_rules_linked(storage: &Storage, concept_cd: &str, validator: &mut Validator, linked: &mut HashSet<String>) -> Result<()> {
    if !linked.insert(concept_cd.to_string()) {
        return Ok(());
    }
    let cql_repo = SqliteCqlRepository::new(storage);
    for rule in cql_repo.find_by_concept_code(concept_cd)? {
        validator.link_concept_rule(
            concept_cd.to_string(),
            ConceptRule {
                rule_id: rule.rule_id.map(|id| id.to_string()).unwrap_or_default(),
                rule_name: rule.name,
                body: CqlRule::decode_body(&rule.body),
            },
        );
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn import_observations(
    storage: &Storage,
    observations: &[Observation],
    patient_id_map: &HashMap<String, i64>,
    visit_id_map: &mut HashMap<String, i64>,
    errors: &mut Vec<ImportError>,
    opts: &ImportServiceOptions,
    start: Instant,
    concept_cache: &ConceptCache,
    validator: &mut Validator,
    linked_concepts: &mut HashSet<String>,
) -> Result<usize> {
    let repo = SqliteObservationRepository::new(storage);
    let mut imported = 0usize;

    for (processed, observation) in observations.iter().enumerate() {
        check_timeout(start, opts, processed)?;
        let Some(patient_cd) = blob_str(&observation.observation_blob, "patient_cd") else {
            errors.push(ImportError::new("OBSERVATION_MISSING_PATIENT_CD", "observation has no patient_cd in its blob"));
            continue;
        };
        let Some(&patient_num) = patient_id_map.get(&patient_cd) else {
            errors.push(ImportError::new("OBSERVATION_UNRESOLVED_PATIENT", format!("no patient id mapped for {patient_cd}")));
            continue;
        };

        let encounter_num_original = blob_str(&observation.observation_blob, "encounter_num_original");
        let encounter_num = resolve_encounter(storage, patient_num, encounter_num_original.as_deref(), visit_id_map, observation.start_date)?;
        if let Some(original) = encounter_num_original {
            visit_id_map.entry(original).or_insert(encounter_num);
        }

        let mut resolved = observation.clone();
        resolved.patient_num = patient_num;
        resolved.encounter_num = encounter_num;

        let concept = concept_cache.resolve(storage, &resolved.concept_cd)?;
        if concept.resolved {
            resolved.value = route_value(&resolved.value, concept.value_type, resolved.start_date);
            if resolved.unit_cd.is_none() {
                resolved.unit_cd = concept.unit_cd.clone();
            }
        }

        ensure_concept_rules_linked(storage, &resolved.concept_cd, validator, linked_concepts)?;
        let validation_input = ValidationInput::new(to_validation_value(&resolved.value)).with_concept(resolved.concept_cd.clone());
        let report = validator.validate(&validation_input)?;
        if !report.is_valid {
            for diagnostic in &report.errors {
                errors.push(ImportError::new(diagnostic.code.clone(), diagnostic.message.clone()));
            }
            continue;
        }

        repo.create_observation(&resolved)?;
        imported += 1;
    }

    Ok(imported)
}

/// Import a parsed [`ImportStructure`] into storage: patients, then visits,
/// then observations, in that order, honouring `opts.duplicate_strategy`
/// for patients already present by `patient_cd`.
///
/// The whole pipeline runs inside a single database transaction (begun and
/// committed here, around calls that each use `storage`'s shared connection
/// directly) so that id maps built in one phase are visible to the next but
/// nothing is durable until every phase succeeds; any error rolls the entire
/// import back, matching the "error" duplicate strategy's all-or-nothing
/// contract and the cooperative `transaction_timeout` cancellation point.
pub fn import_to_database(storage: &Storage, structure: &ImportStructure, opts: ImportServiceOptions) -> Result<ImportResult> {
    if structure.data.patients.is_empty() {
        return Err(ServiceError::InvalidStructure("no patients to import".to_string()));
    }

    storage.execute_command("BEGIN", [])?;
    let outcome = run_import_phases(storage, structure, &opts);

    match outcome {
        Ok(result) => {
            storage.execute_command("COMMIT", [])?;
            Ok(result)
        }
        Err(err) => {
            storage.execute_command("ROLLBACK", [])?;
            Err(err)
        }
    }
}

fn run_import_phases(storage: &Storage, structure: &ImportStructure, opts: &ImportServiceOptions) -> Result<ImportResult> {
    let start = Instant::now();
    let mut errors = Vec::new();
    let patient_id_map = import_patients(storage, &structure.data.patients, opts, &mut errors, start)?;
    let mut visit_id_map = import_visits(storage, &structure.data.visits, &patient_id_map, &mut errors, opts, start)?;

    let concept_cache = ConceptCache::new();
    let mut validator = Validator::new();
    let mut linked_concepts = HashSet::new();
    let observation_count = import_observations(
        storage,
        &structure.data.observations,
        &patient_id_map,
        &mut visit_id_map,
        &mut errors,
        opts,
        start,
        &concept_cache,
        &mut validator,
        &mut linked_concepts,
    )?;

    let statistics = ImportStatistics {
        patient_count: patient_id_map.len(),
        visit_count: visit_id_map.len(),
        observation_count,
        fetched_at: structure.statistics.fetched_at,
    };

    Ok(ImportResult {
        success: true,
        statistics,
        id_maps: IdMaps { patient_id_map, visit_id_map },
        errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::csv_parser;
    use ncd_migrate::{standard_migrations, MigrationRuntime};

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
    fn imports_patients_visits_and_observations_in_order() {
        let storage = setup();
        let csv = "Patient,Heart Rate\npatient_cd,encounter_num,start_date,end_date,visit_kind,VITAL:HEART_RATE\nDEMO_PATIENT_01,ENC1,2024-03-15,,Outpatient,72;75\n";
        let (structure, _errors) = csv_parser::parse(csv.as_bytes()).unwrap();

        let result = import_to_database(&storage, &structure, ImportServiceOptions::default()).unwrap();
        assert!(result.success);
        assert_eq!(result.statistics.patient_count, 1);
        assert_eq!(result.statistics.visit_count, 1);
        assert_eq!(result.statistics.observation_count, 2);

        let patients = SqlitePatientRepository::new(&storage);
        assert!(patients.find_by_patient_code("DEMO_PATIENT_01").unwrap().is_some());
    }

    #[test]
    fn duplicate_patient_with_error_strategy_aborts() {
        let storage = setup();
        let patients = SqlitePatientRepository::new(&storage);
        patients.create(&Patient::new("DEMO_PATIENT_01")).unwrap();

        let structure = ImportStructure::from_data(
            "csv",
            vec![Patient::new("DEMO_PATIENT_01")],
            Vec::new(),
            Vec::new(),
            chrono::Utc::now().naive_utc(),
        );
        let opts = ImportServiceOptions { duplicate_strategy: DuplicateStrategy::Error, ..Default::default() };
        let result = import_to_database(&storage, &structure, opts);
        assert!(matches!(result, Err(ServiceError::DuplicatePatient(_))));
    }

    #[test]
    fn observation_with_no_encounter_gets_a_default_visit() {
        let storage = setup();
        let mut observation = Observation::new(0, 0, "VITAL:HEART_RATE", ncd_model::ObservationValue::Numeric { nval_num: 80.0 }, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        observation.observation_blob.insert("patient_cd".to_string(), serde_json::Value::String("OBS_NO_VISIT_PATIENT".to_string()));
        let structure = ImportStructure::from_data(
            "csv",
            vec![Patient::new("OBS_NO_VISIT_PATIENT")],
            Vec::new(),
            vec![observation],
            chrono::Utc::now().naive_utc(),
        );

        let result = import_to_database(&storage, &structure, ImportServiceOptions::default()).unwrap();
        assert_eq!(result.statistics.observation_count, 1);

        let patient_num = *result.id_maps.patient_id_map.get("OBS_NO_VISIT_PATIENT").unwrap();
        let visits = SqliteVisitRepository::new(&storage);
        assert_eq!(visits.find_by_patient_num(patient_num).unwrap().len(), 1);
    }

    #[test]
    fn duplicate_patient_error_strategy_rolls_back_the_whole_batch() {
        let storage = setup();
        let patients = SqlitePatientRepository::new(&storage);
        patients.create(&Patient::new("EXISTING_PATIENT")).unwrap();

        let structure = ImportStructure::from_data(
            "csv",
            vec![Patient::new("NEW_PATIENT"), Patient::new("EXISTING_PATIENT")],
            Vec::new(),
            Vec::new(),
            chrono::Utc::now().naive_utc(),
        );
        let opts = ImportServiceOptions { duplicate_strategy: DuplicateStrategy::Error, ..Default::default() };
        let result = import_to_database(&storage, &structure, opts);
        assert!(matches!(result, Err(ServiceError::DuplicatePatient(_))));

        // NEW_PATIENT was created before the duplicate was hit; rollback must
        // have undone it along with everything else in the same call.
        assert!(patients.find_by_patient_code("NEW_PATIENT").unwrap().is_none());
    }

    #[test]
    fn check_timeout_rejects_once_the_wall_clock_budget_is_exceeded() {
        let over_budget_start = Instant::now() - Duration::from_secs(60);
        let opts = ImportServiceOptions { transaction_timeout: Duration::from_secs(30), batch_size: 1, ..Default::default() };
        assert!(check_timeout(over_budget_start, &opts, 0).is_err());
    }

    #[test]
    fn check_timeout_only_checks_at_batch_boundaries() {
        let over_budget_start = Instant::now() - Duration::from_secs(60);
        let opts = ImportServiceOptions { transaction_timeout: Duration::from_secs(30), batch_size: 10, ..Default::default() };
        assert!(check_timeout(over_budget_start, &opts, 3).is_ok());
        assert!(check_timeout(over_budget_start, &opts, 10).is_err());
    }

    #[test]
    fn known_concept_overrides_the_incoming_valtype_cd() {
        let storage = setup();
        storage
            .execute_command(
                "INSERT INTO concepts (concept_cd, concept_path, name_char, valtype_cd) \
                 VALUES ('LOINC:2947-0', '\\Labs\\Sodium', 'Sodium', 'N')",
                [],
            )
            .unwrap();

        let mut observation = Observation::new(
            0,
            0,
            "LOINC:2947-0",
            ObservationValue::Text { tval_char: "140".to_string() },
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
        );
        observation.observation_blob.insert("patient_cd".to_string(), serde_json::Value::String("OBS_NO_VISIT_PATIENT".to_string()));
        let structure = ImportStructure::from_data(
            "csv",
            vec![Patient::new("OBS_NO_VISIT_PATIENT")],
            Vec::new(),
            vec![observation],
            chrono::Utc::now().naive_utc(),
        );

        let result = import_to_database(&storage, &structure, ImportServiceOptions::default()).unwrap();
        assert_eq!(result.statistics.observation_count, 1);

        let patient_num = *result.id_maps.patient_id_map.get("OBS_NO_VISIT_PATIENT").unwrap();
        let observations = SqliteObservationRepository::new(&storage);
        let stored = observations.find_by_patient_num(patient_num).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].value.value_type(), ValueType::Numeric);
        assert_eq!(stored[0].value.numeric_value(), Some(140.0));
    }

    #[test]
    fn observation_failing_business_rule_validation_is_rejected_not_aborted() {
        let storage = setup();
        let mut observation = Observation::new(
            0,
            0,
            "VITAL:HEART_RATE",
            ObservationValue::Numeric { nval_num: 9000.0 },
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );
        observation.observation_blob.insert("patient_cd".to_string(), serde_json::Value::String("OBS_NO_VISIT_PATIENT".to_string()));
        let structure = ImportStructure::from_data(
            "csv",
            vec![Patient::new("OBS_NO_VISIT_PATIENT")],
            Vec::new(),
            vec![observation],
            chrono::Utc::now().naive_utc(),
        );

        let result = import_to_database(&storage, &structure, ImportServiceOptions::default()).unwrap();
        assert_eq!(result.statistics.observation_count, 0);
        assert!(result.errors.iter().any(|e| e.code == "IMPLAUSIBLE_HEART_RATE"));
    }
}

//! Observation fact repository (spec.md §4.4 `ObservationRepository`).
//!
//! Enforces value-type routing (invariant 2): the stored `nval_num`/`tval_char`
//! pair is derived from the `ObservationValue` variant, never set ad hoc.

use crate::common::{FindOptions, Page, Repository};
use crate::error::{RepoError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use ncd_model::value::{BlobValue, ValueType};
use ncd_model::{AuditFields, Observation, ObservationValue, PatientObservationRow};
use ncd_storage::Storage;
use rusqlite::{params, Row};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq)]
pub struct ObservationStatistics {
    pub total: u64,
    pub by_value_type: HashMap<String, u64>,
}

pub trait ObservationRepository: Repository<Observation> {
    fn create_observation(&self, entity: &Observation) -> Result<Observation>;
    fn find_by_patient_num(&self, patient_num: i64) -> Result<Vec<Observation>>;
    fn find_by_visit_num(&self, encounter_num: i64) -> Result<Vec<Observation>>;
    fn find_by_concept_code(&self, concept_cd: &str) -> Result<Vec<Observation>>;
    fn find_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Observation>>;
    fn find_with_blob_data(&self) -> Result<Vec<Observation>>;
    fn find_by_source_system(&self, source_system_cd: &str) -> Result<Vec<Observation>>;
    fn get_observation_statistics(&self, patient_num: i64) -> Result<ObservationStatistics>;
    fn patient_observations_view(&self, patient_num: i64) -> Result<Vec<PatientObservationRow>>;
}

pub struct SqliteObservationRepository<'a> {
    storage: &'a Storage,
}

impl<'a> SqliteObservationRepository<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }
}

fn value_to_columns(value: &ObservationValue) -> (Option<f64>, Option<String>) {
    (value.numeric_value(), value.text_value())
}

fn columns_to_value(valtype_cd: &str, nval_num: Option<f64>, tval_char: Option<String>) -> rusqlite::Result<ObservationValue> {
    let value_type = ValueType::from_code(valtype_cd.chars().next().unwrap_or('T')).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, "unknown valtype_cd".into())
    })?;
    Ok(match value_type {
        ValueType::Numeric => ObservationValue::Numeric { nval_num: nval_num.unwrap_or_default() },
        ValueType::Text => ObservationValue::Text { tval_char: tval_char.unwrap_or_default() },
        ValueType::Date => ObservationValue::Date {
            tval_char: tval_char
                .as_deref()
                .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
                .unwrap_or_default(),
        },
        ValueType::Blob => ObservationValue::Blob {
            tval_char: tval_char
                .as_deref()
                .and_then(|s| serde_json::from_str::<BlobValue>(s).ok())
                .unwrap_or_default(),
        },
        ValueType::Selection => ObservationValue::Selection { tval_char: tval_char.unwrap_or_default() },
        ValueType::Finding => ObservationValue::Finding { tval_char: tval_char.unwrap_or_default() },
        ValueType::Answer => ObservationValue::Answer { tval_char: tval_char.unwrap_or_default() },
        ValueType::Questionnaire => ObservationValue::Questionnaire { tval_char: tval_char.unwrap_or_default() },
    })
}

fn row_to_observation(row: &Row<'_>) -> rusqlite::Result<Observation> {
    let blob_json: Option<String> = row.get("observation_blob")?;
    let observation_blob: BTreeMap<String, Value> = blob_json.and_then(|s| serde_json::from_str(&s).ok()).unwrap_or_default();
    let valtype_cd: String = row.get("valtype_cd")?;
    let value = columns_to_value(&valtype_cd, row.get("nval_num")?, row.get("tval_char")?)?;

    Ok(Observation {
        observation_num: Some(row.get("observation_num")?),
        patient_num: row.get("patient_num")?,
        encounter_num: row.get("encounter_num")?,
        concept_cd: row.get("concept_cd")?,
        value,
        unit_cd: row.get("unit_cd")?,
        category_cd: row.get("category_cd")?,
        provider_id: row.get("provider_id")?,
        location_cd: row.get("location_cd")?,
        start_date: NaiveDate::parse_from_str(&row.get::<_, String>("start_date")?, "%Y-%m-%d").unwrap_or_default(),
        end_date: row.get::<_, Option<String>>("end_date")?.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        instance_num: row.get("instance_num")?,
        observation_blob,
        audit: AuditFields {
            import_date: row.get::<_, String>("import_date")?.parse::<NaiveDateTime>().unwrap_or_default(),
            update_date: row.get::<_, String>("update_date")?.parse::<NaiveDateTime>().unwrap_or_default(),
            upload_id: row.get("upload_id")?,
            source_system_cd: row.get("sourcesystem_cd")?,
        },
    })
}

const SELECT_COLUMNS: &str = "observation_num, patient_num, encounter_num, concept_cd, valtype_cd, \
    nval_num, tval_char, unit_cd, category_cd, provider_id, location_cd, start_date, end_date, \
    instance_num, observation_blob, import_date, update_date, upload_id, sourcesystem_cd";

impl<'a> Repository<Observation> for SqliteObservationRepository<'a> {
    fn find_by_id(&self, id: i64) -> Result<Option<Observation>> {
        let rows = self.storage.execute_query(
            &format!("SELECT {SELECT_COLUMNS} FROM observations WHERE observation_num = ?1"),
            params![id],
            row_to_observation,
        )?;
        Ok(rows.into_iter().next())
    }

    fn find_all(&self, options: &FindOptions) -> Result<Vec<Observation>> {
        let mut sql = format!("SELECT {SELECT_COLUMNS} FROM observations");
        if let Some(order_by) = &options.order_by {
            sql.push_str(&format!(" ORDER BY {order_by} {}", if options.descending { "DESC" } else { "ASC" }));
        }
        if let Some(limit) = options.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        Ok(self.storage.execute_query(&sql, [], row_to_observation)?)
    }

    fn create(&self, entity: &Observation) -> Result<Observation> {
        let (nval_num, tval_char) = value_to_columns(&entity.value);
        let valtype_cd = entity.value.value_type().code().to_string();
        let blob = serde_json::to_string(&entity.observation_blob).unwrap_or_else(|_| "{}".to_string());
        self.storage.execute_command(
            "INSERT INTO observations (patient_num, encounter_num, concept_cd, valtype_cd, nval_num, \
             tval_char, unit_cd, category_cd, provider_id, location_cd, start_date, end_date, \
             instance_num, observation_blob, import_date, update_date, upload_id, sourcesystem_cd) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            params![
                entity.patient_num,
                entity.encounter_num,
                entity.concept_cd,
                valtype_cd,
                nval_num,
                tval_char,
                entity.unit_cd,
                entity.category_cd,
                entity.provider_id,
                entity.location_cd,
                entity.start_date.format("%Y-%m-%d").to_string(),
                entity.end_date.map(|d| d.format("%Y-%m-%d").to_string()),
                entity.instance_num,
                blob,
                entity.audit.import_date.to_string(),
                entity.audit.update_date.to_string(),
                entity.audit.upload_id,
                entity.audit.source_system_cd,
            ],
        )?;
        let id = self.storage.connection().last_insert_rowid();
        self.find_by_id(id)?.ok_or_else(|| RepoError::NotFound("observation just inserted".to_string()))
    }

    fn update(&self, id: i64, patch: &Value) -> Result<Observation> {
        let mut obs = self.find_by_id(id)?.ok_or_else(|| RepoError::NotFound(format!("observation {id}")))?;
        if let Some(obj) = patch.as_object() {
            if let Some(v) = obj.get("unit_cd").and_then(|v| v.as_str()) {
                obs.unit_cd = Some(v.to_string());
            }
            if let Some(v) = obj.get("category_cd").and_then(|v| v.as_str()) {
                obs.category_cd = Some(v.to_string());
            }
            if let Some(v) = obj.get("end_date").and_then(|v| v.as_str()) {
                obs.end_date = NaiveDate::parse_from_str(v, "%Y-%m-%d").ok();
            }
        }
        obs.audit.touch();
        self.storage.execute_command(
            "UPDATE observations SET unit_cd = ?1, category_cd = ?2, end_date = ?3, update_date = ?4 \
             WHERE observation_num = ?5",
            params![
                obs.unit_cd,
                obs.category_cd,
                obs.end_date.map(|d| d.format("%Y-%m-%d").to_string()),
                obs.audit.update_date.to_string(),
                id,
            ],
        )?;
        self.find_by_id(id)?.ok_or_else(|| RepoError::NotFound(format!("observation {id}")))
    }

    fn delete(&self, id: i64) -> Result<bool> {
        let outcome = self.storage.execute_command("DELETE FROM observations WHERE observation_num = ?1", params![id])?;
        Ok(outcome.changes > 0)
    }

    fn count(&self, criteria: Option<&str>) -> Result<u64> {
        let sql = match criteria {
            Some(c) => format!("SELECT COUNT(*) FROM observations WHERE {c}"),
            None => "SELECT COUNT(*) FROM observations".to_string(),
        };
        let count: i64 = self.storage.execute_query(&sql, [], |row| row.get(0))?[0];
        Ok(count as u64)
    }

    fn find_paginated(&self, page: u32, page_size: u32, criteria: Option<&str>) -> Result<Page<Observation>> {
        let offset = page.saturating_sub(1) * page_size;
        let where_clause = criteria.map(|c| format!(" WHERE {c}")).unwrap_or_default();
        let sql = format!("SELECT {SELECT_COLUMNS} FROM observations{where_clause} LIMIT {page_size} OFFSET {offset}");
        let rows = self.storage.execute_query(&sql, [], row_to_observation)?;
        let total = self.count(criteria)?;
        Ok(Page { rows, total, page, page_size })
    }

    fn search(&self, text: &str, columns: &[&str]) -> Result<Vec<Observation>> {
        let clause = crate::common::like_clause(columns);
        let sql = format!("SELECT {SELECT_COLUMNS} FROM observations WHERE {clause}");
        Ok(self.storage.execute_query(&sql, params![crate::common::wildcard(text)], row_to_observation)?)
    }
}

impl<'a> ObservationRepository for SqliteObservationRepository<'a> {
    fn create_observation(&self, entity: &Observation) -> Result<Observation> {
        self.create(entity)
    }

    fn find_by_patient_num(&self, patient_num: i64) -> Result<Vec<Observation>> {
        Ok(self.storage.execute_query(
            &format!("SELECT {SELECT_COLUMNS} FROM observations WHERE patient_num = ?1 ORDER BY start_date"),
            params![patient_num],
            row_to_observation,
        )?)
    }

    fn find_by_visit_num(&self, encounter_num: i64) -> Result<Vec<Observation>> {
        Ok(self.storage.execute_query(
            &format!("SELECT {SELECT_COLUMNS} FROM observations WHERE encounter_num = ?1"),
            params![encounter_num],
            row_to_observation,
        )?)
    }

    fn find_by_concept_code(&self, concept_cd: &str) -> Result<Vec<Observation>> {
        Ok(self.storage.execute_query(
            &format!("SELECT {SELECT_COLUMNS} FROM observations WHERE concept_cd = ?1"),
            params![concept_cd],
            row_to_observation,
        )?)
    }

    fn find_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Observation>> {
        Ok(self.storage.execute_query(
            &format!("SELECT {SELECT_COLUMNS} FROM observations WHERE start_date >= ?1 AND start_date <= ?2"),
            params![start.format("%Y-%m-%d").to_string(), end.format("%Y-%m-%d").to_string()],
            row_to_observation,
        )?)
    }

    fn find_with_blob_data(&self) -> Result<Vec<Observation>> {
        Ok(self.storage.execute_query(
            &format!("SELECT {SELECT_COLUMNS} FROM observations WHERE valtype_cd = 'R'"),
            [],
            row_to_observation,
        )?)
    }

    fn find_by_source_system(&self, source_system_cd: &str) -> Result<Vec<Observation>> {
        Ok(self.storage.execute_query(
            &format!("SELECT {SELECT_COLUMNS} FROM observations WHERE sourcesystem_cd = ?1"),
            params![source_system_cd],
            row_to_observation,
        )?)
    }

    fn get_observation_statistics(&self, patient_num: i64) -> Result<ObservationStatistics> {
        let rows: Vec<(String, i64)> = self.storage.execute_query(
            "SELECT valtype_cd, COUNT(*) FROM observations WHERE patient_num = ?1 GROUP BY valtype_cd",
            params![patient_num],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let mut by_value_type = HashMap::new();
        let mut total = 0u64;
        for (valtype_cd, count) in rows {
            total += count as u64;
            by_value_type.insert(valtype_cd, count as u64);
        }
        Ok(ObservationStatistics { total, by_value_type })
    }

    fn patient_observations_view(&self, patient_num: i64) -> Result<Vec<PatientObservationRow>> {
        Ok(self.storage.execute_query(
            "SELECT observation_num, patient_num, encounter_num, concept_cd, concept_name_char, \
             tval_resolved, start_date FROM patient_observations WHERE patient_num = ?1",
            params![patient_num],
            |row| {
                Ok(PatientObservationRow {
                    observation_num: row.get(0)?,
                    patient_num: row.get(1)?,
                    encounter_num: row.get(2)?,
                    concept_cd: row.get(3)?,
                    concept_name_char: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                    tval_resolved: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
                    start_date: NaiveDate::parse_from_str(&row.get::<_, String>(6)?, "%Y-%m-%d").unwrap_or_default(),
                })
            },
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::SqlitePatientRepository;
    use crate::visit::SqliteVisitRepository;
    use ncd_migrate::{standard_migrations, MigrationRuntime};
    use ncd_model::Patient;

    fn setup() -> (Storage, i64, i64) {
        let mut storage = Storage::connect_in_memory().unwrap();
        let mut runtime = MigrationRuntime::new();
        for m in standard_migrations() {
            runtime = runtime.register(m);
        }
        runtime.apply_all(&mut storage).unwrap();
        storage
            .execute_command(
                "INSERT INTO concepts (concept_cd, concept_path, name_char, valtype_cd) \
                 VALUES ('VITAL:HR', '\\Vitals\\HeartRate', 'Heart Rate', 'N')",
                [],
            )
            .unwrap();

        let patient_num;
        let encounter_num;
        {
            let patients = SqlitePatientRepository::new(&storage);
            let patient = patients.create(&Patient::new("P1")).unwrap();
            patient_num = patient.patient_num.unwrap();
            let visits = SqliteVisitRepository::new(&storage);
            let visit = visits
                .create(&ncd_model::Visit::new(patient_num, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()))
                .unwrap();
            encounter_num = visit.encounter_num.unwrap();
        }
        (storage, patient_num, encounter_num)
    }

    #[test]
    fn numeric_observation_roundtrips_value_type() {
        let (storage, patient_num, encounter_num) = setup();
        let repo = SqliteObservationRepository::new(&storage);
        let obs = Observation::new(
            patient_num,
            encounter_num,
            "VITAL:HR",
            ObservationValue::Numeric { nval_num: 72.0 },
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );
        let created = repo.create(&obs).unwrap();
        assert_eq!(created.value.numeric_value(), Some(72.0));

        let fetched = repo.find_by_id(created.observation_num.unwrap()).unwrap().unwrap();
        assert_eq!(fetched.value, ObservationValue::Numeric { nval_num: 72.0 });
    }

    #[test]
    fn statistics_group_by_value_type() {
        let (storage, patient_num, encounter_num) = setup();
        let repo = SqliteObservationRepository::new(&storage);
        repo.create(&Observation::new(
            patient_num,
            encounter_num,
            "VITAL:HR",
            ObservationValue::Numeric { nval_num: 72.0 },
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        ))
        .unwrap();
        repo.create(&Observation::new(
            patient_num,
            encounter_num,
            "VITAL:HR",
            ObservationValue::Numeric { nval_num: 80.0 },
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        ))
        .unwrap();

        let stats = repo.get_observation_statistics(patient_num).unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_value_type.get("N"), Some(&2));
    }
}

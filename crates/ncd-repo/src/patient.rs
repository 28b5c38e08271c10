//! Patient dimension repository (spec.md §4.4 `PatientRepository`).

use crate::common::{like_clause, wildcard, FindOptions, Page, Repository};
use crate::error::{RepoError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use ncd_model::{AuditFields, Patient};
use ncd_storage::Storage;
use rusqlite::{params, Row};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct PatientCriteria {
    pub vital_status: Option<VitalStatus>,
    pub sex_cd: Option<String>,
    pub age_min: Option<i32>,
    pub age_max: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VitalStatus {
    Alive,
    Deceased,
}

pub trait PatientRepository: Repository<Patient> {
    fn find_by_patient_code(&self, code: &str) -> Result<Option<Patient>>;
    fn find_by_source_system(&self, source_system_cd: &str) -> Result<Vec<Patient>>;
    fn find_by_criteria(&self, criteria: &PatientCriteria) -> Result<Vec<Patient>>;
    fn create_patient(&self, patch: &Value) -> Result<Patient>;
    fn update_patient(&self, patient_num: i64, patch: &Value) -> Result<Patient>;
}

pub struct SqlitePatientRepository<'a> {
    storage: &'a Storage,
}

impl<'a> SqlitePatientRepository<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }
}

fn row_to_patient(row: &Row<'_>) -> rusqlite::Result<Patient> {
    let blob_json: Option<String> = row.get("patient_blob")?;
    let patient_blob: BTreeMap<String, Value> = blob_json
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default();

    Ok(Patient {
        patient_num: Some(row.get("patient_num")?),
        patient_cd: row.get("patient_cd")?,
        sex_cd: row.get("sex_cd")?,
        age_in_years: row.get("age_in_years")?,
        birth_date: row.get::<_, Option<String>>("birth_date")?.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        death_date: row.get::<_, Option<String>>("death_date")?.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        language_cd: row.get("language_cd")?,
        race_cd: row.get("race_cd")?,
        marital_status_cd: row.get("marital_status_cd")?,
        religion_cd: row.get("religion_cd")?,
        patient_blob,
        audit: AuditFields {
            import_date: row.get::<_, String>("import_date")?.parse::<NaiveDateTime>().unwrap_or_default(),
            update_date: row.get::<_, String>("update_date")?.parse::<NaiveDateTime>().unwrap_or_default(),
            upload_id: row.get("upload_id")?,
            source_system_cd: row.get("sourcesystem_cd")?,
        },
    })
}

const SELECT_COLUMNS: &str = "patient_num, patient_cd, sex_cd, age_in_years, birth_date, death_date, \
    language_cd, race_cd, marital_status_cd, religion_cd, patient_blob, \
    import_date, update_date, upload_id, sourcesystem_cd";

impl<'a> Repository<Patient> for SqlitePatientRepository<'a> {
    fn find_by_id(&self, id: i64) -> Result<Option<Patient>> {
        let rows = self.storage.execute_query(
            &format!("SELECT {SELECT_COLUMNS} FROM patients WHERE patient_num = ?1"),
            params![id],
            row_to_patient,
        )?;
        Ok(rows.into_iter().next())
    }

    fn find_all(&self, options: &FindOptions) -> Result<Vec<Patient>> {
        let mut sql = format!("SELECT {SELECT_COLUMNS} FROM patients");
        if let Some(order_by) = &options.order_by {
            sql.push_str(&format!(" ORDER BY {order_by} {}", if options.descending { "DESC" } else { "ASC" }));
        }
        if let Some(limit) = options.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        Ok(self.storage.execute_query(&sql, [], row_to_patient)?)
    }

    fn create(&self, entity: &Patient) -> Result<Patient> {
        if self.find_by_patient_code(&entity.patient_cd)?.is_some() {
            return Err(RepoError::Duplicate(format!("patient_cd {}", entity.patient_cd)));
        }
        let blob = serde_json::to_string(&entity.patient_blob).unwrap_or_else(|_| "{}".to_string());
        self.storage.execute_command(
            "INSERT INTO patients (patient_cd, sex_cd, age_in_years, birth_date, death_date, \
             language_cd, race_cd, marital_status_cd, religion_cd, patient_blob, \
             import_date, update_date, upload_id, sourcesystem_cd) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                entity.patient_cd,
                entity.sex_cd,
                entity.age_in_years,
                entity.birth_date.map(|d| d.format("%Y-%m-%d").to_string()),
                entity.death_date.map(|d| d.format("%Y-%m-%d").to_string()),
                entity.language_cd,
                entity.race_cd,
                entity.marital_status_cd,
                entity.religion_cd,
                blob,
                entity.audit.import_date.to_string(),
                entity.audit.update_date.to_string(),
                entity.audit.upload_id,
                entity.audit.source_system_cd,
            ],
        )?;
        self.find_by_patient_code(&entity.patient_cd)?
            .ok_or_else(|| RepoError::NotFound("patient just inserted".to_string()))
    }

    fn update(&self, id: i64, patch: &Value) -> Result<Patient> {
        let mut patient = self
            .find_by_id(id)?
            .ok_or_else(|| RepoError::NotFound(format!("patient {id}")))?;

        if let Some(obj) = patch.as_object() {
            if let Some(v) = obj.get("sex_cd").and_then(|v| v.as_str()) {
                patient.sex_cd = Some(v.to_string());
            }
            if let Some(v) = obj.get("age_in_years").and_then(|v| v.as_i64()) {
                patient.age_in_years = Some(v as i32);
            }
            if let Some(v) = obj.get("death_date").and_then(|v| v.as_str()) {
                patient.death_date = NaiveDate::parse_from_str(v, "%Y-%m-%d").ok();
            }
            if let Some(v) = obj.get("language_cd").and_then(|v| v.as_str()) {
                patient.language_cd = Some(v.to_string());
            }
            if let Some(v) = obj.get("race_cd").and_then(|v| v.as_str()) {
                patient.race_cd = Some(v.to_string());
            }
            if let Some(v) = obj.get("marital_status_cd").and_then(|v| v.as_str()) {
                patient.marital_status_cd = Some(v.to_string());
            }
            if let Some(v) = obj.get("religion_cd").and_then(|v| v.as_str()) {
                patient.religion_cd = Some(v.to_string());
            }
        }
        patient.audit.touch();
        let blob = serde_json::to_string(&patient.patient_blob).unwrap_or_else(|_| "{}".to_string());

        self.storage.execute_command(
            "UPDATE patients SET sex_cd = ?1, age_in_years = ?2, death_date = ?3, language_cd = ?4, \
             marital_status_cd = ?5, religion_cd = ?6, race_cd = ?7, patient_blob = ?8, update_date = ?9 \
             WHERE patient_num = ?10",
            params![
                patient.sex_cd,
                patient.age_in_years,
                patient.death_date.map(|d| d.format("%Y-%m-%d").to_string()),
                patient.language_cd,
                patient.marital_status_cd,
                patient.religion_cd,
                patient.race_cd,
                blob,
                patient.audit.update_date.to_string(),
                id,
            ],
        )?;
        self.find_by_id(id)?.ok_or_else(|| RepoError::NotFound(format!("patient {id}")))
    }

    fn delete(&self, id: i64) -> Result<bool> {
        let outcome = self.storage.execute_command("DELETE FROM patients WHERE patient_num = ?1", params![id])?;
        Ok(outcome.changes > 0)
    }

    fn count(&self, criteria: Option<&str>) -> Result<u64> {
        let sql = match criteria {
            Some(c) => format!("SELECT COUNT(*) FROM patients WHERE {c}"),
            None => "SELECT COUNT(*) FROM patients".to_string(),
        };
        let count: i64 = self.storage.execute_query(&sql, [], |row| row.get(0))?[0];
        Ok(count as u64)
    }

    fn find_paginated(&self, page: u32, page_size: u32, criteria: Option<&str>) -> Result<Page<Patient>> {
        let offset = page.saturating_sub(1) * page_size;
        let where_clause = criteria.map(|c| format!(" WHERE {c}")).unwrap_or_default();
        let sql = format!("SELECT {SELECT_COLUMNS} FROM patients{where_clause} LIMIT {page_size} OFFSET {offset}");
        let rows = self.storage.execute_query(&sql, [], row_to_patient)?;
        let total = self.count(criteria)?;
        Ok(Page { rows, total, page, page_size })
    }

    fn search(&self, text: &str, columns: &[&str]) -> Result<Vec<Patient>> {
        let clause = like_clause(columns);
        let sql = format!("SELECT {SELECT_COLUMNS} FROM patients WHERE {clause}");
        Ok(self.storage.execute_query(&sql, params![wildcard(text)], row_to_patient)?)
    }
}

impl<'a> PatientRepository for SqlitePatientRepository<'a> {
    fn find_by_patient_code(&self, code: &str) -> Result<Option<Patient>> {
        let rows = self.storage.execute_query(
            &format!("SELECT {SELECT_COLUMNS} FROM patients WHERE patient_cd = ?1"),
            params![code],
            row_to_patient,
        )?;
        Ok(rows.into_iter().next())
    }

    fn find_by_source_system(&self, source_system_cd: &str) -> Result<Vec<Patient>> {
        let rows = self.storage.execute_query(
            &format!("SELECT {SELECT_COLUMNS} FROM patients WHERE sourcesystem_cd = ?1"),
            params![source_system_cd],
            row_to_patient,
        )?;
        Ok(rows)
    }

    fn find_by_criteria(&self, criteria: &PatientCriteria) -> Result<Vec<Patient>> {
        let mut clauses = Vec::new();
        if criteria.vital_status == Some(VitalStatus::Alive) {
            clauses.push("death_date IS NULL".to_string());
        }
        if criteria.vital_status == Some(VitalStatus::Deceased) {
            clauses.push("death_date IS NOT NULL".to_string());
        }
        if let Some(min) = criteria.age_min {
            clauses.push(format!("age_in_years >= {min}"));
        }
        if let Some(max) = criteria.age_max {
            clauses.push(format!("age_in_years <= {max}"));
        }
        let sex_param = criteria.sex_cd.clone();
        if sex_param.is_some() {
            clauses.push("sex_cd = ?1".to_string());
        }
        let where_clause = if clauses.is_empty() { String::new() } else { format!(" WHERE {}", clauses.join(" AND ")) };
        let sql = format!("SELECT {SELECT_COLUMNS} FROM patients{where_clause}");
        match sex_param {
            Some(sex) => Ok(self.storage.execute_query(&sql, params![sex], row_to_patient)?),
            None => Ok(self.storage.execute_query(&sql, [], row_to_patient)?),
        }
    }

    fn create_patient(&self, patch: &Value) -> Result<Patient> {
        let obj = patch.as_object().ok_or_else(|| RepoError::ValidationFailure("patch must be an object".to_string()))?;
        let patient_cd = obj
            .get("patient_cd")
            .and_then(|v| v.as_str())
            .ok_or_else(|| RepoError::ValidationFailure("patient_cd is required".to_string()))?;
        let mut patient = Patient::new(patient_cd);
        if let Some(v) = obj.get("sex_cd").and_then(|v| v.as_str()) {
            patient.sex_cd = Some(v.to_string());
        }
        if let Some(v) = obj.get("age_in_years").and_then(|v| v.as_i64()) {
            patient.age_in_years = Some(v as i32);
        }
        if let Some(v) = obj.get("source_system_cd").and_then(|v| v.as_str()) {
            patient.audit.source_system_cd = v.to_string();
        }
        self.create(&patient)
    }

    fn update_patient(&self, patient_num: i64, patch: &Value) -> Result<Patient> {
        self.update(patient_num, patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn create_and_find_by_code() {
        let storage = setup();
        let repo = SqlitePatientRepository::new(&storage);
        let patient = Patient::new("DEMO_PATIENT_01");
        let created = repo.create(&patient).unwrap();
        assert!(created.patient_num.is_some());

        let found = repo.find_by_patient_code("DEMO_PATIENT_01").unwrap().unwrap();
        assert_eq!(found.patient_cd, "DEMO_PATIENT_01");
    }

    #[test]
    fn duplicate_patient_code_is_rejected() {
        let storage = setup();
        let repo = SqlitePatientRepository::new(&storage);
        repo.create(&Patient::new("ERROR_TEST")).unwrap();
        let result = repo.create(&Patient::new("ERROR_TEST"));
        assert!(matches!(result, Err(RepoError::Duplicate(_))));
    }

    #[test]
    fn update_patch_only_touches_supplied_fields() {
        let storage = setup();
        let repo = SqlitePatientRepository::new(&storage);
        let created = repo.create(&Patient::new("DEMO_PATIENT_02")).unwrap();

        let updated = repo
            .update(created.patient_num.unwrap(), &serde_json::json!({ "age_in_years": 32 }))
            .unwrap();
        assert_eq!(updated.age_in_years, Some(32));
        assert_eq!(updated.patient_cd, "DEMO_PATIENT_02");
    }

    #[test]
    fn find_by_criteria_filters_deceased() {
        let storage = setup();
        let repo = SqlitePatientRepository::new(&storage);
        let mut alive = Patient::new("ALIVE_01");
        alive.age_in_years = Some(40);
        repo.create(&alive).unwrap();

        let mut deceased = Patient::new("DECEASED_01");
        deceased.death_date = Some(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        repo.create(&deceased).unwrap();

        let results = repo
            .find_by_criteria(&PatientCriteria {
                vital_status: Some(VitalStatus::Deceased),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].patient_cd, "DECEASED_01");
    }
}

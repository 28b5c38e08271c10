//! Patient search (spec.md §4.10). Builds its own parametrised `SELECT`
//! rather than routing through `ncd_repo::Repository::find_paginated`,
//! whose `criteria: Option<&str>` is an unparametrised raw-SQL splice not
//! suited to composing filters containing free text.

use crate::error::Result;
use crate::filters::{paging, SearchFilters, SearchPage};
use chrono::{NaiveDate, NaiveDateTime};
use ncd_model::{AuditFields, Patient};
use ncd_storage::Storage;
use rusqlite::{params_from_iter, Row, ToSql};
use serde_json::Value;
use std::collections::BTreeMap;

const SELECT_COLUMNS: &str = "patient_num, patient_cd, sex_cd, age_in_years, birth_date, death_date, \
    language_cd, race_cd, marital_status_cd, religion_cd, patient_blob, \
    import_date, update_date, upload_id, sourcesystem_cd";

fn row_to_patient(row: &Row<'_>) -> rusqlite::Result<Patient> {
    let blob_json: Option<String> = row.get("patient_blob")?;
    let patient_blob: BTreeMap<String, Value> = blob_json.and_then(|s| serde_json::from_str(&s).ok()).unwrap_or_default();

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

fn build_where(filters: &SearchFilters) -> (String, Vec<Box<dyn ToSql>>) {
    let mut clauses = Vec::new();
    let mut values: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(code) = &filters.patient_cd {
        values.push(Box::new(code.clone()));
        clauses.push(format!("patient_cd = ?{}", values.len()));
    }
    if let Some(sex) = &filters.sex_cd {
        values.push(Box::new(sex.clone()));
        clauses.push(format!("sex_cd = ?{}", values.len()));
    }

    let where_clause = if clauses.is_empty() { String::new() } else { format!(" WHERE {}", clauses.join(" AND ")) };
    (where_clause, values)
}

pub fn search_patients(storage: &Storage, filters: &SearchFilters, page: u32, page_size: u32) -> Result<SearchPage<Patient>> {
    let (page, page_size) = paging(page, page_size);
    let (where_clause, values) = build_where(filters);
    let offset = (page - 1) * page_size;

    let count_sql = format!("SELECT COUNT(*) FROM patients{where_clause}");
    let total: i64 = storage.execute_query(&count_sql, params_from_iter(values.iter()), |row| row.get(0))?[0];

    let select_sql = format!("SELECT {SELECT_COLUMNS} FROM patients{where_clause} ORDER BY patient_num LIMIT {page_size} OFFSET {offset}");
    let rows = storage.execute_query(&select_sql, params_from_iter(values.iter()), row_to_patient)?;

    Ok(SearchPage { rows, total: total as u64, page, page_size })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ncd_migrate::{standard_migrations, MigrationRuntime};
    use ncd_repo::{PatientRepository, Repository, SqlitePatientRepository};

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
    fn filters_by_sex_code_with_pagination() {
        let storage = setup();
        let repo = SqlitePatientRepository::new(&storage);
        let mut a = Patient::new("DEMO_PATIENT_01");
        a.sex_cd = Some("M".to_string());
        repo.create(&a).unwrap();
        let mut b = Patient::new("DEMO_PATIENT_02");
        b.sex_cd = Some("F".to_string());
        repo.create(&b).unwrap();

        let page = search_patients(&storage, &SearchFilters { sex_cd: Some("F".to_string()), ..Default::default() }, 1, 10).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.rows[0].patient_cd, "DEMO_PATIENT_02");
    }

    #[test]
    fn no_filters_returns_all_patients_paginated() {
        let storage = setup();
        let repo = SqlitePatientRepository::new(&storage);
        repo.create(&Patient::new("DEMO_PATIENT_01")).unwrap();
        repo.create(&Patient::new("DEMO_PATIENT_02")).unwrap();

        let page = search_patients(&storage, &SearchFilters::default(), 1, 1).unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.page_size, 1);
    }

    #[test]
    fn patient_cd_with_sql_metacharacters_is_bound_not_interpolated() {
        let storage = setup();
        let repo = SqlitePatientRepository::new(&storage);
        repo.create(&Patient::new("DEMO_PATIENT_01")).unwrap();

        let page = search_patients(
            &storage,
            &SearchFilters { patient_cd: Some("'; DROP TABLE patients; --".to_string()), ..Default::default() },
            1,
            10,
        )
        .unwrap();
        assert_eq!(page.total, 0);

        let still_there = search_patients(&storage, &SearchFilters::default(), 1, 10).unwrap();
        assert_eq!(still_there.total, 1);
    }
}

//! Observation search (spec.md §4.10). Same direct-SQL approach as
//! [`crate::patients::search_patients`]; additionally resolves `concept_text`
//! against the concept dictionary via `ncd_concept::ConceptCache` before
//! composing the `concept_cd IN (...)` clause, since observations carry only
//! the code, not the display name.

use crate::error::Result;
use crate::filters::{paging, SearchFilters, SearchPage};
use chrono::{NaiveDate, NaiveDateTime};
use ncd_concept::ConceptCache;
use ncd_model::value::{BlobValue, ValueType};
use ncd_model::{AuditFields, Observation, ObservationValue};
use ncd_storage::Storage;
use rusqlite::{params_from_iter, Row, ToSql};
use serde_json::Value;
use std::collections::BTreeMap;

const SELECT_COLUMNS: &str = "observation_num, patient_num, encounter_num, concept_cd, valtype_cd, \
    nval_num, tval_char, unit_cd, category_cd, provider_id, location_cd, start_date, end_date, \
    instance_num, observation_blob, import_date, update_date, upload_id, sourcesystem_cd";

fn columns_to_value(valtype_cd: &str, nval_num: Option<f64>, tval_char: Option<String>) -> rusqlite::Result<ObservationValue> {
    let value_type = ValueType::from_code(valtype_cd.chars().next().unwrap_or('T')).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, "unknown valtype_cd".into())
    })?;
    Ok(match value_type {
        ValueType::Numeric => ObservationValue::Numeric { nval_num: nval_num.unwrap_or_default() },
        ValueType::Text => ObservationValue::Text { tval_char: tval_char.unwrap_or_default() },
        ValueType::Date => ObservationValue::Date {
            tval_char: tval_char.as_deref().and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()).unwrap_or_default(),
        },
        ValueType::Blob => ObservationValue::Blob {
            tval_char: tval_char.as_deref().and_then(|s| serde_json::from_str::<BlobValue>(s).ok()).unwrap_or_default(),
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

fn build_where(filters: &SearchFilters, concept_codes: &[String]) -> (String, Vec<Box<dyn ToSql>>) {
    let mut clauses = Vec::new();
    let mut values: Vec<Box<dyn ToSql>> = Vec::new();

    if !concept_codes.is_empty() {
        let placeholders: Vec<String> = concept_codes
            .iter()
            .map(|c| {
                values.push(Box::new(c.clone()));
                format!("?{}", values.len())
            })
            .collect();
        clauses.push(format!("concept_cd IN ({})", placeholders.join(", ")));
    }
    if let Some(start) = filters.start_date {
        values.push(Box::new(start.format("%Y-%m-%d").to_string()));
        clauses.push(format!("start_date >= ?{}", values.len()));
    }
    if let Some(end) = filters.end_date {
        values.push(Box::new(end.format("%Y-%m-%d").to_string()));
        clauses.push(format!("start_date <= ?{}", values.len()));
    }
    if let Some(min) = filters.value_min {
        values.push(Box::new(min));
        clauses.push(format!("nval_num >= ?{}", values.len()));
    }
    if let Some(max) = filters.value_max {
        values.push(Box::new(max));
        clauses.push(format!("nval_num <= ?{}", values.len()));
    }

    let where_clause = if clauses.is_empty() { String::new() } else { format!(" WHERE {}", clauses.join(" AND ")) };
    (where_clause, values)
}

/// Resolves `filters.concept_codes` plus any codes whose resolved concept
/// name matches `filters.concept_text` into the effective code set used for
/// the `concept_cd IN (...)` clause. Two round trips at most: one
/// `ConceptCache::resolve_batch` for the explicit codes, one
/// `ConceptCache::search_concepts` for the free-text match.
fn effective_concept_codes(storage: &Storage, filters: &SearchFilters, cache: &ConceptCache) -> Result<Vec<String>> {
    let mut codes: Vec<String> = filters.concept_codes.clone();
    if let Some(text) = &filters.concept_text {
        let matches = cache.search_concepts(storage, text, None)?;
        codes.extend(matches.into_iter().map(|c| c.concept_cd));
    }
    codes.sort();
    codes.dedup();
    Ok(codes)
}

pub fn search_observations(
    storage: &Storage,
    filters: &SearchFilters,
    cache: &ConceptCache,
    page: u32,
    page_size: u32,
) -> Result<SearchPage<Observation>> {
    let (page, page_size) = paging(page, page_size);
    let concept_codes = effective_concept_codes(storage, filters, cache)?;
    let concept_text_narrows = filters.concept_text.is_some() || !filters.concept_codes.is_empty();
    if concept_text_narrows && concept_codes.is_empty() {
        return Ok(SearchPage { rows: Vec::new(), total: 0, page, page_size });
    }

    let offset = (page - 1) * page_size;
    let (where_clause, values) = build_where(filters, &concept_codes);

    let count_sql = format!("SELECT COUNT(*) FROM observations{where_clause}");
    let total: i64 = storage.execute_query(&count_sql, params_from_iter(values.iter()), |row| row.get(0))?[0];

    let select_sql = format!(
        "SELECT {SELECT_COLUMNS} FROM observations{where_clause} ORDER BY observation_num LIMIT {page_size} OFFSET {offset}"
    );
    let rows = storage.execute_query(&select_sql, params_from_iter(values.iter()), row_to_observation)?;

    Ok(SearchPage { rows, total: total as u64, page, page_size })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ncd_migrate::{standard_migrations, MigrationRuntime};
    use ncd_repo::{ObservationRepository, Repository, SqliteObservationRepository, SqlitePatientRepository, SqliteVisitRepository, VisitRepository};
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

    fn seed_observation(storage: &Storage, concept_cd: &str, value: f64, date: NaiveDate) {
        let patient_repo = SqlitePatientRepository::new(storage);
        let patient = patient_repo.create(&Patient::new(format!("P_{concept_cd}_{value}"))).unwrap();
        let visit_repo = SqliteVisitRepository::new(storage);
        let visit = visit_repo.create_visit(&Visit::new(patient.patient_num.unwrap(), date)).unwrap();
        let obs_repo = SqliteObservationRepository::new(storage);
        obs_repo
            .create_observation(&Observation::new(
                patient.patient_num.unwrap(),
                visit.encounter_num.unwrap(),
                concept_cd,
                ObservationValue::Numeric { nval_num: value },
                date,
            ))
            .unwrap();
    }

    #[test]
    fn filters_by_concept_code_and_value_range() {
        let storage = setup();
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        seed_observation(&storage, "VITAL:HEART_RATE", 72.0, today);
        seed_observation(&storage, "VITAL:HEART_RATE", 150.0, today);
        seed_observation(&storage, "VITAL:TEMP", 98.6, today);

        let cache = ConceptCache::new();
        let filters = SearchFilters {
            concept_codes: vec!["VITAL:HEART_RATE".to_string()],
            value_max: Some(100.0),
            ..Default::default()
        };
        let page = search_observations(&storage, &filters, &cache, 1, 10).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.rows[0].value.numeric_value(), Some(72.0));
    }

    #[test]
    fn no_filters_returns_all_observations() {
        let storage = setup();
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        seed_observation(&storage, "VITAL:HEART_RATE", 72.0, today);
        seed_observation(&storage, "VITAL:TEMP", 98.6, today);

        let cache = ConceptCache::new();
        let page = search_observations(&storage, &SearchFilters::default(), &cache, 1, 10).unwrap();
        assert_eq!(page.total, 2);
    }

    #[test]
    fn date_range_excludes_observations_outside_the_window() {
        let storage = setup();
        seed_observation(&storage, "VITAL:HEART_RATE", 72.0, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        seed_observation(&storage, "VITAL:HEART_RATE", 80.0, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());

        let cache = ConceptCache::new();
        let filters = SearchFilters {
            start_date: Some(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
            ..Default::default()
        };
        let page = search_observations(&storage, &filters, &cache, 1, 10).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.rows[0].value.numeric_value(), Some(80.0));
    }
}

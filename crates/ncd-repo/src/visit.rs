//! Visit/Encounter dimension repository (spec.md §4.4 `VisitRepository`).

use crate::common::{FindOptions, Page, Repository};
use crate::error::{RepoError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use ncd_model::{AuditFields, Visit, VisitKind};
use ncd_storage::Storage;
use rusqlite::{params, Row};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct VisitTimelineEntry {
    pub visit: Visit,
    pub observation_count: u64,
}

pub trait VisitRepository: Repository<Visit> {
    fn create_visit(&self, entity: &Visit) -> Result<Visit>;
    fn find_by_patient_num(&self, patient_num: i64) -> Result<Vec<Visit>>;
    fn get_patient_visit_timeline(&self, patient_num: i64) -> Result<Vec<VisitTimelineEntry>>;
    fn find_by_location_code(&self, location_cd: &str) -> Result<Vec<Visit>>;
    fn find_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Visit>>;
    fn find_by_source_system(&self, source_system_cd: &str) -> Result<Vec<Visit>>;
}

pub struct SqliteVisitRepository<'a> {
    storage: &'a Storage,
}

impl<'a> SqliteVisitRepository<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }
}

fn visit_kind_to_str(kind: VisitKind) -> &'static str {
    match kind {
        VisitKind::Inpatient => "Inpatient",
        VisitKind::Outpatient => "Outpatient",
        VisitKind::Emergency => "Emergency",
    }
}

fn visit_kind_from_str(s: &str) -> Option<VisitKind> {
    match s {
        "Inpatient" => Some(VisitKind::Inpatient),
        "Outpatient" => Some(VisitKind::Outpatient),
        "Emergency" => Some(VisitKind::Emergency),
        _ => None,
    }
}

fn row_to_visit(row: &Row<'_>) -> rusqlite::Result<Visit> {
    let blob_json: Option<String> = row.get("visit_blob")?;
    let visit_blob: BTreeMap<String, Value> = blob_json.and_then(|s| serde_json::from_str(&s).ok()).unwrap_or_default();

    Ok(Visit {
        encounter_num: Some(row.get("encounter_num")?),
        patient_num: row.get("patient_num")?,
        start_date: NaiveDate::parse_from_str(&row.get::<_, String>("start_date")?, "%Y-%m-%d")
            .unwrap_or_default(),
        end_date: row.get::<_, Option<String>>("end_date")?.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        active_status_cd: row.get("active_status_cd")?,
        visit_kind: row.get::<_, Option<String>>("visit_kind")?.and_then(|s| visit_kind_from_str(&s)),
        location_cd: row.get("location_cd")?,
        visit_blob,
        audit: AuditFields {
            import_date: row.get::<_, String>("import_date")?.parse::<NaiveDateTime>().unwrap_or_default(),
            update_date: row.get::<_, String>("update_date")?.parse::<NaiveDateTime>().unwrap_or_default(),
            upload_id: row.get("upload_id")?,
            source_system_cd: row.get("sourcesystem_cd")?,
        },
    })
}

const SELECT_COLUMNS: &str = "encounter_num, patient_num, start_date, end_date, active_status_cd, \
    visit_kind, location_cd, visit_blob, import_date, update_date, upload_id, sourcesystem_cd";

impl<'a> Repository<Visit> for SqliteVisitRepository<'a> {
    fn find_by_id(&self, id: i64) -> Result<Option<Visit>> {
        let rows = self.storage.execute_query(
            &format!("SELECT {SELECT_COLUMNS} FROM visits WHERE encounter_num = ?1"),
            params![id],
            row_to_visit,
        )?;
        Ok(rows.into_iter().next())
    }

    fn find_all(&self, options: &FindOptions) -> Result<Vec<Visit>> {
        let mut sql = format!("SELECT {SELECT_COLUMNS} FROM visits");
        if let Some(order_by) = &options.order_by {
            sql.push_str(&format!(" ORDER BY {order_by} {}", if options.descending { "DESC" } else { "ASC" }));
        }
        if let Some(limit) = options.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        Ok(self.storage.execute_query(&sql, [], row_to_visit)?)
    }

    fn create(&self, entity: &Visit) -> Result<Visit> {
        if !entity.has_valid_date_order() {
            return Err(RepoError::ConstraintViolation("end_date must be >= start_date".to_string()));
        }
        let blob = serde_json::to_string(&entity.visit_blob).unwrap_or_else(|_| "{}".to_string());
        self.storage.execute_command(
            "INSERT INTO visits (patient_num, start_date, end_date, active_status_cd, visit_kind, \
             location_cd, visit_blob, import_date, update_date, upload_id, sourcesystem_cd) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                entity.patient_num,
                entity.start_date.format("%Y-%m-%d").to_string(),
                entity.end_date.map(|d| d.format("%Y-%m-%d").to_string()),
                entity.active_status_cd,
                entity.visit_kind.map(visit_kind_to_str),
                entity.location_cd,
                blob,
                entity.audit.import_date.to_string(),
                entity.audit.update_date.to_string(),
                entity.audit.upload_id,
                entity.audit.source_system_cd,
            ],
        )?;
        let id = self.storage.connection().last_insert_rowid();
        self.find_by_id(id)?.ok_or_else(|| RepoError::NotFound("visit just inserted".to_string()))
    }

    fn update(&self, id: i64, patch: &Value) -> Result<Visit> {
        let mut visit = self.find_by_id(id)?.ok_or_else(|| RepoError::NotFound(format!("visit {id}")))?;
        if let Some(obj) = patch.as_object() {
            if let Some(v) = obj.get("end_date").and_then(|v| v.as_str()) {
                visit.end_date = NaiveDate::parse_from_str(v, "%Y-%m-%d").ok();
            }
            if let Some(v) = obj.get("active_status_cd").and_then(|v| v.as_str()) {
                visit.active_status_cd = Some(v.to_string());
            }
            if let Some(v) = obj.get("location_cd").and_then(|v| v.as_str()) {
                visit.location_cd = Some(v.to_string());
            }
        }
        if !visit.has_valid_date_order() {
            return Err(RepoError::ConstraintViolation("end_date must be >= start_date".to_string()));
        }
        visit.audit.touch();
        self.storage.execute_command(
            "UPDATE visits SET end_date = ?1, active_status_cd = ?2, location_cd = ?3, update_date = ?4 \
             WHERE encounter_num = ?5",
            params![
                visit.end_date.map(|d| d.format("%Y-%m-%d").to_string()),
                visit.active_status_cd,
                visit.location_cd,
                visit.audit.update_date.to_string(),
                id,
            ],
        )?;
        self.find_by_id(id)?.ok_or_else(|| RepoError::NotFound(format!("visit {id}")))
    }

    fn delete(&self, id: i64) -> Result<bool> {
        let outcome = self.storage.execute_command("DELETE FROM visits WHERE encounter_num = ?1", params![id])?;
        Ok(outcome.changes > 0)
    }

    fn count(&self, criteria: Option<&str>) -> Result<u64> {
        let sql = match criteria {
            Some(c) => format!("SELECT COUNT(*) FROM visits WHERE {c}"),
            None => "SELECT COUNT(*) FROM visits".to_string(),
        };
        let count: i64 = self.storage.execute_query(&sql, [], |row| row.get(0))?[0];
        Ok(count as u64)
    }

    fn find_paginated(&self, page: u32, page_size: u32, criteria: Option<&str>) -> Result<Page<Visit>> {
        let offset = page.saturating_sub(1) * page_size;
        let where_clause = criteria.map(|c| format!(" WHERE {c}")).unwrap_or_default();
        let sql = format!("SELECT {SELECT_COLUMNS} FROM visits{where_clause} LIMIT {page_size} OFFSET {offset}");
        let rows = self.storage.execute_query(&sql, [], row_to_visit)?;
        let total = self.count(criteria)?;
        Ok(Page { rows, total, page, page_size })
    }

    fn search(&self, text: &str, columns: &[&str]) -> Result<Vec<Visit>> {
        let clause = crate::common::like_clause(columns);
        let sql = format!("SELECT {SELECT_COLUMNS} FROM visits WHERE {clause}");
        Ok(self.storage.execute_query(&sql, params![crate::common::wildcard(text)], row_to_visit)?)
    }
}

impl<'a> VisitRepository for SqliteVisitRepository<'a> {
    fn create_visit(&self, entity: &Visit) -> Result<Visit> {
        self.create(entity)
    }

    fn find_by_patient_num(&self, patient_num: i64) -> Result<Vec<Visit>> {
        Ok(self.storage.execute_query(
            &format!("SELECT {SELECT_COLUMNS} FROM visits WHERE patient_num = ?1 ORDER BY start_date"),
            params![patient_num],
            row_to_visit,
        )?)
    }

    fn get_patient_visit_timeline(&self, patient_num: i64) -> Result<Vec<VisitTimelineEntry>> {
        let visits = self.find_by_patient_num(patient_num)?;
        let mut entries = Vec::with_capacity(visits.len());
        for visit in visits {
            let count: i64 = self.storage.execute_query(
                "SELECT COUNT(*) FROM observations WHERE encounter_num = ?1",
                params![visit.encounter_num],
                |row| row.get(0),
            )?[0];
            entries.push(VisitTimelineEntry { visit, observation_count: count as u64 });
        }
        Ok(entries)
    }

    fn find_by_location_code(&self, location_cd: &str) -> Result<Vec<Visit>> {
        Ok(self.storage.execute_query(
            &format!("SELECT {SELECT_COLUMNS} FROM visits WHERE location_cd = ?1"),
            params![location_cd],
            row_to_visit,
        )?)
    }

    fn find_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Visit>> {
        Ok(self.storage.execute_query(
            &format!("SELECT {SELECT_COLUMNS} FROM visits WHERE start_date >= ?1 AND start_date <= ?2"),
            params![start.format("%Y-%m-%d").to_string(), end.format("%Y-%m-%d").to_string()],
            row_to_visit,
        )?)
    }

    fn find_by_source_system(&self, source_system_cd: &str) -> Result<Vec<Visit>> {
        Ok(self.storage.execute_query(
            &format!("SELECT {SELECT_COLUMNS} FROM visits WHERE sourcesystem_cd = ?1"),
            params![source_system_cd],
            row_to_visit,
        )?)
    }
}

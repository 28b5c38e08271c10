//! Clinical note repository (spec.md §4.4 `NoteRepository`).

use crate::common::{like_clause, wildcard, FindOptions, Page, Repository};
use crate::error::{RepoError, Result};
use chrono::NaiveDateTime;
use ncd_model::{AuditFields, Note};
use ncd_storage::Storage;
use rusqlite::{params, Row};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteExportFormat {
    Json,
    Csv,
    Text,
}

pub trait NoteRepository: Repository<Note> {
    fn find_by_patient_num(&self, patient_num: i64) -> Result<Vec<Note>>;
    fn export(&self, notes: &[Note], format: NoteExportFormat) -> Result<String>;
}

pub struct SqliteNoteRepository<'a> {
    storage: &'a Storage,
}

impl<'a> SqliteNoteRepository<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }
}

fn row_to_note(row: &Row<'_>) -> rusqlite::Result<Note> {
    let blob_json: Option<String> = row.get("note_blob")?;
    Ok(Note {
        note_num: Some(row.get("note_num")?),
        patient_num: row.get("patient_num")?,
        encounter_num: row.get("encounter_num")?,
        category_cd: row.get("category_cd")?,
        note_body: row.get("note_body")?,
        note_blob: blob_json.and_then(|s| serde_json::from_str(&s).ok()),
        audit: AuditFields {
            import_date: row.get::<_, String>("import_date")?.parse::<NaiveDateTime>().unwrap_or_default(),
            update_date: row.get::<_, String>("update_date")?.parse::<NaiveDateTime>().unwrap_or_default(),
            upload_id: row.get("upload_id")?,
            source_system_cd: row.get("sourcesystem_cd")?,
        },
    })
}

const SELECT_COLUMNS: &str = "note_num, patient_num, encounter_num, category_cd, note_body, note_blob, \
    import_date, update_date, upload_id, sourcesystem_cd";

impl<'a> Repository<Note> for SqliteNoteRepository<'a> {
    fn find_by_id(&self, id: i64) -> Result<Option<Note>> {
        let rows = self.storage.execute_query(
            &format!("SELECT {SELECT_COLUMNS} FROM notes WHERE note_num = ?1"),
            params![id],
            row_to_note,
        )?;
        Ok(rows.into_iter().next())
    }

    fn find_all(&self, options: &FindOptions) -> Result<Vec<Note>> {
        let mut sql = format!("SELECT {SELECT_COLUMNS} FROM notes");
        if let Some(order_by) = &options.order_by {
            sql.push_str(&format!(" ORDER BY {order_by} {}", if options.descending { "DESC" } else { "ASC" }));
        }
        if let Some(limit) = options.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        Ok(self.storage.execute_query(&sql, [], row_to_note)?)
    }

    fn create(&self, entity: &Note) -> Result<Note> {
        let blob = entity.note_blob.as_ref().map(|b| b.to_string());
        self.storage.execute_command(
            "INSERT INTO notes (patient_num, encounter_num, category_cd, note_body, note_blob, \
             import_date, update_date, upload_id, sourcesystem_cd) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                entity.patient_num,
                entity.encounter_num,
                entity.category_cd,
                entity.note_body,
                blob,
                entity.audit.import_date.to_string(),
                entity.audit.update_date.to_string(),
                entity.audit.upload_id,
                entity.audit.source_system_cd,
            ],
        )?;
        let id = self.storage.connection().last_insert_rowid();
        self.find_by_id(id)?.ok_or_else(|| RepoError::NotFound("note just inserted".to_string()))
    }

    fn update(&self, id: i64, patch: &Value) -> Result<Note> {
        let mut note = self.find_by_id(id)?.ok_or_else(|| RepoError::NotFound(format!("note {id}")))?;
        if let Some(obj) = patch.as_object() {
            if let Some(v) = obj.get("note_body").and_then(|v| v.as_str()) {
                note.note_body = v.to_string();
            }
            if let Some(v) = obj.get("category_cd").and_then(|v| v.as_str()) {
                note.category_cd = Some(v.to_string());
            }
        }
        note.audit.touch();
        self.storage.execute_command(
            "UPDATE notes SET note_body = ?1, category_cd = ?2, update_date = ?3 WHERE note_num = ?4",
            params![note.note_body, note.category_cd, note.audit.update_date.to_string(), id],
        )?;
        self.find_by_id(id)?.ok_or_else(|| RepoError::NotFound(format!("note {id}")))
    }

    fn delete(&self, id: i64) -> Result<bool> {
        let outcome = self.storage.execute_command("DELETE FROM notes WHERE note_num = ?1", params![id])?;
        Ok(outcome.changes > 0)
    }

    fn count(&self, criteria: Option<&str>) -> Result<u64> {
        let sql = match criteria {
            Some(c) => format!("SELECT COUNT(*) FROM notes WHERE {c}"),
            None => "SELECT COUNT(*) FROM notes".to_string(),
        };
        let count: i64 = self.storage.execute_query(&sql, [], |row| row.get(0))?[0];
        Ok(count as u64)
    }

    fn find_paginated(&self, page: u32, page_size: u32, criteria: Option<&str>) -> Result<Page<Note>> {
        let offset = page.saturating_sub(1) * page_size;
        let where_clause = criteria.map(|c| format!(" WHERE {c}")).unwrap_or_default();
        let sql = format!("SELECT {SELECT_COLUMNS} FROM notes{where_clause} LIMIT {page_size} OFFSET {offset}");
        let rows = self.storage.execute_query(&sql, [], row_to_note)?;
        let total = self.count(criteria)?;
        Ok(Page { rows, total, page, page_size })
    }

    fn search(&self, text: &str, columns: &[&str]) -> Result<Vec<Note>> {
        let clause = like_clause(columns);
        let sql = format!("SELECT {SELECT_COLUMNS} FROM notes WHERE {clause}");
        Ok(self.storage.execute_query(&sql, params![wildcard(text)], row_to_note)?)
    }
}

impl<'a> NoteRepository for SqliteNoteRepository<'a> {
    fn find_by_patient_num(&self, patient_num: i64) -> Result<Vec<Note>> {
        Ok(self.storage.execute_query(
            &format!("SELECT {SELECT_COLUMNS} FROM notes WHERE patient_num = ?1"),
            params![patient_num],
            row_to_note,
        )?)
    }

    fn export(&self, notes: &[Note], format: NoteExportFormat) -> Result<String> {
        match format {
            NoteExportFormat::Json => serde_json::to_string_pretty(notes)
                .map_err(|e| RepoError::ValidationFailure(e.to_string())),
            NoteExportFormat::Csv => {
                let mut out = String::from("note_num,patient_num,encounter_num,category_cd,note_body\n");
                for note in notes {
                    out.push_str(&format!(
                        "{},{},{},{},\"{}\"\n",
                        note.note_num.unwrap_or_default(),
                        note.patient_num,
                        note.encounter_num.map(|n| n.to_string()).unwrap_or_default(),
                        note.category_cd.clone().unwrap_or_default(),
                        note.note_body.replace('"', "\"\"")
                    ));
                }
                Ok(out)
            }
            NoteExportFormat::Text => Ok(notes
                .iter()
                .map(|n| n.note_body.clone())
                .collect::<Vec<_>>()
                .join("\n---\n")),
        }
    }
}

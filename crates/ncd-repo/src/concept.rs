//! Concept dimension repository (spec.md §4.4 `ConceptRepository`).

use crate::common::{FindOptions, Page, Repository};
use crate::error::{RepoError, Result};
use ncd_model::concept::ConceptPath;
use ncd_model::value::ValueType;
use ncd_model::Concept;
use ncd_storage::Storage;
use rusqlite::{params, Row};
use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct SearchConceptsOptions {
    pub limit: Option<u32>,
    pub context: Option<String>,
}

pub trait ConceptRepository: Repository<Concept> {
    fn find_by_concept_code(&self, concept_cd: &str) -> Result<Option<Concept>>;
    /// All concepts (one round trip), for callers that need to normalise
    /// codes client-side (e.g. the concept resolution cache's batch lookup).
    fn find_all_concepts(&self) -> Result<Vec<Concept>>;
    /// Prefix matches sort before substring matches, both alphabetical within rank.
    fn search_concepts(&self, term: &str, options: &SearchConceptsOptions) -> Result<Vec<Concept>>;
}

pub struct SqliteConceptRepository<'a> {
    storage: &'a Storage,
}

impl<'a> SqliteConceptRepository<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }
}

fn value_type_code(vt: ValueType) -> char {
    vt.code()
}

fn row_to_concept(row: &Row<'_>) -> rusqlite::Result<Concept> {
    let blob_json: Option<String> = row.get("concept_blob")?;
    let path_str: String = row.get("concept_path")?;
    let valtype_cd: String = row.get("valtype_cd")?;
    let value_type = ValueType::from_code(valtype_cd.chars().next().unwrap_or('T'))
        .unwrap_or(ValueType::Text);
    Ok(Concept {
        concept_cd: row.get("concept_cd")?,
        concept_path: ConceptPath::parse(path_str).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?,
        name_char: row.get("name_char")?,
        category_cd: row.get("category_cd")?,
        value_type,
        unit_cd: row.get("unit_cd")?,
        source_system_cd: row.get("sourcesystem_cd")?,
        related_concept_cd: row.get("related_concept_cd")?,
        concept_blob: blob_json.and_then(|s| serde_json::from_str(&s).ok()),
    })
}

const SELECT_COLUMNS: &str = "concept_cd, concept_path, name_char, category_cd, valtype_cd, unit_cd, \
    sourcesystem_cd, related_concept_cd, concept_blob";

impl<'a> Repository<Concept> for SqliteConceptRepository<'a> {
    fn find_by_id(&self, _id: i64) -> Result<Option<Concept>> {
        // Concepts are keyed by natural code, not a surrogate integer id.
        Err(RepoError::ValidationFailure("concepts have no surrogate id; use find_by_concept_code".to_string()))
    }

    fn find_all(&self, options: &FindOptions) -> Result<Vec<Concept>> {
        let mut sql = format!("SELECT {SELECT_COLUMNS} FROM concepts");
        if let Some(order_by) = &options.order_by {
            sql.push_str(&format!(" ORDER BY {order_by} {}", if options.descending { "DESC" } else { "ASC" }));
        }
        if let Some(limit) = options.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        Ok(self.storage.execute_query(&sql, [], row_to_concept)?)
    }

    fn create(&self, entity: &Concept) -> Result<Concept> {
        if self.find_by_concept_code(&entity.concept_cd)?.is_some() {
            return Err(RepoError::Duplicate(format!("concept_cd {}", entity.concept_cd)));
        }
        let blob = entity.concept_blob.as_ref().map(|b| b.to_string());
        self.storage.execute_command(
            "INSERT INTO concepts (concept_cd, concept_path, name_char, category_cd, valtype_cd, \
             unit_cd, sourcesystem_cd, related_concept_cd, concept_blob) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                entity.concept_cd,
                entity.concept_path.as_str(),
                entity.name_char,
                entity.category_cd,
                value_type_code(entity.value_type).to_string(),
                entity.unit_cd,
                entity.source_system_cd,
                entity.related_concept_cd,
                blob,
            ],
        )?;
        self.find_by_concept_code(&entity.concept_cd)?
            .ok_or_else(|| RepoError::NotFound("concept just inserted".to_string()))
    }

    fn update(&self, _id: i64, _patch: &Value) -> Result<Concept> {
        Err(RepoError::ValidationFailure("update concepts via concept_cd, not surrogate id".to_string()))
    }

    fn delete(&self, _id: i64) -> Result<bool> {
        Err(RepoError::ValidationFailure("delete concepts via concept_cd, not surrogate id".to_string()))
    }

    fn count(&self, criteria: Option<&str>) -> Result<u64> {
        let sql = match criteria {
            Some(c) => format!("SELECT COUNT(*) FROM concepts WHERE {c}"),
            None => "SELECT COUNT(*) FROM concepts".to_string(),
        };
        let count: i64 = self.storage.execute_query(&sql, [], |row| row.get(0))?[0];
        Ok(count as u64)
    }

    fn find_paginated(&self, page: u32, page_size: u32, criteria: Option<&str>) -> Result<Page<Concept>> {
        let offset = page.saturating_sub(1) * page_size;
        let where_clause = criteria.map(|c| format!(" WHERE {c}")).unwrap_or_default();
        let sql = format!("SELECT {SELECT_COLUMNS} FROM concepts{where_clause} LIMIT {page_size} OFFSET {offset}");
        let rows = self.storage.execute_query(&sql, [], row_to_concept)?;
        let total = self.count(criteria)?;
        Ok(Page { rows, total, page, page_size })
    }

    fn search(&self, text: &str, columns: &[&str]) -> Result<Vec<Concept>> {
        let clause = crate::common::like_clause(columns);
        let sql = format!("SELECT {SELECT_COLUMNS} FROM concepts WHERE {clause}");
        Ok(self.storage.execute_query(&sql, params![crate::common::wildcard(text)], row_to_concept)?)
    }
}

impl<'a> ConceptRepository for SqliteConceptRepository<'a> {
    fn find_by_concept_code(&self, concept_cd: &str) -> Result<Option<Concept>> {
        let rows = self.storage.execute_query(
            &format!("SELECT {SELECT_COLUMNS} FROM concepts WHERE concept_cd = ?1"),
            params![concept_cd],
            row_to_concept,
        )?;
        Ok(rows.into_iter().next())
    }

    fn find_all_concepts(&self) -> Result<Vec<Concept>> {
        Ok(self.storage.execute_query(&format!("SELECT {SELECT_COLUMNS} FROM concepts"), [], row_to_concept)?)
    }

    fn search_concepts(&self, term: &str, options: &SearchConceptsOptions) -> Result<Vec<Concept>> {
        let _ = &options.context; // reserved for a future context-aware ranking boost
        let prefix_pattern = format!("{term}%");
        let substring_pattern = format!("%{term}%");
        let limit_clause = options.limit.map(|l| format!(" LIMIT {l}")).unwrap_or_default();
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM concepts \
             WHERE name_char LIKE ?2 \
             ORDER BY CASE WHEN name_char LIKE ?1 THEN 0 ELSE 1 END, name_char{limit_clause}"
        );
        Ok(self.storage.execute_query(&sql, params![prefix_pattern, substring_pattern], row_to_concept)?)
    }
}

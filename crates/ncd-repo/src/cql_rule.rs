//! CQL rule repository (spec.md §4.4 `CqlRepository`).

use crate::common::{FindOptions, Page, Repository};
use crate::error::{RepoError, Result};
use ncd_model::CqlRule;
use ncd_storage::Storage;
use rusqlite::{params, Row};
use serde_json::Value;

pub trait CqlRepository: Repository<CqlRule> {
    fn find_by_code(&self, code: &str) -> Result<Option<CqlRule>>;
    /// Every rule linked to `concept_cd` via the concept-CQL lookup table.
    fn find_by_concept_code(&self, concept_cd: &str) -> Result<Vec<CqlRule>>;
    fn link_to_concept(&self, concept_cd: &str, rule_id: i64) -> Result<()>;
}

pub struct SqliteCqlRepository<'a> {
    storage: &'a Storage,
}

impl<'a> SqliteCqlRepository<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }
}

fn row_to_rule(row: &Row<'_>) -> rusqlite::Result<CqlRule> {
    let ast_json: Option<String> = row.get("precompiled_ast")?;
    let desc_json: Option<String> = row.get("description_blob")?;
    Ok(CqlRule {
        rule_id: Some(row.get("rule_id")?),
        code: row.get("code")?,
        name: row.get("name")?,
        body: row.get("body")?,
        precompiled_ast: ast_json.and_then(|s| serde_json::from_str(&s).ok()),
        description_blob: desc_json.and_then(|s| serde_json::from_str(&s).ok()),
    })
}

const SELECT_COLUMNS: &str = "rule_id, code, name, body, precompiled_ast, description_blob";

impl<'a> Repository<CqlRule> for SqliteCqlRepository<'a> {
    fn find_by_id(&self, id: i64) -> Result<Option<CqlRule>> {
        let rows = self.storage.execute_query(
            &format!("SELECT {SELECT_COLUMNS} FROM cql_rules WHERE rule_id = ?1"),
            params![id],
            row_to_rule,
        )?;
        Ok(rows.into_iter().next())
    }

    fn find_all(&self, options: &FindOptions) -> Result<Vec<CqlRule>> {
        let mut sql = format!("SELECT {SELECT_COLUMNS} FROM cql_rules");
        if let Some(order_by) = &options.order_by {
            sql.push_str(&format!(" ORDER BY {order_by} {}", if options.descending { "DESC" } else { "ASC" }));
        }
        if let Some(limit) = options.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        Ok(self.storage.execute_query(&sql, [], row_to_rule)?)
    }

    fn create(&self, entity: &CqlRule) -> Result<CqlRule> {
        if self.find_by_code(&entity.code)?.is_some() {
            return Err(RepoError::Duplicate(format!("cql rule code {}", entity.code)));
        }
        let ast = entity.precompiled_ast.as_ref().map(|v| v.to_string());
        let desc = entity.description_blob.as_ref().map(|v| v.to_string());
        self.storage.execute_command(
            "INSERT INTO cql_rules (code, name, body, precompiled_ast, description_blob) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![entity.code, entity.name, entity.body, ast, desc],
        )?;
        self.find_by_code(&entity.code)?.ok_or_else(|| RepoError::NotFound("cql rule just inserted".to_string()))
    }

    fn update(&self, id: i64, patch: &Value) -> Result<CqlRule> {
        let mut rule = self.find_by_id(id)?.ok_or_else(|| RepoError::NotFound(format!("cql rule {id}")))?;
        if let Some(obj) = patch.as_object() {
            if let Some(v) = obj.get("name").and_then(|v| v.as_str()) {
                rule.name = v.to_string();
            }
            if let Some(v) = obj.get("body").and_then(|v| v.as_str()) {
                rule.body = v.to_string();
                rule.precompiled_ast = None;
            }
        }
        self.storage.execute_command(
            "UPDATE cql_rules SET name = ?1, body = ?2, precompiled_ast = ?3 WHERE rule_id = ?4",
            params![rule.name, rule.body, rule.precompiled_ast.as_ref().map(|v| v.to_string()), id],
        )?;
        self.find_by_id(id)?.ok_or_else(|| RepoError::NotFound(format!("cql rule {id}")))
    }

    fn delete(&self, id: i64) -> Result<bool> {
        let outcome = self.storage.execute_command("DELETE FROM cql_rules WHERE rule_id = ?1", params![id])?;
        Ok(outcome.changes > 0)
    }

    fn count(&self, criteria: Option<&str>) -> Result<u64> {
        let sql = match criteria {
            Some(c) => format!("SELECT COUNT(*) FROM cql_rules WHERE {c}"),
            None => "SELECT COUNT(*) FROM cql_rules".to_string(),
        };
        let count: i64 = self.storage.execute_query(&sql, [], |row| row.get(0))?[0];
        Ok(count as u64)
    }

    fn find_paginated(&self, page: u32, page_size: u32, criteria: Option<&str>) -> Result<Page<CqlRule>> {
        let offset = page.saturating_sub(1) * page_size;
        let where_clause = criteria.map(|c| format!(" WHERE {c}")).unwrap_or_default();
        let sql = format!("SELECT {SELECT_COLUMNS} FROM cql_rules{where_clause} LIMIT {page_size} OFFSET {offset}");
        let rows = self.storage.execute_query(&sql, [], row_to_rule)?;
        let total = self.count(criteria)?;
        Ok(Page { rows, total, page, page_size })
    }

    fn search(&self, text: &str, columns: &[&str]) -> Result<Vec<CqlRule>> {
        let clause = crate::common::like_clause(columns);
        let sql = format!("SELECT {SELECT_COLUMNS} FROM cql_rules WHERE {clause}");
        Ok(self.storage.execute_query(&sql, params![crate::common::wildcard(text)], row_to_rule)?)
    }
}

impl<'a> CqlRepository for SqliteCqlRepository<'a> {
    fn find_by_code(&self, code: &str) -> Result<Option<CqlRule>> {
        let rows = self.storage.execute_query(
            &format!("SELECT {SELECT_COLUMNS} FROM cql_rules WHERE code = ?1"),
            params![code],
            row_to_rule,
        )?;
        Ok(rows.into_iter().next())
    }

    fn find_by_concept_code(&self, concept_cd: &str) -> Result<Vec<CqlRule>> {
        let sql = format!(
            "SELECT r.rule_id, r.code, r.name, r.body, r.precompiled_ast, r.description_blob \
             FROM cql_rules r \
             JOIN concept_cql_link l ON l.rule_id = r.rule_id \
             WHERE l.concept_cd = ?1"
        );
        Ok(self.storage.execute_query(&sql, params![concept_cd], row_to_rule)?)
    }

    fn link_to_concept(&self, concept_cd: &str, rule_id: i64) -> Result<()> {
        self.storage.execute_command(
            "INSERT OR IGNORE INTO concept_cql_link (concept_cd, rule_id) VALUES (?1, ?2)",
            params![concept_cd, rule_id],
        )?;
        Ok(())
    }
}

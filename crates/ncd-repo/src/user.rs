//! User account repository (spec.md §4.4 `UserRepository`).
//!
//! Passwords are never stored in clear — callers supply an already-hashed
//! value; this layer never hashes or verifies, it only persists.

use crate::common::{FindOptions, Page, Repository};
use crate::error::{RepoError, Result};
use chrono::NaiveDateTime;
use ncd_model::{AuditFields, User};
use ncd_storage::Storage;
use rusqlite::{params, Row};
use serde_json::Value;

pub trait UserRepository: Repository<User> {
    fn find_by_user_code(&self, user_cd: &str) -> Result<Option<User>>;
    fn create_user(&self, entity: &User) -> Result<User>;
    fn update_user(&self, user_num: i64, patch: &Value) -> Result<User>;
    fn reset_password(&self, user_cd: &str, new_password_hash: &str) -> Result<User>;
}

pub struct SqliteUserRepository<'a> {
    storage: &'a Storage,
}

impl<'a> SqliteUserRepository<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let blob_json: Option<String> = row.get("user_blob")?;
    Ok(User {
        user_num: Some(row.get("user_num")?),
        user_cd: row.get("user_cd")?,
        display_name: row.get("display_name")?,
        password_hash: row.get("password_hash")?,
        role_cd: row.get("role_cd")?,
        user_blob: blob_json.and_then(|s| serde_json::from_str(&s).ok()),
        audit: AuditFields {
            import_date: row.get::<_, String>("import_date")?.parse::<NaiveDateTime>().unwrap_or_default(),
            update_date: row.get::<_, String>("update_date")?.parse::<NaiveDateTime>().unwrap_or_default(),
            upload_id: row.get("upload_id")?,
            source_system_cd: row.get("sourcesystem_cd")?,
        },
    })
}

const SELECT_COLUMNS: &str = "user_num, user_cd, display_name, password_hash, role_cd, user_blob, \
    import_date, update_date, upload_id, sourcesystem_cd";

impl<'a> Repository<User> for SqliteUserRepository<'a> {
    fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let rows = self.storage.execute_query(
            &format!("SELECT {SELECT_COLUMNS} FROM users WHERE user_num = ?1"),
            params![id],
            row_to_user,
        )?;
        Ok(rows.into_iter().next())
    }

    fn find_all(&self, options: &FindOptions) -> Result<Vec<User>> {
        let mut sql = format!("SELECT {SELECT_COLUMNS} FROM users");
        if let Some(order_by) = &options.order_by {
            sql.push_str(&format!(" ORDER BY {order_by} {}", if options.descending { "DESC" } else { "ASC" }));
        }
        if let Some(limit) = options.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        Ok(self.storage.execute_query(&sql, [], row_to_user)?)
    }

    fn create(&self, entity: &User) -> Result<User> {
        if self.find_by_user_code(&entity.user_cd)?.is_some() {
            return Err(RepoError::Duplicate(format!("user_cd {}", entity.user_cd)));
        }
        let blob = entity.user_blob.as_ref().map(|v| v.to_string());
        self.storage.execute_command(
            "INSERT INTO users (user_cd, display_name, password_hash, role_cd, user_blob, \
             import_date, update_date, upload_id, sourcesystem_cd) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                entity.user_cd,
                entity.display_name,
                entity.password_hash,
                entity.role_cd,
                blob,
                entity.audit.import_date.to_string(),
                entity.audit.update_date.to_string(),
                entity.audit.upload_id,
                entity.audit.source_system_cd,
            ],
        )?;
        self.find_by_user_code(&entity.user_cd)?.ok_or_else(|| RepoError::NotFound("user just inserted".to_string()))
    }

    fn update(&self, id: i64, patch: &Value) -> Result<User> {
        let mut user = self.find_by_id(id)?.ok_or_else(|| RepoError::NotFound(format!("user {id}")))?;
        if let Some(obj) = patch.as_object() {
            if let Some(v) = obj.get("display_name").and_then(|v| v.as_str()) {
                user.display_name = v.to_string();
            }
            if let Some(v) = obj.get("role_cd").and_then(|v| v.as_str()) {
                user.role_cd = Some(v.to_string());
            }
        }
        user.audit.touch();
        self.storage.execute_command(
            "UPDATE users SET display_name = ?1, role_cd = ?2, update_date = ?3 WHERE user_num = ?4",
            params![user.display_name, user.role_cd, user.audit.update_date.to_string(), id],
        )?;
        self.find_by_id(id)?.ok_or_else(|| RepoError::NotFound(format!("user {id}")))
    }

    fn delete(&self, id: i64) -> Result<bool> {
        let outcome = self.storage.execute_command("DELETE FROM users WHERE user_num = ?1", params![id])?;
        Ok(outcome.changes > 0)
    }

    fn count(&self, criteria: Option<&str>) -> Result<u64> {
        let sql = match criteria {
            Some(c) => format!("SELECT COUNT(*) FROM users WHERE {c}"),
            None => "SELECT COUNT(*) FROM users".to_string(),
        };
        let count: i64 = self.storage.execute_query(&sql, [], |row| row.get(0))?[0];
        Ok(count as u64)
    }

    fn find_paginated(&self, page: u32, page_size: u32, criteria: Option<&str>) -> Result<Page<User>> {
        let offset = page.saturating_sub(1) * page_size;
        let where_clause = criteria.map(|c| format!(" WHERE {c}")).unwrap_or_default();
        let sql = format!("SELECT {SELECT_COLUMNS} FROM users{where_clause} LIMIT {page_size} OFFSET {offset}");
        let rows = self.storage.execute_query(&sql, [], row_to_user)?;
        let total = self.count(criteria)?;
        Ok(Page { rows, total, page, page_size })
    }

    fn search(&self, text: &str, columns: &[&str]) -> Result<Vec<User>> {
        let clause = crate::common::like_clause(columns);
        let sql = format!("SELECT {SELECT_COLUMNS} FROM users WHERE {clause}");
        Ok(self.storage.execute_query(&sql, params![crate::common::wildcard(text)], row_to_user)?)
    }
}

impl<'a> UserRepository for SqliteUserRepository<'a> {
    fn find_by_user_code(&self, user_cd: &str) -> Result<Option<User>> {
        let rows = self.storage.execute_query(
            &format!("SELECT {SELECT_COLUMNS} FROM users WHERE user_cd = ?1"),
            params![user_cd],
            row_to_user,
        )?;
        Ok(rows.into_iter().next())
    }

    fn create_user(&self, entity: &User) -> Result<User> {
        self.create(entity)
    }

    fn update_user(&self, user_num: i64, patch: &Value) -> Result<User> {
        self.update(user_num, patch)
    }

    fn reset_password(&self, user_cd: &str, new_password_hash: &str) -> Result<User> {
        if self.find_by_user_code(user_cd)?.is_none() {
            return Err(RepoError::NotFound(format!("user {user_cd}")));
        }
        self.storage.execute_command(
            "UPDATE users SET password_hash = ?1, update_date = ?2 WHERE user_cd = ?3",
            params![new_password_hash, chrono::Utc::now().naive_utc().to_string(), user_cd],
        )?;
        self.find_by_user_code(user_cd)?.ok_or_else(|| RepoError::NotFound(format!("user {user_cd}")))
    }
}

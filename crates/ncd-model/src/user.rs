//! User account row.

use crate::audit::AuditFields;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_num: Option<i64>,
    /// Unique natural key.
    pub user_cd: String,
    pub display_name: String,
    /// Never the clear-text password; always a hash produced by the caller's
    /// password-hashing scheme (the core never hashes or verifies passwords
    /// itself — that is an external collaborator's concern).
    pub password_hash: String,
    pub role_cd: Option<String>,
    pub user_blob: Option<serde_json::Value>,
    pub audit: AuditFields,
}

impl User {
    pub fn new(user_cd: impl Into<String>, display_name: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            user_num: None,
            user_cd: user_cd.into(),
            display_name: display_name.into(),
            password_hash: password_hash.into(),
            role_cd: None,
            user_blob: None,
            audit: AuditFields::new(None, None),
        }
    }
}

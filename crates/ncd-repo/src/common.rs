//! Shared contracts: the generic `Repository<E>` trait every specialised
//! repository extends, plus the paging/options types its methods use.

use crate::error::Result;
use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub order_by: Option<String>,
    pub descending: bool,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub rows: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

/// Every repository descends from this contract (spec.md §4.4's
/// `BaseRepository`). All methods parametrise inputs; none interpolate.
pub trait Repository<E> {
    fn find_by_id(&self, id: i64) -> Result<Option<E>>;
    fn find_all(&self, options: &FindOptions) -> Result<Vec<E>>;
    fn create(&self, entity: &E) -> Result<E>;
    /// `patch` is a sparse JSON object; only the keys present are updated.
    fn update(&self, id: i64, patch: &Value) -> Result<E>;
    fn delete(&self, id: i64) -> Result<bool>;
    fn count(&self, criteria: Option<&str>) -> Result<u64>;
    fn find_paginated(&self, page: u32, page_size: u32, criteria: Option<&str>) -> Result<Page<E>>;
    fn search(&self, text: &str, columns: &[&str]) -> Result<Vec<E>>;
}

/// Build a `LIKE`-based OR search clause over `columns`, returning the SQL
/// fragment and the single pattern parameter shared across all branches.
pub(crate) fn like_clause(columns: &[&str]) -> String {
    columns
        .iter()
        .map(|c| format!("{c} LIKE ?1"))
        .collect::<Vec<_>>()
        .join(" OR ")
}

pub(crate) fn wildcard(text: &str) -> String {
    format!("%{text}%")
}

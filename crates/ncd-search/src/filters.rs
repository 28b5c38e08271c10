//! `SearchFilters` (spec.md §4.10): the parametrised filter set shared by
//! `search_patients` and `search_observations`. Each field is optional;
//! absent fields contribute no clause to the composed `WHERE`.

use chrono::NaiveDate;

#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub patient_cd: Option<String>,
    pub sex_cd: Option<String>,
    pub concept_codes: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub value_min: Option<f64>,
    pub value_max: Option<f64>,
    /// Free text matched against the resolved concept name via `ncd_concept::ConceptCache`.
    pub concept_text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SearchPage<T> {
    pub rows: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

pub(crate) fn paging(page: u32, page_size: u32) -> (u32, u32) {
    let page = page.max(1);
    let page_size = page_size.max(1);
    (page, page_size)
}

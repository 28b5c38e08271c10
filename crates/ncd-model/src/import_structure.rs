//! The canonical in-memory bundle shared by every parser and the import
//! service (spec.md §4.7).

use crate::{Observation, Patient, Visit};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOptions {
    pub include_visits: bool,
    pub include_observations: bool,
    pub include_notes: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            include_visits: true,
            include_observations: true,
            include_notes: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportMetadata {
    pub title: String,
    pub export_date: Option<chrono::NaiveDateTime>,
    pub format: String,
    pub source: Option<String>,
    pub version: Option<String>,
    pub author: Option<String>,
    pub patient_count: usize,
    pub visit_count: usize,
    pub observation_count: usize,
    pub patient_ids: Vec<String>,
    pub options: ImportOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportInfo {
    pub format: String,
    pub version: String,
    pub exported_at: chrono::NaiveDateTime,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportData {
    pub patients: Vec<Patient>,
    pub visits: Vec<Visit>,
    pub observations: Vec<Observation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportStatistics {
    pub patient_count: usize,
    pub visit_count: usize,
    pub observation_count: usize,
    pub fetched_at: chrono::NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportStructure {
    pub metadata: ImportMetadata,
    pub export_info: ExportInfo,
    pub data: ImportData,
    pub statistics: ImportStatistics,
}

impl ImportStructure {
    /// Build the canonical structure from its three data vectors, deriving
    /// metadata and statistics counts from them.
    pub fn from_data(
        format: impl Into<String>,
        patients: Vec<Patient>,
        visits: Vec<Visit>,
        observations: Vec<Observation>,
        fetched_at: chrono::NaiveDateTime,
    ) -> Self {
        let format = format.into();
        let patient_ids: Vec<String> = patients.iter().map(|p| p.patient_cd.clone()).collect();
        let metadata = ImportMetadata {
            title: format!("{format} export"),
            export_date: Some(fetched_at),
            format: format.clone(),
            source: None,
            version: None,
            author: None,
            patient_count: patients.len(),
            visit_count: visits.len(),
            observation_count: observations.len(),
            patient_ids,
            options: ImportOptions::default(),
        };
        let statistics = ImportStatistics {
            patient_count: patients.len(),
            visit_count: visits.len(),
            observation_count: observations.len(),
            fetched_at,
        };
        let export_info = ExportInfo {
            format,
            version: "1.0".to_string(),
            exported_at: fetched_at,
            source: None,
        };
        Self {
            metadata,
            export_info,
            data: ImportData {
                patients,
                visits,
                observations,
            },
            statistics,
        }
    }
}

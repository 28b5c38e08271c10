//! Import Pipeline entry point (spec.md §4.7): sniff the format, dispatch
//! to the matching parser, and report a uniform outcome regardless of which
//! parser ran.

use crate::error::ImportError;
use crate::parsers::{cda_parser, csv_parser, json_parser};
use crate::sniff::{detect_format, DetectedFormat};
use ncd_model::{ImportStatistics, ImportStructure};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub success: bool,
    pub data: Option<ImportStructure>,
    pub statistics: Option<ImportStatistics>,
    pub errors: Vec<ImportError>,
}

impl ImportOutcome {
    fn failure(errors: Vec<ImportError>) -> Self {
        Self { success: false, data: None, statistics: None, errors }
    }

    fn success(structure: ImportStructure, errors: Vec<ImportError>) -> Self {
        let statistics = Some(structure.statistics.clone());
        Self { success: true, data: Some(structure), statistics, errors }
    }
}

/// Sniff `filename`/`content` and run the matching parser, producing a
/// uniform [`ImportOutcome`] whether the source was CSV, JSON, or an
/// HL7-CDA bundle (standalone or HTML-embedded).
pub fn import_file(content: &[u8], filename: &str) -> ImportOutcome {
    let outcome = match detect_format(filename, content) {
        DetectedFormat::Csv => csv_parser::parse(content),
        DetectedFormat::Json => json_parser::parse(content),
        DetectedFormat::Hl7Cda => cda_parser::parse(content),
        DetectedFormat::HtmlCda => cda_parser::parse_html_embedded(content),
    };

    match outcome {
        Ok((structure, errors)) => ImportOutcome::success(structure, errors),
        Err(errors) => ImportOutcome::failure(errors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_and_parses_csv_content() {
        let csv = "Patient,Heart Rate\npatient_cd,encounter_num,start_date,end_date,visit_kind,VITAL:HEART_RATE\nDEMO_PATIENT_01,,2024-03-15,,Outpatient,72\n";
        let outcome = import_file(csv.as_bytes(), "bundle.csv");
        assert!(outcome.success);
        assert_eq!(outcome.statistics.unwrap().patient_count, 1);
    }

    #[test]
    fn failed_parse_carries_no_data() {
        let outcome = import_file(b"not json", "export.json");
        assert!(!outcome.success);
        assert!(outcome.data.is_none());
        assert!(!outcome.errors.is_empty());
    }
}

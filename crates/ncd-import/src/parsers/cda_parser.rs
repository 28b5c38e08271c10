//! HL7-CDA bundle parser (spec.md §4.7/§4.9): a FHIR-shaped JSON
//! `Bundle` of `Patient`/`Encounter`/`Observation` resources, either as a
//! standalone JSON document or embedded inside an HTML page.
//!
//! Correlation keys are carried the same way as the CSV parser: visits and
//! observations stash `patient_cd` (and, for observations, the originating
//! encounter id) in their opaque blob for the Database Import Service to
//! resolve into surrogate ids.

use crate::error::ImportError;
use chrono::{NaiveDate, Utc};
use ncd_model::{ImportStructure, Observation, ObservationValue, Patient, Visit};
use serde_json::Value;
use std::collections::BTreeMap;

fn reference_id(resource: &Value, field: &str) -> Option<String> {
    resource
        .get(field)
        .and_then(|r| r.get("reference"))
        .and_then(|r| r.as_str())
        .and_then(|r| r.rsplit('/').next())
        .map(str::to_string)
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok().or_else(|| {
        value.split('T').next().and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
    })
}

fn observation_value(resource: &Value) -> ObservationValue {
    if let Some(n) = resource.get("valueQuantity").and_then(|q| q.get("value")).and_then(|v| v.as_f64()) {
        return ObservationValue::Numeric { nval_num: n };
    }
    if let Some(s) = resource.get("valueString").and_then(|v| v.as_str()) {
        return ObservationValue::Text { tval_char: s.to_string() };
    }
    ObservationValue::Text { tval_char: String::new() }
}

fn concept_code(resource: &Value) -> Option<String> {
    resource
        .get("code")
        .and_then(|c| c.get("coding"))
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
        .and_then(|c| c.get("code"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
}

/// Parse a standalone FHIR-shaped `Bundle` JSON document.
pub fn parse(content: &[u8]) -> Result<(ImportStructure, Vec<ImportError>), Vec<ImportError>> {
    let bundle: Value =
        serde_json::from_slice(content).map_err(|e| vec![ImportError::new("MALFORMED_CDA", e.to_string())])?;

    let entries = bundle
        .get("entry")
        .and_then(|e| e.as_array())
        .ok_or_else(|| vec![ImportError::new("MISSING_ENTRIES", "bundle has no entry array")])?;

    let mut patients: BTreeMap<String, Patient> = BTreeMap::new();
    let mut visits = Vec::new();
    let mut observations = Vec::new();
    let mut errors = Vec::new();

    for (index, entry) in entries.iter().enumerate() {
        let Some(resource) = entry.get("resource") else {
            errors.push(ImportError::new("MISSING_RESOURCE", "entry has no resource").at_line(index));
            continue;
        };
        match resource.get("resourceType").and_then(|t| t.as_str()) {
            Some("Patient") => {
                let Some(id) = resource.get("id").and_then(|v| v.as_str()) else {
                    errors.push(ImportError::new("MISSING_PATIENT_ID", "Patient resource has no id").at_line(index));
                    continue;
                };
                let mut patient = Patient::new(id);
                patient.sex_cd = resource.get("gender").and_then(|v| v.as_str()).map(str::to_string);
                patient.birth_date = resource.get("birthDate").and_then(|v| v.as_str()).and_then(parse_date);
                patients.entry(id.to_string()).or_insert(patient);
            }
            Some("Encounter") => {
                let Some(encounter_id) = resource.get("id").and_then(|v| v.as_str()) else {
                    errors.push(ImportError::new("MISSING_ENCOUNTER_ID", "Encounter resource has no id").at_line(index));
                    continue;
                };
                let Some(patient_cd) = reference_id(resource, "subject") else {
                    errors.push(ImportError::new("MISSING_SUBJECT", "Encounter has no subject reference").at_line(index));
                    continue;
                };
                let start = resource
                    .get("period")
                    .and_then(|p| p.get("start"))
                    .and_then(|v| v.as_str())
                    .and_then(parse_date)
                    .unwrap_or_else(|| Utc::now().date_naive());
                let end = resource.get("period").and_then(|p| p.get("end")).and_then(|v| v.as_str()).and_then(parse_date);

                let mut visit = Visit::new(0, start);
                visit.end_date = end;
                visit.visit_blob.insert("patient_cd".to_string(), Value::String(patient_cd.clone()));
                visit.visit_blob.insert("encounter_num_original".to_string(), Value::String(encounter_id.to_string()));
                visits.push(visit);
            }
            Some("Observation") => {
                let Some(concept_cd) = concept_code(resource) else {
                    errors.push(ImportError::new("MISSING_CONCEPT_CODE", "Observation has no coded concept").at_line(index));
                    continue;
                };
                let Some(patient_cd) = reference_id(resource, "subject") else {
                    errors.push(ImportError::new("MISSING_SUBJECT", "Observation has no subject reference").at_line(index));
                    continue;
                };
                let encounter_num_original = reference_id(resource, "encounter");
                let start = resource
                    .get("effectiveDateTime")
                    .and_then(|v| v.as_str())
                    .and_then(parse_date)
                    .unwrap_or_else(|| Utc::now().date_naive());

                let mut observation = Observation::new(0, 0, concept_cd, observation_value(resource), start);
                observation.observation_blob.insert("patient_cd".to_string(), Value::String(patient_cd));
                if let Some(encounter_id) = &encounter_num_original {
                    observation
                        .observation_blob
                        .insert("encounter_num_original".to_string(), Value::String(encounter_id.clone()));
                }
                observations.push(observation);
            }
            Some(other) => {
                errors.push(ImportError::new("UNSUPPORTED_RESOURCE", format!("unsupported resourceType {other}")).at_line(index));
            }
            None => {
                errors.push(ImportError::new("MISSING_RESOURCE_TYPE", "resource has no resourceType").at_line(index));
            }
        }
    }

    if patients.is_empty() {
        errors.push(ImportError::new("NO_PATIENTS", "bundle has no Patient resources"));
        return Err(errors);
    }

    let structure = ImportStructure::from_data("hl7-cda", patients.into_values().collect(), visits, observations, Utc::now().naive_utc());
    Ok((structure, errors))
}

/// Extract the first balanced `{...}` JSON object embedded in an HTML page
/// (conventionally inside a `<script type="application/json">` tag) and
/// parse it as a bundle.
pub fn parse_html_embedded(content: &[u8]) -> Result<(ImportStructure, Vec<ImportError>), Vec<ImportError>> {
    let text = String::from_utf8_lossy(content);
    let Some(start) = text.find('{') else {
        return Err(vec![ImportError::new("NO_EMBEDDED_JSON", "no embedded JSON object found in HTML")]);
    };

    let mut depth = 0i32;
    let mut end = None;
    for (offset, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(start + offset + ch.len_utf8());
                    break;
                }
            }
            _ => {}
        }
    }
    let Some(end) = end else {
        return Err(vec![ImportError::new("UNBALANCED_EMBEDDED_JSON", "embedded JSON object is not balanced")]);
    };

    parse(text[start..end].as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bundle() -> Value {
        serde_json::json!({
            "resourceType": "Bundle",
            "type": "collection",
            "entry": [
                {"resource": {"resourceType": "Patient", "id": "DEMO_PATIENT_01", "gender": "female", "birthDate": "1980-01-01"}},
                {"resource": {
                    "resourceType": "Encounter",
                    "id": "ENC1",
                    "subject": {"reference": "Patient/DEMO_PATIENT_01"},
                    "period": {"start": "2024-03-15", "end": "2024-03-16"}
                }},
                {"resource": {
                    "resourceType": "Observation",
                    "subject": {"reference": "Patient/DEMO_PATIENT_01"},
                    "encounter": {"reference": "Encounter/ENC1"},
                    "code": {"coding": [{"code": "VITAL:HEART_RATE"}]},
                    "valueQuantity": {"value": 72.0},
                    "effectiveDateTime": "2024-03-15"
                }}
            ]
        })
    }

    #[test]
    fn parses_patient_encounter_and_observation_resources() {
        let bundle = serde_json::to_vec(&sample_bundle()).unwrap();
        let (structure, errors) = parse(&bundle).unwrap();
        assert!(errors.is_empty());
        assert_eq!(structure.data.patients.len(), 1);
        assert_eq!(structure.data.visits.len(), 1);
        assert_eq!(structure.data.observations.len(), 1);
        assert_eq!(structure.data.observations[0].value.numeric_value(), Some(72.0));
    }

    #[test]
    fn extracts_bundle_embedded_in_html() {
        let bundle = serde_json::to_string(&sample_bundle()).unwrap();
        let html = format!("<html><body><script type=\"application/json\">{bundle}</script></body></html>");
        let (structure, _errors) = parse_html_embedded(html.as_bytes()).unwrap();
        assert_eq!(structure.data.patients.len(), 1);
    }

    #[test]
    fn unsupported_resource_type_is_reported_but_non_fatal() {
        let mut bundle = sample_bundle();
        bundle["entry"].as_array_mut().unwrap().push(serde_json::json!({"resource": {"resourceType": "Medication"}}));
        let content = serde_json::to_vec(&bundle).unwrap();
        let (structure, errors) = parse(&content).unwrap();
        assert_eq!(structure.data.patients.len(), 1);
        assert!(errors.iter().any(|e| e.code == "UNSUPPORTED_RESOURCE"));
    }
}

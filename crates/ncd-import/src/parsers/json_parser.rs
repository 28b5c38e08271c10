//! Plain JSON export parser (spec.md §4.9): a JSON export serialises the
//! canonical [`ImportStructure`] verbatim, so parsing is a direct
//! deserialisation with no pivoting or correlation-key bookkeeping.

use crate::error::ImportError;
use ncd_model::ImportStructure;

pub fn parse(content: &[u8]) -> Result<(ImportStructure, Vec<ImportError>), Vec<ImportError>> {
    let structure: ImportStructure = serde_json::from_slice(content)
        .map_err(|e| vec![ImportError::new("MALFORMED_JSON", e.to_string())])?;

    if structure.data.patients.is_empty() {
        return Err(vec![ImportError::new("NO_PATIENTS", "import structure has no patients")]);
    }

    Ok((structure, Vec::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_canonical_structure() {
        let original = ImportStructure::from_data(
            "json",
            vec![ncd_model::Patient::new("DEMO_PATIENT_01")],
            Vec::new(),
            Vec::new(),
            chrono::Utc::now().naive_utc(),
        );
        let encoded = serde_json::to_vec(&original).unwrap();
        let (decoded, errors) = parse(&encoded).unwrap();
        assert!(errors.is_empty());
        assert_eq!(decoded.data.patients[0].patient_cd, "DEMO_PATIENT_01");
    }

    #[test]
    fn empty_patient_list_is_a_hard_failure() {
        let original = ImportStructure::from_data("json", Vec::new(), Vec::new(), Vec::new(), chrono::Utc::now().naive_utc());
        let encoded = serde_json::to_vec(&original).unwrap();
        let errors = parse(&encoded).unwrap_err();
        assert!(errors.iter().any(|e| e.code == "NO_PATIENTS"));
    }

    #[test]
    fn malformed_json_is_reported() {
        let errors = parse(b"not json").unwrap_err();
        assert_eq!(errors[0].code, "MALFORMED_JSON");
    }
}

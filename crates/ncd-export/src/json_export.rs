//! Plain JSON export (spec.md §4.9): serialises the canonical
//! `ImportStructure` verbatim, the exact inverse of
//! `ncd_import::parsers::json_parser`.

use crate::error::Result;
use ncd_model::ImportStructure;

pub fn export_to_json(structure: &ImportStructure) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(structure)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json_parser_shape() {
        let structure = ImportStructure::from_data(
            "json",
            vec![ncd_model::Patient::new("DEMO_PATIENT_01")],
            Vec::new(),
            Vec::new(),
            chrono::Utc::now().naive_utc(),
        );
        let bytes = export_to_json(&structure).unwrap();
        let decoded: ImportStructure = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded.data.patients[0].patient_cd, "DEMO_PATIENT_01");
    }
}

//! HL7-CDA bundle export (spec.md §4.9): the FHIR-shaped `Bundle`/`entry`
//! inverse of `ncd_import::parsers::cda_parser`, with an optional embedded
//! Ed25519 signature over the unsigned bundle's SHA-256 digest.

use crate::error::{ExportError, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use ncd_model::{ImportStructure, ObservationValue, Visit};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// An Ed25519 signature embedded in an exported bundle's `signature` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CdaSignature {
    /// Signing algorithm identifier, currently always `"Ed25519"`.
    pub algorithm: String,
    /// Base64-encoded Ed25519 signature over the unsigned bundle's SHA-256 digest.
    pub value: String,
    /// Base64-encoded Ed25519 public key.
    #[serde(rename = "publicKey")]
    pub public_key: String,
}

fn patient_resource(patient: &ncd_model::Patient) -> Value {
    json!({
        "resourceType": "Patient",
        "id": patient.patient_cd,
        "gender": patient.sex_cd,
        "birthDate": patient.birth_date.map(|d| d.format("%Y-%m-%d").to_string()),
    })
}

fn encounter_resource(visit: &Visit, patient_cd: &str) -> Value {
    json!({
        "resourceType": "Encounter",
        "id": visit.encounter_num.map(|n| n.to_string()).unwrap_or_default(),
        "subject": { "reference": format!("Patient/{patient_cd}") },
        "period": {
            "start": visit.start_date.format("%Y-%m-%d").to_string(),
            "end": visit.end_date.map(|d| d.format("%Y-%m-%d").to_string()),
        },
    })
}

fn observation_resource(observation: &ncd_model::Observation, patient_cd: &str) -> Value {
    let value = match &observation.value {
        ObservationValue::Numeric { nval_num } => json!({ "valueQuantity": { "value": nval_num } }),
        other => json!({ "valueString": other.text_value().unwrap_or_default() }),
    };
    let mut resource = json!({
        "resourceType": "Observation",
        "subject": { "reference": format!("Patient/{patient_cd}") },
        "encounter": { "reference": format!("Encounter/{}", observation.encounter_num) },
        "code": { "coding": [{ "code": observation.concept_cd }] },
        "effectiveDateTime": observation.start_date.format("%Y-%m-%d").to_string(),
    });
    resource.as_object_mut().unwrap().extend(value.as_object().unwrap().clone());
    resource
}

fn build_bundle(structure: &ImportStructure) -> Value {
    let patients_by_num: BTreeMap<i64, &str> = structure
        .data
        .patients
        .iter()
        .filter_map(|p| p.patient_num.map(|n| (n, p.patient_cd.as_str())))
        .collect();

    let mut entries: Vec<Value> = Vec::new();
    for patient in &structure.data.patients {
        entries.push(json!({ "resource": patient_resource(patient) }));
    }
    for visit in &structure.data.visits {
        let patient_cd = patients_by_num.get(&visit.patient_num).copied().unwrap_or_default();
        entries.push(json!({ "resource": encounter_resource(visit, patient_cd) }));
    }
    for observation in &structure.data.observations {
        let patient_cd = patients_by_num.get(&observation.patient_num).copied().unwrap_or_default();
        entries.push(json!({ "resource": observation_resource(observation, patient_cd) }));
    }

    json!({
        "resourceType": "Bundle",
        "type": "collection",
        "entry": entries,
    })
}

/// Export `structure` as an HL7-CDA bundle. When `signing_key` is supplied,
/// signs the unsigned bundle's SHA-256 digest and embeds the signature,
/// public key, and digest under the bundle's `signature` field.
pub fn export_to_hl7(structure: &ImportStructure, signing_key: Option<&SigningKey>) -> Result<Vec<u8>> {
    let mut bundle = build_bundle(structure);

    if let Some(key) = signing_key {
        let unsigned = serde_json::to_vec(&bundle)?;
        let digest = Sha256::digest(&unsigned);
        let signature: Signature = key.sign(&digest);
        let cda_signature = CdaSignature {
            algorithm: "Ed25519".to_string(),
            value: BASE64.encode(signature.to_bytes()),
            public_key: BASE64.encode(key.verifying_key().to_bytes()),
        };
        bundle["signature"] = serde_json::to_value(&cda_signature)?;
    }

    Ok(serde_json::to_vec_pretty(&bundle)?)
}

/// Verify a signed bundle: recompute the SHA-256 digest of the bundle with
/// its `signature` field stripped, then verify the embedded signature against
/// the embedded public key over that digest.
pub fn verify_cda(content: &[u8]) -> Result<bool> {
    let mut bundle: Value = serde_json::from_slice(content)?;
    let Some(signature_field) = bundle.as_object_mut().and_then(|o| o.remove("signature")) else {
        return Err(ExportError::MissingSignature);
    };

    let cda_signature: CdaSignature =
        serde_json::from_value(signature_field).map_err(|e| ExportError::InvalidKey(e.to_string()))?;
    if cda_signature.algorithm != "Ed25519" {
        return Err(ExportError::InvalidKey(format!("unsupported signature algorithm {:?}", cda_signature.algorithm)));
    }

    let unsigned = serde_json::to_vec(&bundle)?;
    let recomputed = Sha256::digest(&unsigned);

    let signature_bytes = BASE64.decode(&cda_signature.value).map_err(|e| ExportError::InvalidKey(e.to_string()))?;
    let signature_array: [u8; 64] =
        signature_bytes.try_into().map_err(|_| ExportError::InvalidKey("signature must be 64 bytes".to_string()))?;
    let signature = Signature::from_bytes(&signature_array);
    let public_key_bytes = BASE64.decode(&cda_signature.public_key).map_err(|e| ExportError::InvalidKey(e.to_string()))?;
    let public_key_array: [u8; 32] =
        public_key_bytes.try_into().map_err(|_| ExportError::InvalidKey("public key must be 32 bytes".to_string()))?;
    let verifying_key = VerifyingKey::from_bytes(&public_key_array).map_err(|e| ExportError::InvalidKey(e.to_string()))?;

    Ok(verifying_key.verify(&recomputed, &signature).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ncd_model::Patient;
    use rand::rngs::OsRng;

    fn sample_structure() -> ImportStructure {
        let mut patient = Patient::new("DEMO_PATIENT_01");
        patient.patient_num = Some(1);
        ImportStructure::from_data("hl7-cda", vec![patient], Vec::new(), Vec::new(), chrono::Utc::now().naive_utc())
    }

    #[test]
    fn unsigned_bundle_has_no_signature_field() {
        let bytes = export_to_hl7(&sample_structure(), None).unwrap();
        let bundle: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(bundle.get("signature").is_none());
    }

    #[test]
    fn signed_bundle_verifies() {
        let key = SigningKey::generate(&mut OsRng);
        let bytes = export_to_hl7(&sample_structure(), Some(&key)).unwrap();
        assert!(verify_cda(&bytes).unwrap());
    }

    #[test]
    fn tampered_bundle_fails_verification() {
        let key = SigningKey::generate(&mut OsRng);
        let bytes = export_to_hl7(&sample_structure(), Some(&key)).unwrap();
        let mut bundle: Value = serde_json::from_slice(&bytes).unwrap();
        bundle["entry"][0]["resource"]["gender"] = json!("tampered");
        let tampered = serde_json::to_vec(&bundle).unwrap();
        assert!(!verify_cda(&tampered).unwrap());
    }

    #[test]
    fn unsigned_bundle_has_no_signature_to_verify() {
        let bytes = export_to_hl7(&sample_structure(), None).unwrap();
        assert!(matches!(verify_cda(&bytes), Err(ExportError::MissingSignature)));
    }

    #[test]
    fn observation_resources_round_trip_into_cda_parser() {
        let mut patient = Patient::new("DEMO_PATIENT_01");
        patient.patient_num = Some(1);
        let mut visit = Visit::new(1, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        visit.encounter_num = Some(10);
        let obs = ncd_model::Observation::new(1, 10, "VITAL:HEART_RATE", ObservationValue::Numeric { nval_num: 72.0 }, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        let structure = ImportStructure::from_data("hl7-cda", vec![patient], vec![visit], vec![obs], chrono::Utc::now().naive_utc());

        let bytes = export_to_hl7(&structure, None).unwrap();
        let bundle: Value = serde_json::from_slice(&bytes).unwrap();
        let entries = bundle["entry"].as_array().unwrap();
        assert_eq!(entries.len(), 3);
    }
}

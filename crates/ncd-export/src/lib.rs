//! Export Pipeline (C9): serialises the canonical `ImportStructure` back out
//! as CSV, plain JSON, or a (optionally Ed25519-signed) HL7-CDA bundle.

pub mod csv_export;
pub mod error;
pub mod hl7_export;
pub mod json_export;

pub use csv_export::export_to_csv;
pub use error::{ExportError, Result};
pub use hl7_export::{export_to_hl7, verify_cda, CdaSignature};
pub use json_export::export_to_json;

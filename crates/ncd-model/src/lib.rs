//! Shared domain types for the neurostore clinical data engine.
//!
//! Every struct here mirrors a schema table 1:1, using the same field names
//! the star-schema columns use (`PATIENT_CD`, `ENCOUNTER_NUM`, `CONCEPT_CD`,
//! ...) so import/export parsers and repositories share one vocabulary.

pub mod audit;
pub mod code_lookup;
pub mod concept;
pub mod cql_rule;
pub mod import_structure;
pub mod migration;
pub mod note;
pub mod observation;
pub mod patient;
pub mod user;
pub mod value;
pub mod visit;

pub use audit::AuditFields;
pub use code_lookup::CodeLookup;
pub use concept::Concept;
pub use cql_rule::CqlRule;
pub use import_structure::{ExportInfo, ImportMetadata, ImportOptions, ImportStatistics, ImportStructure};
pub use migration::MigrationRecord;
pub use note::Note;
pub use observation::Observation;
pub use patient::Patient;
pub use user::User;
pub use value::{BlobValue, ObservationValue, ValueType};
pub use visit::Visit;

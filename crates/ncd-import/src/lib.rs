//! Import Pipeline (C7) and Database Import Service (C8): sniff an
//! uploaded file's format, parse it into the canonical
//! `ncd_model::ImportStructure`, and write it through the Repository Layer,
//! resolving natural-key correlations into storage-assigned surrogate ids.

pub mod error;
pub mod outcome;
pub mod parsers;
pub mod service;
pub mod sniff;

pub use error::{ImportError, ServiceError};
pub use outcome::{import_file, ImportOutcome};
pub use service::{import_to_database, DuplicateStrategy, IdMaps, ImportResult, ImportServiceOptions};
pub use sniff::{detect_format, DetectedFormat};

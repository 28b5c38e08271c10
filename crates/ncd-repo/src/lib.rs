//! Repository Layer: typed accessors enforcing per-entity invariants over
//! the embedded store, built on `ncd-storage`.

pub mod code_lookup;
pub mod common;
pub mod concept;
pub mod cql_rule;
pub mod error;
pub mod note;
pub mod observation;
pub mod patient;
pub mod user;
pub mod visit;

pub use code_lookup::{CodeLookupRepository, SqliteCodeLookupRepository};
pub use common::{FindOptions, Page, Repository};
pub use concept::{ConceptRepository, SearchConceptsOptions, SqliteConceptRepository};
pub use cql_rule::{CqlRepository, SqliteCqlRepository};
pub use error::{RepoError, Result};
pub use note::{NoteExportFormat, NoteRepository, SqliteNoteRepository};
pub use observation::{ObservationRepository, ObservationStatistics, SqliteObservationRepository};
pub use patient::{PatientCriteria, PatientRepository, SqlitePatientRepository, VitalStatus};
pub use user::{SqliteUserRepository, UserRepository};
pub use visit::{SqliteVisitRepository, VisitRepository, VisitTimelineEntry};

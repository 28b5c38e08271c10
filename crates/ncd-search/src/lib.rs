//! Search Service (C10): parametrised patient/observation search over the
//! embedded store. Issues its own `SELECT`s directly against
//! `ncd_storage::Storage` rather than through `ncd_repo::Repository`'s
//! pagination API, whose `criteria` parameter is an unparametrised raw SQL
//! fragment unsuited to composing filters built from untrusted input.

pub mod error;
pub mod filters;
pub mod observations;
pub mod patients;

pub use error::{Result, SearchError};
pub use filters::{SearchFilters, SearchPage};
pub use observations::search_observations;
pub use patients::search_patients;

//! Seed Loader (spec.md §4.3): idempotent reference-data bootstrap for a
//! freshly migrated database. Ships the standard concept dimension, code
//! lookups, CQL rules, concept-to-rule links, and default user accounts as
//! TSV files baked into the binary.

pub mod error;
pub mod loader;
pub mod report;

pub use error::{Result, SeedError};
pub use loader::{load_all, load_code_lookup, load_concept_cql_links, load_concepts, load_cql_rules, load_users};
pub use report::SeedReport;

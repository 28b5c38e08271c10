//! Concept Resolution Cache: resolves concept codes to display label,
//! value type, unit, and colour/icon hints, with batch + fallback lookup.

pub mod cache;
pub mod color;
pub mod error;
pub mod prefix;

pub use cache::{ConceptCache, ConceptSource, ResolvedConcept};
pub use color::{color_for, HeuristicContext};
pub use error::{ConceptCacheError, Result};
pub use prefix::SourceSystemPrefix;

//! Concept dimension (SNOMED/LOINC/local terminology).

use crate::value::ValueType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A concept hierarchical path: starts with `\`, contains no `\\`, does not
/// end with `\` (invariant 3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptPath(String);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConceptPathError {
    #[error("concept path must start with '\\': {0:?}")]
    MissingLeadingSlash(String),
    #[error("concept path must not end with '\\': {0:?}")]
    TrailingSlash(String),
    #[error("concept path must not contain '\\\\': {0:?}")]
    DoubledSlash(String),
}

impl ConceptPath {
    pub fn parse(path: impl Into<String>) -> Result<Self, ConceptPathError> {
        let path = path.into();
        if !path.starts_with('\\') {
            return Err(ConceptPathError::MissingLeadingSlash(path));
        }
        if path.len() > 1 && path.ends_with('\\') {
            return Err(ConceptPathError::TrailingSlash(path));
        }
        if path.contains("\\\\") {
            return Err(ConceptPathError::DoubledSlash(path));
        }
        Ok(Self(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    /// Unique natural key.
    pub concept_cd: String,
    pub concept_path: ConceptPath,
    pub name_char: String,
    pub category_cd: Option<String>,
    pub value_type: ValueType,
    pub unit_cd: Option<String>,
    pub source_system_cd: String,
    /// Concept code this one links to for answer linkage (e.g. a Selection's
    /// allowed-answer Concept).
    pub related_concept_cd: Option<String>,
    pub concept_blob: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_path_without_leading_slash() {
        assert_eq!(
            ConceptPath::parse("Vital Signs\\Heart Rate"),
            Err(ConceptPathError::MissingLeadingSlash(
                "Vital Signs\\Heart Rate".to_string()
            ))
        );
    }

    #[test]
    fn rejects_trailing_slash() {
        assert!(matches!(
            ConceptPath::parse("\\Vital Signs\\"),
            Err(ConceptPathError::TrailingSlash(_))
        ));
    }

    #[test]
    fn rejects_doubled_slash() {
        assert!(matches!(
            ConceptPath::parse("\\Vital\\\\Signs"),
            Err(ConceptPathError::DoubledSlash(_))
        ));
    }

    #[test]
    fn accepts_well_formed_path() {
        let path = ConceptPath::parse("\\Vital Signs\\Heart Rate").unwrap();
        assert_eq!(path.as_str(), "\\Vital Signs\\Heart Rate");
    }
}

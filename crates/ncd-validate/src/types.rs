//! Core types for clinical data validation.
//!
//! This module provides the fundamental types used throughout the validation
//! process:
//!
//! - [`ValidationValue`] - a candidate observation value, one variant per
//!   invariant-2 value-type.
//! - [`ValidationInput`] - a value plus the concept/metadata context needed to
//!   look up standard and concept rules.
//! - [`ValidationReport`] - aggregated outcome of running all validation steps.
//! - [`Diagnostic`] - a single error or warning.
//! - [`Severity`] - diagnostic severity.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Severity of a validation diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Prevents the value from being accepted.
    Error,
    /// Accepted, but worth surfacing to the caller.
    Warning,
    /// Purely informational.
    Information,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Information => write!(f, "information"),
        }
    }
}

/// A candidate observation value, tagged by the value-type invariant it
/// belongs to (numeric XOR text XOR date XOR blob, never more than one).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ValidationValue {
    /// A numeric observation value.
    Numeric(f64),
    /// A free-text or coded observation value.
    Text(String),
    /// A date-valued observation.
    Date(NaiveDate),
    /// A binary/blob observation (e.g. an uploaded file or scanned form).
    Blob {
        /// Size of the blob in bytes.
        size_bytes: u64,
    },
}

impl ValidationValue {
    /// Name of this value's type, as used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            ValidationValue::Numeric(_) => "numeric",
            ValidationValue::Text(_) => "text",
            ValidationValue::Date(_) => "date",
            ValidationValue::Blob { .. } => "blob",
        }
    }
}

/// Input to a single [`crate::validator::Validator::validate`] call.
#[derive(Debug, Clone)]
pub struct ValidationInput {
    /// The candidate value.
    pub value: ValidationValue,
    /// Concept code the value is recorded against, if known. Drives standard
    /// rule lookup and concept (CQL) rule lookup.
    pub concept_code: Option<String>,
    /// Free-form context (e.g. `"patient_dob"` for an age-derived business
    /// rule) threaded through to diagnostics' `details`.
    pub metadata: HashMap<String, String>,
}

impl ValidationInput {
    /// Construct a new input with no concept linkage or metadata.
    pub fn new(value: ValidationValue) -> Self {
        Self {
            value,
            concept_code: None,
            metadata: HashMap::new(),
        }
    }

    /// Attach a concept code.
    pub fn with_concept(mut self, concept_code: impl Into<String>) -> Self {
        self.concept_code = Some(concept_code.into());
        self
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A single validation error or warning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Machine-readable code, e.g. `"OUT_OF_RANGE"`, `"NO_CONCEPT_RULES"`.
    pub code: String,
    /// Field the diagnostic applies to, when narrower than the whole value.
    pub field: Option<String>,
    /// Human-readable explanation.
    pub message: String,
    /// Structured supporting detail (rule bounds, observed value, ...).
    pub details: Option<serde_json::Value>,
    /// Severity of this diagnostic.
    pub severity: Severity,
    /// Id of the rule that produced this diagnostic, if any.
    pub rule_id: Option<String>,
    /// Name of the rule that produced this diagnostic, if any.
    pub rule_name: Option<String>,
}

impl Diagnostic {
    /// Construct an error-severity diagnostic.
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            field: None,
            message: message.into(),
            details: None,
            severity: Severity::Error,
            rule_id: None,
            rule_name: None,
        }
    }

    /// Construct a warning-severity diagnostic.
    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            field: None,
            message: message.into(),
            details: None,
            severity: Severity::Warning,
            rule_id: None,
            rule_name: None,
        }
    }

    /// Attach structured details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Attach the originating rule's id and name.
    pub fn with_rule(mut self, rule_id: impl Into<String>, rule_name: impl Into<String>) -> Self {
        self.rule_id = Some(rule_id.into());
        self.rule_name = Some(rule_name.into());
        self
    }

    /// Attach the field this diagnostic narrows to.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

/// Aggregated outcome of validating one [`ValidationInput`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// True iff `errors` is empty (warnings never affect this).
    pub is_valid: bool,
    /// Blocking diagnostics.
    pub errors: Vec<Diagnostic>,
    /// Non-blocking diagnostics.
    pub warnings: Vec<Diagnostic>,
    /// Free-form metadata describing how the report was produced (e.g. which
    /// rule set matched, how many concept rules ran).
    pub metadata: HashMap<String, String>,
}

impl ValidationReport {
    /// An empty, passing report.
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Push a diagnostic, routing it to `errors` or `warnings` by severity
    /// and flipping `is_valid` when an error is added.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => {
                self.is_valid = false;
                self.errors.push(diagnostic);
            }
            Severity::Warning | Severity::Information => {
                self.warnings.push(diagnostic);
            }
        }
    }

    /// Merge another report's diagnostics into this one.
    pub fn merge(&mut self, other: ValidationReport) {
        if !other.is_valid {
            self.is_valid = false;
        }
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::valid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_pushes_errors_and_flips_validity() {
        let mut report = ValidationReport::valid();
        assert!(report.is_valid);
        report.push(Diagnostic::warning("INFO", "just a note"));
        assert!(report.is_valid);
        report.push(Diagnostic::error("OUT_OF_RANGE", "too big"));
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn merge_combines_reports() {
        let mut a = ValidationReport::valid();
        let mut b = ValidationReport::valid();
        b.push(Diagnostic::error("X", "bad"));
        a.merge(b);
        assert!(!a.is_valid);
        assert_eq!(a.errors.len(), 1);
    }
}

//! Data validation for the neurostore clinical data engine.
//!
//! [`validator::Validator`] runs a candidate observation value through, in
//! order: type validation, standard rules ([`rules::StandardRules`]), concept
//! rules (CQL, via the pluggable [`ncd_cql::evaluator::RuleEvaluator`] seam),
//! and business rules. The result is a [`types::ValidationReport`].
//!
//! # Example
//!
//! ```
//! use ncd_validate::{Validator, ValidationInput, ValidationValue};
//!
//! let validator = Validator::new();
//! let input = ValidationInput::new(ValidationValue::Numeric(72.0)).with_concept("VITAL:HEART_RATE");
//! let report = validator.validate(&input).unwrap();
//! assert!(report.is_valid);
//! ```

pub mod error;
pub mod rules;
pub mod types;
pub mod validator;

pub use error::{Result, ValidatorError};
pub use rules::StandardRules;
pub use types::{Diagnostic, Severity, ValidationInput, ValidationReport, ValidationValue};
pub use validator::{ConceptRule, Validator};

//! The data validator.
//!
//! [`Validator::validate`] runs, in order, the four steps spec.md §4.6
//! describes:
//!
//! 1. Type validation — the candidate value's variant must match the
//!    concept's expected value type (already enforced by
//!    [`crate::types::ValidationValue`] being typed at the call site; this
//!    step instead checks type-specific invariants like finite floats).
//! 2. Standard rule validation — the [`crate::rules::StandardRules`] entry
//!    for the value's type and concept.
//! 3. Concept rule validation — any CQL rules linked to the concept, run
//!    through a pluggable [`ncd_cql::evaluator::RuleEvaluator`]. A concept
//!    with no linked rules produces a `NO_CONCEPT_RULES` warning, not an
//!    error; a failing rule produces a `CONCEPT_RULE_VIOLATION` error.
//! 4. Business rules — bespoke multi-field checks (age, blood pressure,
//!    heart rate) keyed by concept code.

use crate::error::Result;
use crate::rules::{BusinessRule, StandardRules};
use crate::types::{Diagnostic, ValidationInput, ValidationReport, ValidationValue};
use chrono::Utc;
use ncd_cql::evaluator::{BasicRuleEvaluator, RuleEvaluator, RuleInput};
use regex::Regex;
use std::collections::HashMap;

/// A CQL rule linked to a concept.
#[derive(Debug, Clone)]
pub struct ConceptRule {
    pub rule_id: String,
    pub rule_name: String,
    pub body: String,
}

/// Validates candidate observation values against type, standard, concept,
/// and business rules.
pub struct Validator {
    rules: StandardRules,
    concept_rules: HashMap<String, Vec<ConceptRule>>,
    evaluator: Box<dyn RuleEvaluator + Send + Sync>,
}

impl Validator {
    /// Construct a validator with default standard rules, no concept rules,
    /// and the minimal [`BasicRuleEvaluator`].
    pub fn new() -> Self {
        Self {
            rules: StandardRules::defaults(),
            concept_rules: HashMap::new(),
            evaluator: Box::new(BasicRuleEvaluator::new()),
        }
    }

    /// Construct a validator with an explicit rule evaluator (for wiring in a
    /// full CQL engine instead of the minimal range/enum one).
    pub fn with_evaluator(evaluator: Box<dyn RuleEvaluator + Send + Sync>) -> Self {
        Self {
            rules: StandardRules::defaults(),
            concept_rules: HashMap::new(),
            evaluator,
        }
    }

    /// Replace the standard rule table wholesale.
    pub fn set_custom_rules(&mut self, rules: StandardRules) {
        self.rules = rules;
    }

    /// Reset the standard rule table to domain defaults.
    pub fn reset_to_defaults(&mut self) {
        self.rules = StandardRules::defaults();
    }

    /// Link a CQL rule to a concept code. A concept can have multiple rules;
    /// all must pass.
    pub fn link_concept_rule(&mut self, concept_code: impl Into<String>, rule: ConceptRule) {
        self.concept_rules
            .entry(concept_code.into())
            .or_default()
            .push(rule);
    }

    /// Run all four validation steps against one input.
    pub fn validate(&self, input: &ValidationInput) -> Result<ValidationReport> {
        let mut report = ValidationReport::valid();

        self.validate_type(input, &mut report);
        self.validate_standard_rules(input, &mut report);
        self.validate_concept_rules(input, &mut report)?;
        self.validate_business_rules(input, &mut report);

        report
            .metadata
            .insert("value_type".to_string(), input.value.type_name().to_string());
        Ok(report)
    }

    fn validate_type(&self, input: &ValidationInput, report: &mut ValidationReport) {
        if let ValidationValue::Numeric(n) = &input.value {
            if !n.is_finite() {
                report.push(
                    Diagnostic::error("NOT_FINITE", "numeric value must be finite")
                        .with_field("value"),
                );
            }
        }
    }

    fn validate_standard_rules(&self, input: &ValidationInput, report: &mut ValidationReport) {
        let concept = input.concept_code.as_deref();
        match &input.value {
            ValidationValue::Numeric(n) => {
                let rule = self.rules.numeric_rule_for(concept);
                if let Some(min) = rule.min {
                    if *n < min {
                        report.push(
                            Diagnostic::error(
                                "OUT_OF_RANGE",
                                format!("{n} is below the minimum of {min}"),
                            )
                            .with_field("value"),
                        );
                    }
                }
                if let Some(max) = rule.max {
                    if *n > max {
                        report.push(
                            Diagnostic::error(
                                "OUT_OF_RANGE",
                                format!("{n} is above the maximum of {max}"),
                            )
                            .with_field("value"),
                        );
                    }
                }
                if !rule.allow_negative && *n < 0.0 {
                    report.push(
                        Diagnostic::error("NEGATIVE_NOT_ALLOWED", format!("{n} must not be negative"))
                            .with_field("value"),
                    );
                }
                if !rule.allow_zero && *n == 0.0 {
                    report.push(
                        Diagnostic::error("ZERO_NOT_ALLOWED", "value must not be zero")
                            .with_field("value"),
                    );
                }
                if let Some(precision) = rule.precision {
                    let scale = 10f64.powi(precision as i32);
                    if (n * scale).round() / scale != *n {
                        report.push(
                            Diagnostic::warning(
                                "PRECISION_EXCEEDED",
                                format!("{n} has more than {precision} decimal digits"),
                            )
                            .with_field("value"),
                        );
                    }
                }
            }
            ValidationValue::Text(s) => {
                let rule = self.rules.text_rule_for(concept);
                let value = if rule.trim { s.trim() } else { s.as_str() };
                if value.is_empty() && !rule.allow_empty {
                    report.push(
                        Diagnostic::error("EMPTY_NOT_ALLOWED", "text value must not be empty")
                            .with_field("value"),
                    );
                }
                if let Some(min_len) = rule.min_length {
                    if value.len() < min_len {
                        report.push(
                            Diagnostic::error(
                                "TOO_SHORT",
                                format!("text is shorter than the minimum length {min_len}"),
                            )
                            .with_field("value"),
                        );
                    }
                }
                if let Some(max_len) = rule.max_length {
                    if value.len() > max_len {
                        report.push(
                            Diagnostic::error(
                                "TOO_LONG",
                                format!("text exceeds the maximum length {max_len}"),
                            )
                            .with_field("value"),
                        );
                    }
                }
                if let Some(pattern) = &rule.pattern {
                    match Regex::new(pattern) {
                        Ok(re) => {
                            if !re.is_match(value) {
                                report.push(
                                    Diagnostic::error(
                                        "PATTERN_MISMATCH",
                                        format!("text does not match pattern {pattern:?}"),
                                    )
                                    .with_field("value"),
                                );
                            }
                        }
                        Err(e) => {
                            report.push(Diagnostic::warning(
                                "INVALID_PATTERN",
                                format!("configured pattern {pattern:?} is not a valid regex: {e}"),
                            ));
                        }
                    }
                }
            }
            ValidationValue::Date(date) => {
                let rule = self.rules.date_rule_for(concept);
                let today = Utc::now().date_naive();
                if !rule.allow_future && *date > today {
                    report.push(
                        Diagnostic::error("FUTURE_DATE_NOT_ALLOWED", format!("{date} is in the future"))
                            .with_field("value"),
                    );
                }
                if !rule.allow_past && *date < today {
                    report.push(
                        Diagnostic::error("PAST_DATE_NOT_ALLOWED", format!("{date} is in the past"))
                            .with_field("value"),
                    );
                }
                if let Some(min_date) = rule.min_date {
                    if *date < min_date {
                        report.push(
                            Diagnostic::error(
                                "OUT_OF_RANGE",
                                format!("{date} is before the minimum date {min_date}"),
                            )
                            .with_field("value"),
                        );
                    }
                }
                if let Some(max_date) = rule.max_date {
                    if *date > max_date {
                        report.push(
                            Diagnostic::error(
                                "OUT_OF_RANGE",
                                format!("{date} is after the maximum date {max_date}"),
                            )
                            .with_field("value"),
                        );
                    }
                }
            }
            ValidationValue::Blob { size_bytes } => {
                let rule = self.rules.blob_rule_for(concept);
                if let Some(max_size) = rule.max_size {
                    if *size_bytes > max_size {
                        report.push(
                            Diagnostic::error(
                                "BLOB_TOO_LARGE",
                                format!("blob of {size_bytes} bytes exceeds the maximum of {max_size}"),
                            )
                            .with_field("value"),
                        );
                    }
                }
            }
        }
    }

    fn validate_concept_rules(
        &self,
        input: &ValidationInput,
        report: &mut ValidationReport,
    ) -> Result<()> {
        let Some(concept_code) = input.concept_code.as_deref() else {
            return Ok(());
        };
        let Some(rules) = self.concept_rules.get(concept_code) else {
            report.push(Diagnostic::warning(
                "NO_CONCEPT_RULES",
                format!("no CQL rules are linked to concept {concept_code}"),
            ));
            return Ok(());
        };

        let rule_input = match &input.value {
            ValidationValue::Numeric(n) => Some(RuleInput::Numeric(*n)),
            ValidationValue::Text(s) => Some(RuleInput::Text(s.clone())),
            _ => None,
        };
        let Some(rule_input) = rule_input else {
            return Ok(());
        };

        for rule in rules {
            match self.evaluator.evaluate(&rule.body, &rule_input) {
                Ok(verdict) if !verdict.passed => {
                    report.push(
                        Diagnostic::error(
                            "CONCEPT_RULE_VIOLATION",
                            verdict
                                .message
                                .unwrap_or_else(|| format!("value violates rule {}", rule.rule_name)),
                        )
                        .with_rule(rule.rule_id.clone(), rule.rule_name.clone()),
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    report.push(Diagnostic::warning(
                        "CONCEPT_RULE_UNEVALUATED",
                        format!("rule {} could not be evaluated: {e}", rule.rule_name),
                    ));
                }
            }
        }
        Ok(())
    }

    fn validate_business_rules(&self, input: &ValidationInput, report: &mut ValidationReport) {
        let Some(concept_code) = input.concept_code.as_deref() else {
            return;
        };
        let Some(business_rule) = BusinessRule::for_concept(concept_code) else {
            return;
        };

        match business_rule {
            BusinessRule::AgeInYears => {
                if let ValidationValue::Numeric(n) = &input.value {
                    if !(0.0..=150.0).contains(n) {
                        report.push(Diagnostic::error(
                            "IMPLAUSIBLE_AGE",
                            format!("age {n} years is outside the plausible range 0..150"),
                        ));
                    }
                }
            }
            BusinessRule::BloodPressure => {
                if let ValidationValue::Text(s) = &input.value {
                    if let Some((sys, dia)) = s.split_once('/') {
                        let parsed = sys.trim().parse::<f64>().ok().zip(dia.trim().parse::<f64>().ok());
                        match parsed {
                            Some((sys, dia)) if sys <= dia => {
                                report.push(Diagnostic::error(
                                    "INVALID_BLOOD_PRESSURE",
                                    format!("systolic {sys} must be greater than diastolic {dia}"),
                                ));
                            }
                            Some((sys, dia)) if !(50.0..=300.0).contains(&sys) || !(50.0..=300.0).contains(&dia) => {
                                report.push(Diagnostic::error(
                                    "IMPLAUSIBLE_BLOOD_PRESSURE",
                                    format!("{sys}/{dia} is outside the plausible range 50..300"),
                                ));
                            }
                            None => {
                                report.push(Diagnostic::error(
                                    "INVALID_BLOOD_PRESSURE",
                                    format!("{s:?} is not a systolic/diastolic pair"),
                                ));
                            }
                            _ => {}
                        }
                    } else {
                        report.push(Diagnostic::error(
                            "INVALID_BLOOD_PRESSURE",
                            format!("{s:?} is not formatted as systolic/diastolic"),
                        ));
                    }
                }
            }
            BusinessRule::HeartRate => {
                if let ValidationValue::Numeric(n) = &input.value {
                    if !(30.0..=250.0).contains(n) {
                        report.push(Diagnostic::error(
                            "IMPLAUSIBLE_HEART_RATE",
                            format!("{n} bpm is outside the plausible range 30..250"),
                        ));
                    }
                }
            }
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_out_of_range_is_an_error() {
        let mut validator = Validator::new();
        let mut rules = StandardRules::defaults();
        rules.numeric_overrides.insert(
            "VITAL:HR".to_string(),
            crate::rules::NumericRule {
                min: Some(20.0),
                max: Some(250.0),
                ..Default::default()
            },
        );
        validator.set_custom_rules(rules);

        let input = ValidationInput::new(ValidationValue::Numeric(300.0)).with_concept("VITAL:HR");
        let report = validator.validate(&input).unwrap();
        assert!(!report.is_valid);
        assert!(report.errors.iter().any(|d| d.code == "OUT_OF_RANGE"));
    }

    #[test]
    fn missing_concept_rules_produces_warning_not_error() {
        let validator = Validator::new();
        let input = ValidationInput::new(ValidationValue::Numeric(5.0)).with_concept("UNKNOWN:CONCEPT");
        let report = validator.validate(&input).unwrap();
        assert!(report.is_valid);
        assert!(report.warnings.iter().any(|d| d.code == "NO_CONCEPT_RULES"));
    }

    #[test]
    fn concept_rule_violation_is_an_error() {
        let mut validator = Validator::new();
        validator.link_concept_rule(
            "VITAL:HR",
            ConceptRule {
                rule_id: "R1".to_string(),
                rule_name: "heart rate range".to_string(),
                body: "40..180".to_string(),
            },
        );
        let input = ValidationInput::new(ValidationValue::Numeric(200.0)).with_concept("VITAL:HR");
        let report = validator.validate(&input).unwrap();
        assert!(!report.is_valid);
        assert!(report.errors.iter().any(|d| d.code == "CONCEPT_RULE_VIOLATION"));
    }

    #[test]
    fn blood_pressure_business_rule_rejects_inverted_pair() {
        let validator = Validator::new();
        let input =
            ValidationInput::new(ValidationValue::Text("80/120".to_string())).with_concept("VITAL:BLOOD_PRESSURE");
        let report = validator.validate(&input).unwrap();
        assert!(!report.is_valid);
        assert!(report.errors.iter().any(|d| d.code == "INVALID_BLOOD_PRESSURE"));
    }

    #[test]
    fn age_in_years_business_rule_rejects_out_of_range_age() {
        let validator = Validator::new();
        let input = ValidationInput::new(ValidationValue::Numeric(180.0)).with_concept("AGE_IN_YEARS");
        let report = validator.validate(&input).unwrap();
        assert!(!report.is_valid);
        assert!(report.errors.iter().any(|d| d.code == "IMPLAUSIBLE_AGE"));
    }

    #[test]
    fn age_in_years_business_rule_accepts_in_range_age() {
        let validator = Validator::new();
        let input = ValidationInput::new(ValidationValue::Numeric(42.0)).with_concept("AGE_IN_YEARS");
        let report = validator.validate(&input).unwrap();
        assert!(report.is_valid);
    }

    #[test]
    fn heart_rate_business_rule_rejects_below_new_floor() {
        let validator = Validator::new();
        let input = ValidationInput::new(ValidationValue::Numeric(25.0)).with_concept("VITAL:HEART_RATE");
        let report = validator.validate(&input).unwrap();
        assert!(!report.is_valid);
        assert!(report.errors.iter().any(|d| d.code == "IMPLAUSIBLE_HEART_RATE"));
    }

    #[test]
    fn blood_pressure_business_rule_rejects_implausible_values() {
        let validator = Validator::new();
        let input =
            ValidationInput::new(ValidationValue::Text("320/200".to_string())).with_concept("VITAL:BLOOD_PRESSURE");
        let report = validator.validate(&input).unwrap();
        assert!(!report.is_valid);
        assert!(report.errors.iter().any(|d| d.code == "IMPLAUSIBLE_BLOOD_PRESSURE"));
    }

    #[test]
    fn reset_to_defaults_clears_overrides() {
        let mut validator = Validator::new();
        let mut rules = StandardRules::defaults();
        rules.numeric_overrides.insert(
            "X".to_string(),
            crate::rules::NumericRule {
                max: Some(1.0),
                ..Default::default()
            },
        );
        validator.set_custom_rules(rules);
        validator.reset_to_defaults();
        let input = ValidationInput::new(ValidationValue::Numeric(100.0)).with_concept("X");
        let report = validator.validate(&input).unwrap();
        assert!(report.errors.is_empty());
    }
}

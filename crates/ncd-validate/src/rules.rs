//! Standard validation rule definitions.
//!
//! A [`StandardRules`] table holds one rule set per value-type shape
//! (numeric, text, date, blob). The [`crate::validator::Validator`] looks up
//! the rule set matching the concept's declared value type and applies it
//! unconditionally, before concept (CQL) rules and business rules run.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Range/precision rules for a numeric concept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericRule {
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Maximum number of digits after the decimal point.
    pub precision: Option<u32>,
    pub allow_negative: bool,
    pub allow_zero: bool,
}

impl Default for NumericRule {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
            precision: None,
            allow_negative: true,
            allow_zero: true,
        }
    }
}

/// Length/shape rules for a text concept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextRule {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub allow_empty: bool,
    /// Optional regular expression the value must fully match.
    pub pattern: Option<String>,
    pub trim: bool,
}

impl Default for TextRule {
    fn default() -> Self {
        Self {
            min_length: None,
            max_length: None,
            allow_empty: false,
            pattern: None,
            trim: true,
        }
    }
}

/// Bounds rules for a date concept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRule {
    pub min_date: Option<chrono::NaiveDate>,
    pub max_date: Option<chrono::NaiveDate>,
    pub allow_future: bool,
    pub allow_past: bool,
}

impl Default for DateRule {
    fn default() -> Self {
        Self {
            min_date: None,
            max_date: None,
            allow_future: true,
            allow_past: true,
        }
    }
}

/// Size rules for a blob concept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobRule {
    pub max_size: Option<u64>,
}

impl Default for BlobRule {
    fn default() -> Self {
        Self { max_size: None }
    }
}

/// One rule set per value-type shape, keyed by concept code for any override
/// more specific than the type-wide default.
///
/// Serialisable so a deployment can load it from a file via
/// [`ncd_foundation::Config`]/`ncd_foundation::io::load_config_from_file`
/// instead of calling [`StandardRules::defaults`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardRules {
    pub numeric_default: NumericRule,
    pub text_default: TextRule,
    pub date_default: DateRule,
    pub blob_default: BlobRule,
    pub numeric_overrides: HashMap<String, NumericRule>,
    pub text_overrides: HashMap<String, TextRule>,
    pub date_overrides: HashMap<String, DateRule>,
    pub blob_overrides: HashMap<String, BlobRule>,
}

impl StandardRules {
    /// Defaults matching the domain's baseline expectations: no numeric
    /// bound, non-empty trimmed text, dates within the last 150 years through
    /// today, blobs capped at 25 MiB.
    pub fn defaults() -> Self {
        let mut rules = Self::default();
        rules.date_default.allow_future = false;
        rules.blob_default.max_size = Some(25 * 1024 * 1024);
        rules
    }

    pub fn numeric_rule_for(&self, concept_code: Option<&str>) -> &NumericRule {
        concept_code
            .and_then(|c| self.numeric_overrides.get(c))
            .unwrap_or(&self.numeric_default)
    }

    pub fn text_rule_for(&self, concept_code: Option<&str>) -> &TextRule {
        concept_code
            .and_then(|c| self.text_overrides.get(c))
            .unwrap_or(&self.text_default)
    }

    pub fn date_rule_for(&self, concept_code: Option<&str>) -> &DateRule {
        concept_code
            .and_then(|c| self.date_overrides.get(c))
            .unwrap_or(&self.date_default)
    }

    pub fn blob_rule_for(&self, concept_code: Option<&str>) -> &BlobRule {
        concept_code
            .and_then(|c| self.blob_overrides.get(c))
            .unwrap_or(&self.blob_default)
    }
}

impl ncd_foundation::Config for StandardRules {
    fn validate(&self) -> ncd_foundation::Result<()> {
        let numeric_bounds_ok = |rule: &NumericRule| match (rule.min, rule.max) {
            (Some(min), Some(max)) => min <= max,
            _ => true,
        };
        let date_bounds_ok = |rule: &DateRule| match (rule.min_date, rule.max_date) {
            (Some(min), Some(max)) => min <= max,
            _ => true,
        };
        let text_bounds_ok = |rule: &TextRule| match (rule.min_length, rule.max_length) {
            (Some(min), Some(max)) => min <= max,
            _ => true,
        };

        let all_ok = numeric_bounds_ok(&self.numeric_default)
            && self.numeric_overrides.values().all(numeric_bounds_ok)
            && date_bounds_ok(&self.date_default)
            && self.date_overrides.values().all(date_bounds_ok)
            && text_bounds_ok(&self.text_default)
            && self.text_overrides.values().all(text_bounds_ok);

        if all_ok {
            Ok(())
        } else {
            Err(ncd_foundation::FoundationError::InvalidInput(
                "standard rules contain a min bound greater than its max bound".to_string(),
            ))
        }
    }
}

/// A named business rule keyed by the concept code it fires for.
///
/// Business rules (invariant-spanning checks that need more than one field,
/// e.g. age derived from a patient's date of birth) are modelled as plain
/// functions rather than data, since their logic is bespoke per rule; see
/// `crate::validator::apply_business_rules`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusinessRule {
    AgeInYears,
    BloodPressure,
    HeartRate,
}

impl BusinessRule {
    /// Resolve the business rule, if any, that fires for a concept code.
    pub fn for_concept(concept_code: &str) -> Option<Self> {
        match concept_code {
            "AGE_IN_YEARS" | "VITAL:AGE" => Some(Self::AgeInYears),
            "VITAL:BLOOD_PRESSURE" | "VITAL:BP" => Some(Self::BloodPressure),
            "VITAL:HEART_RATE" | "VITAL:HR" => Some(Self::HeartRate),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_forbid_future_dates_and_cap_blobs() {
        let rules = StandardRules::defaults();
        assert!(!rules.date_default.allow_future);
        assert_eq!(rules.blob_default.max_size, Some(25 * 1024 * 1024));
    }

    #[test]
    fn override_takes_precedence_over_default() {
        let mut rules = StandardRules::defaults();
        rules.numeric_overrides.insert(
            "VITAL:HR".to_string(),
            NumericRule {
                min: Some(20.0),
                max: Some(250.0),
                ..Default::default()
            },
        );
        let rule = rules.numeric_rule_for(Some("VITAL:HR"));
        assert_eq!(rule.min, Some(20.0));
        let default_rule = rules.numeric_rule_for(Some("OTHER"));
        assert_eq!(default_rule.min, None);
    }

    #[test]
    fn business_rule_lookup() {
        assert_eq!(
            BusinessRule::for_concept("VITAL:HEART_RATE"),
            Some(BusinessRule::HeartRate)
        );
        assert_eq!(BusinessRule::for_concept("UNKNOWN"), None);
    }

    #[test]
    fn config_validate_rejects_an_inverted_override_bound() {
        use ncd_foundation::Config;

        let mut rules = StandardRules::defaults();
        assert!(rules.validate().is_ok());

        rules.numeric_overrides.insert(
            "VITAL:HR".to_string(),
            NumericRule { min: Some(300.0), max: Some(20.0), ..Default::default() },
        );
        assert!(rules.validate().is_err());
    }

    #[test]
    fn config_round_trips_through_json() {
        let rules = StandardRules::defaults();
        let json = serde_json::to_string(&rules).unwrap();
        let restored: StandardRules = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.blob_default.max_size, rules.blob_default.max_size);
    }
}

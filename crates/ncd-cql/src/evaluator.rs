//! Pluggable CQL rule evaluation.
//!
//! The validator (`ncd-validate`) links a concept to zero or more stored CQL
//! rules and needs a yes/no/diagnostic answer for a candidate value. This
//! crate does not implement a CQL execution engine; instead it defines the
//! [`RuleEvaluator`] seam any evaluator plugs into, and ships
//! [`BasicRuleEvaluator`], which understands the narrow subset of CQL rule
//! bodies the domain actually authors: simple range checks
//! (`AgeInYears() >= 0 and AgeInYears() <= 120`) and enum/membership checks
//! (`Value in { 'low', 'normal', 'high' }`). Anything more expressive than
//! that is expected to come from an external evaluator registered at the
//! same seam.

use crate::error::{CqlError, Result};
use std::collections::HashSet;

/// A single value being checked against a stored CQL rule.
#[derive(Debug, Clone)]
pub enum RuleInput {
    /// A numeric observation value.
    Numeric(f64),
    /// A free-text or coded observation value.
    Text(String),
}

/// Outcome of evaluating one rule against one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleVerdict {
    /// Whether the value satisfies the rule.
    pub passed: bool,
    /// Human-readable explanation, present when `passed` is false.
    pub message: Option<String>,
}

impl RuleVerdict {
    /// Construct a passing verdict.
    pub fn pass() -> Self {
        Self {
            passed: true,
            message: None,
        }
    }

    /// Construct a failing verdict with an explanation.
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: Some(message.into()),
        }
    }
}

/// Evaluates a CQL rule body against a candidate value.
///
/// Implementors may be the minimal [`BasicRuleEvaluator`] below, or an
/// external collaborator wired in by the embedding application that runs the
/// rule through a full CQL engine. The validator only ever depends on this
/// trait, never on a concrete evaluator.
pub trait RuleEvaluator {
    /// Evaluate `rule_body` (the stored CQL expression text) against `value`.
    fn evaluate(&self, rule_body: &str, value: &RuleInput) -> Result<RuleVerdict>;
}

/// A minimal evaluator covering range and enum/membership rule bodies.
///
/// Recognised shapes (whitespace-insensitive):
/// - `>= N`, `<= N`, `> N`, `< N`, `= N` — single-bound numeric comparison.
/// - `N1..N2` — inclusive numeric range.
/// - `{ 'a', 'b', 'c' }` — membership against a quoted literal set.
///
/// Anything else is rejected with [`CqlError::Evaluation`] so the caller
/// knows to fall back to a full CQL evaluator rather than silently passing.
#[derive(Debug, Default)]
pub struct BasicRuleEvaluator;

impl BasicRuleEvaluator {
    /// Construct a new basic evaluator.
    pub fn new() -> Self {
        Self
    }

    fn evaluate_range(body: &str, value: f64) -> Option<RuleVerdict> {
        let body = body.trim();
        if let Some(rest) = body.strip_prefix(">=") {
            let bound: f64 = rest.trim().parse().ok()?;
            return Some(if value >= bound {
                RuleVerdict::pass()
            } else {
                RuleVerdict::fail(format!("{value} is below the minimum of {bound}"))
            });
        }
        if let Some(rest) = body.strip_prefix("<=") {
            let bound: f64 = rest.trim().parse().ok()?;
            return Some(if value <= bound {
                RuleVerdict::pass()
            } else {
                RuleVerdict::fail(format!("{value} is above the maximum of {bound}"))
            });
        }
        if let Some(rest) = body.strip_prefix('>') {
            let bound: f64 = rest.trim().parse().ok()?;
            return Some(if value > bound {
                RuleVerdict::pass()
            } else {
                RuleVerdict::fail(format!("{value} must be greater than {bound}"))
            });
        }
        if let Some(rest) = body.strip_prefix('<') {
            let bound: f64 = rest.trim().parse().ok()?;
            return Some(if value < bound {
                RuleVerdict::pass()
            } else {
                RuleVerdict::fail(format!("{value} must be less than {bound}"))
            });
        }
        if let Some((lo, hi)) = body.split_once("..") {
            let lo: f64 = lo.trim().parse().ok()?;
            let hi: f64 = hi.trim().parse().ok()?;
            return Some(if value >= lo && value <= hi {
                RuleVerdict::pass()
            } else {
                RuleVerdict::fail(format!("{value} is outside the range {lo}..{hi}"))
            });
        }
        None
    }

    fn evaluate_enum(body: &str, value: &str) -> Option<RuleVerdict> {
        let body = body.trim();
        let inner = body.strip_prefix('{')?.strip_suffix('}')?;
        let allowed: HashSet<String> = inner
            .split(',')
            .map(|s| s.trim().trim_matches('\'').trim_matches('"').to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Some(if allowed.contains(value) {
            RuleVerdict::pass()
        } else {
            RuleVerdict::fail(format!(
                "'{value}' is not one of the allowed values: {:?}",
                allowed
            ))
        })
    }
}

impl RuleEvaluator for BasicRuleEvaluator {
    fn evaluate(&self, rule_body: &str, value: &RuleInput) -> Result<RuleVerdict> {
        match value {
            RuleInput::Numeric(n) => Self::evaluate_range(rule_body, *n).ok_or_else(|| {
                CqlError::Evaluation(format!(
                    "rule body is not a recognised numeric range: {rule_body:?}"
                ))
            }),
            RuleInput::Text(s) => Self::evaluate_enum(rule_body, s).ok_or_else(|| {
                CqlError::Evaluation(format!(
                    "rule body is not a recognised enum/membership rule: {rule_body:?}"
                ))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_min_max_inclusive() {
        let eval = BasicRuleEvaluator::new();
        assert!(eval.evaluate("0..120", &RuleInput::Numeric(42.0)).unwrap().passed);
        assert!(!eval.evaluate("0..120", &RuleInput::Numeric(-1.0)).unwrap().passed);
        assert!(!eval.evaluate("0..120", &RuleInput::Numeric(121.0)).unwrap().passed);
    }

    #[test]
    fn single_bound_comparisons() {
        let eval = BasicRuleEvaluator::new();
        assert!(eval.evaluate(">= 18", &RuleInput::Numeric(18.0)).unwrap().passed);
        assert!(!eval.evaluate("> 18", &RuleInput::Numeric(18.0)).unwrap().passed);
        assert!(eval.evaluate("<= 200", &RuleInput::Numeric(200.0)).unwrap().passed);
    }

    #[test]
    fn enum_membership() {
        let eval = BasicRuleEvaluator::new();
        let body = "{ 'low', 'normal', 'high' }";
        assert!(eval
            .evaluate(body, &RuleInput::Text("normal".to_string()))
            .unwrap()
            .passed);
        assert!(!eval
            .evaluate(body, &RuleInput::Text("critical".to_string()))
            .unwrap()
            .passed);
    }

    #[test]
    fn unrecognised_body_is_evaluation_error() {
        let eval = BasicRuleEvaluator::new();
        let err = eval
            .evaluate("AgeInYears() >= 0 and exists [Condition]", &RuleInput::Numeric(1.0))
            .unwrap_err();
        assert!(matches!(err, CqlError::Evaluation(_)));
    }
}

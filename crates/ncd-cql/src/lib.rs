//! # ncd-cql
//!
//! Clinical Quality Language (CQL) rule storage and parsing for the
//! neurostore data engine.
//!
//! This crate parses CQL rule bodies into a JSON-serialisable AST (so a rule
//! can be stored pre-compiled alongside its source text) and exposes a
//! pluggable [`evaluator::RuleEvaluator`] trait that the validator calls into
//! for concept-linked rules. Full CQL-to-ELM translation and execution is out
//! of scope here; this crate stops at "store, parse, and invoke a pluggable
//! evaluator."

pub mod error;
pub mod evaluator;
pub mod parser;

pub use error::{CqlError, Result};

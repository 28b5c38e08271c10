//! CQL Parser Module
//!
//! Parses CQL (Clinical Quality Language) source into an Abstract Syntax Tree
//! using `nom` parser combinators.
//!
//! ## Architecture
//!
//! - [`lexer`]: Tokenization utilities (keywords, operators, whitespace, comments)
//! - [`span`]: Source location tracking for error reporting
//! - [`ast`]: CQL Abstract Syntax Tree types
//! - [`expression`]: Operator-precedence expression grammar
//! - [`statement`]: Library header and statement grammar
//!
//! ## CQL Grammar Reference
//!
//! Based on CQL version 1.5.3 specification, translated from the official
//! ANTLR4 grammar to nom parser combinators.

pub mod ast;
pub mod expression;
pub mod lexer;
pub mod span;
pub mod statement;

use crate::error::{CqlError, Result};
use nom::Finish;
use span::Span;

/// CQL Parser
///
/// Parses CQL source code into an Abstract Syntax Tree (AST).
///
/// # Example
///
/// ```ignore
/// use ncd_cql::parser::CqlParser;
///
/// let parser = CqlParser::new();
/// let library = parser.parse(r#"
///     library Example version '1.0.0'
///     define Foo: 42
/// "#)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct CqlParser;

impl CqlParser {
    /// Create a new CQL parser.
    pub fn new() -> Self {
        Self
    }

    /// Parse CQL source code into a Library AST.
    pub fn parse(&self, source: &str) -> Result<ast::Library> {
        let span = Span::new(source);
        let (remainder, library) = statement::parse_library(span)
            .finish()
            .map_err(|e| parse_error_from_nom(&e))?;
        if !remainder.fragment().trim().is_empty() {
            return Err(CqlError::ParseError {
                message: format!("unexpected trailing input: {:?}", remainder.fragment()),
                line: remainder.line(),
                column: remainder.column(),
            });
        }
        Ok(library)
    }

    /// Parse a single expression (useful for storing a bare rule body).
    pub fn parse_expression(&self, source: &str) -> Result<ast::Expression> {
        let span = Span::new(source);
        let (remainder, expr) = expression::expression(span)
            .finish()
            .map_err(|e| parse_error_from_nom(&e))?;
        if !remainder.fragment().trim().is_empty() {
            return Err(CqlError::ParseError {
                message: format!("unexpected trailing input: {:?}", remainder.fragment()),
                line: remainder.line(),
                column: remainder.column(),
            });
        }
        Ok(expr)
    }
}

fn parse_error_from_nom(err: &nom::error::Error<Span<'_>>) -> CqlError {
    CqlError::ParseError {
        message: format!("{:?}", err.code),
        line: err.input.line(),
        column: err.input.column(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_creation() {
        let _parser = CqlParser::new();
        let _parser = CqlParser::default();
    }

    #[test]
    fn test_parse_simple_expression() {
        let parser = CqlParser::new();
        let expr = parser.parse_expression("1 + 2").expect("should parse");
        let _ = expr;
    }

    #[test]
    fn test_parse_simple_library() {
        let parser = CqlParser::new();
        let source = "library Example version '1.0.0'\ndefine Foo: 42\n";
        let library = parser.parse(source).expect("should parse library");
        assert_eq!(library.identifier.map(|i| i.name), Some("Example".to_string()));
    }

    #[test]
    fn test_parse_error_reports_location() {
        let parser = CqlParser::new();
        let err = parser.parse_expression("(((").unwrap_err();
        match err {
            CqlError::ParseError { .. } => {}
            other => panic!("expected ParseError, got {other:?}"),
        }
    }
}

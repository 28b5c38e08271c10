//! CQL Rule storage row.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CqlRule {
    pub rule_id: Option<i64>,
    /// Unique natural key.
    pub code: String,
    pub name: String,
    /// The CQL source text, stored with line breaks encoded (`\n` escaped)
    /// so it round-trips through a single text column.
    pub body: String,
    /// Optional precompiled JSON AST (see `ncd_cql::parser`).
    pub precompiled_ast: Option<serde_json::Value>,
    pub description_blob: Option<serde_json::Value>,
}

impl CqlRule {
    pub fn new(code: impl Into<String>, name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            rule_id: None,
            code: code.into(),
            name: name.into(),
            body: body.into(),
            precompiled_ast: None,
            description_blob: None,
        }
    }

    /// Encode a multi-line rule body for single-column storage.
    pub fn encode_body(body: &str) -> String {
        body.replace('\n', "\\n")
    }

    /// Decode a stored rule body back into its multi-line form.
    pub fn decode_body(stored: &str) -> String {
        stored.replace("\\n", "\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_encoding_roundtrips() {
        let body = "define Foo:\n  AgeInYears() >= 0";
        let encoded = CqlRule::encode_body(body);
        assert!(!encoded.contains('\n'));
        assert_eq!(CqlRule::decode_body(&encoded), body);
    }
}

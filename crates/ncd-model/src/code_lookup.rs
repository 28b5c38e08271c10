//! Code Lookup: a table/column-scoped controlled vocabulary.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeLookup {
    pub table_cd: String,
    pub column_cd: String,
    pub code_cd: String,
    pub name_char: String,
    /// Optional JSON blob carrying icon/color/label hints consulted by the
    /// concept resolution cache before it falls back to its colour heuristic.
    pub lookup_blob: Option<serde_json::Value>,
}

impl CodeLookup {
    pub fn new(
        table_cd: impl Into<String>,
        column_cd: impl Into<String>,
        code_cd: impl Into<String>,
        name_char: impl Into<String>,
    ) -> Self {
        Self {
            table_cd: table_cd.into(),
            column_cd: column_cd.into(),
            code_cd: code_cd.into(),
            name_char: name_char.into(),
            lookup_blob: None,
        }
    }

    pub fn color_hint(&self) -> Option<&str> {
        self.lookup_blob.as_ref()?.get("color")?.as_str()
    }

    pub fn icon_hint(&self) -> Option<&str> {
        self.lookup_blob.as_ref()?.get("icon")?.as_str()
    }

    pub fn label_hint(&self) -> Option<&str> {
        self.lookup_blob.as_ref()?.get("label")?.as_str()
    }
}

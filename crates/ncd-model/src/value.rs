//! The observation value-type sum type (invariant 2) and its discriminant.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value-type discriminant stored as `VALTYPE_CD` on an Observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueType {
    /// Numeric measurement.
    Numeric,
    /// Free text.
    Text,
    /// ISO `YYYY-MM-DD` date.
    Date,
    /// Binary/blob payload (scanned form, uploaded file).
    Blob,
    /// A selected option from a controlled vocabulary.
    Selection,
    /// A clinical finding code.
    Finding,
    /// A free-form answer to a questionnaire item.
    Answer,
    /// An entire questionnaire response (JSON survey structure).
    Questionnaire,
}

impl ValueType {
    /// The single-character code used in bundle formats (`N`, `T`, `D`, `R`,
    /// `S`, `F`, `A`, `Q`).
    pub fn code(self) -> char {
        match self {
            ValueType::Numeric => 'N',
            ValueType::Text => 'T',
            ValueType::Date => 'D',
            ValueType::Blob => 'R',
            ValueType::Selection => 'S',
            ValueType::Finding => 'F',
            ValueType::Answer => 'A',
            ValueType::Questionnaire => 'Q',
        }
    }

    /// Parse a `VALTYPE_CD` character back into a [`ValueType`].
    pub fn from_code(code: char) -> Option<Self> {
        match code.to_ascii_uppercase() {
            'N' => Some(ValueType::Numeric),
            'T' => Some(ValueType::Text),
            'D' => Some(ValueType::Date),
            'R' => Some(ValueType::Blob),
            'S' => Some(ValueType::Selection),
            'F' => Some(ValueType::Finding),
            'A' => Some(ValueType::Answer),
            'Q' => Some(ValueType::Questionnaire),
            _ => None,
        }
    }
}

/// A blob-valued observation payload: a typed escape hatch over a free-form
/// JSON object, with the commonly-accessed keys surfaced as accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BlobValue {
    #[serde(flatten)]
    pub raw: BTreeMap<String, serde_json::Value>,
}

impl BlobValue {
    pub fn filename(&self) -> Option<&str> {
        self.raw.get("filename").and_then(|v| v.as_str())
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.raw.get("mime_type").and_then(|v| v.as_str())
    }

    pub fn size_bytes(&self) -> Option<u64> {
        self.raw.get("size_bytes").and_then(|v| v.as_u64())
    }
}

/// The value actually carried by an Observation, encoding invariant 2: for
/// `Numeric`, `numericValue` is set and `textValue` is null; for every other
/// type, `textValue` holds the canonical text encoding and `numericValue` is
/// null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "valtype_cd")]
pub enum ObservationValue {
    #[serde(rename = "N")]
    Numeric { nval_num: f64 },
    #[serde(rename = "T")]
    Text { tval_char: String },
    #[serde(rename = "D")]
    Date { tval_char: NaiveDate },
    #[serde(rename = "R")]
    Blob { tval_char: BlobValue },
    #[serde(rename = "S")]
    Selection { tval_char: String },
    #[serde(rename = "F")]
    Finding { tval_char: String },
    #[serde(rename = "A")]
    Answer { tval_char: String },
    #[serde(rename = "Q")]
    Questionnaire { tval_char: String },
}

impl ObservationValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            ObservationValue::Numeric { .. } => ValueType::Numeric,
            ObservationValue::Text { .. } => ValueType::Text,
            ObservationValue::Date { .. } => ValueType::Date,
            ObservationValue::Blob { .. } => ValueType::Blob,
            ObservationValue::Selection { .. } => ValueType::Selection,
            ObservationValue::Finding { .. } => ValueType::Finding,
            ObservationValue::Answer { .. } => ValueType::Answer,
            ObservationValue::Questionnaire { .. } => ValueType::Questionnaire,
        }
    }

    /// The numeric column value, present only for `Numeric`.
    pub fn numeric_value(&self) -> Option<f64> {
        match self {
            ObservationValue::Numeric { nval_num } => Some(*nval_num),
            _ => None,
        }
    }

    /// The canonical text-column encoding, present for every non-numeric type.
    pub fn text_value(&self) -> Option<String> {
        match self {
            ObservationValue::Numeric { .. } => None,
            ObservationValue::Text { tval_char }
            | ObservationValue::Selection { tval_char }
            | ObservationValue::Finding { tval_char }
            | ObservationValue::Answer { tval_char }
            | ObservationValue::Questionnaire { tval_char } => Some(tval_char.clone()),
            ObservationValue::Date { tval_char } => Some(tval_char.format("%Y-%m-%d").to_string()),
            ObservationValue::Blob { tval_char } => {
                serde_json::to_string(tval_char).ok()
            }
        }
    }
}

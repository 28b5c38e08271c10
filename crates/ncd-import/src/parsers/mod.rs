//! One parser per [`crate::sniff::DetectedFormat`], each producing a
//! canonical `ncd_model::ImportStructure` plus any non-fatal row/resource
//! errors collected along the way.

pub mod cda_parser;
pub mod csv_parser;
pub mod json_parser;

//! Source-system prefix normalisation (invariant 4): `LID: 2947-0` and
//! `LOINC:2947-0` must compare equal under a normalised match.

use std::collections::HashMap;

/// Maps a canonical source-system name to every alias prefix observed in
/// incoming concept codes.
#[derive(Debug, Clone)]
pub struct SourceSystemPrefix {
    aliases: HashMap<String, String>,
}

impl Default for SourceSystemPrefix {
    fn default() -> Self {
        let mut prefix = Self { aliases: HashMap::new() };
        prefix.register("LOINC", &["LOINC", "LID"]);
        prefix.register("SNOMED-CT", &["SNOMED-CT", "SCTID", "SNOMED"]);
        prefix
    }
}

impl SourceSystemPrefix {
    pub fn register(&mut self, canonical: &str, aliases: &[&str]) {
        for alias in aliases {
            self.aliases.insert(alias.to_uppercase(), canonical.to_string());
        }
    }

    /// Normalise `<PREFIX>: <raw>` / `<PREFIX>:<raw>` into `<CANONICAL>:<raw>`
    /// with whitespace around the raw code trimmed, so two spellings of the
    /// same code compare equal.
    pub fn normalize(&self, code: &str) -> String {
        let Some((prefix, raw)) = code.split_once(':') else {
            return code.trim().to_string();
        };
        let canonical = self
            .aliases
            .get(&prefix.trim().to_uppercase())
            .cloned()
            .unwrap_or_else(|| prefix.trim().to_uppercase());
        format!("{canonical}:{}", raw.trim())
    }

    pub fn matches(&self, a: &str, b: &str) -> bool {
        self.normalize(a) == self.normalize(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lid_and_loinc_prefixes_normalise_equal() {
        let prefix = SourceSystemPrefix::default();
        assert!(prefix.matches("LID: 2947-0", "LOINC:2947-0"));
    }

    #[test]
    fn unrecognised_prefix_passes_through_uppercased() {
        let prefix = SourceSystemPrefix::default();
        assert_eq!(prefix.normalize("local: abc"), "LOCAL:abc");
    }

    #[test]
    fn codes_without_a_prefix_are_compared_verbatim() {
        let prefix = SourceSystemPrefix::default();
        assert_eq!(prefix.normalize("  VITAL:AGE  ".trim()), "VITAL:AGE");
    }
}

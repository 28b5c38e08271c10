//! Concept Resolution Cache (C5): resolves concept codes to a display
//! label / value type / unit / colour+icon hint, batching and falling back
//! from the concept dimension to `CODE_LOOKUP`, then to the colour
//! heuristic, then to an unresolved placeholder, rather than erroring.

use crate::color::{color_for, HeuristicContext};
use crate::error::Result;
use crate::prefix::SourceSystemPrefix;
use ncd_model::value::ValueType;
use ncd_model::{CodeLookup, Concept};
use ncd_repo::{CodeLookupRepository, ConceptRepository, SqliteCodeLookupRepository, SqliteConceptRepository};
use ncd_storage::Storage;
use std::collections::HashMap;
use std::sync::RwLock;

/// Where a [`ResolvedConcept`] ultimately came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConceptSource {
    /// Matched a row in the concept dimension.
    Concept,
    /// No concept matched; matched a `CODE_LOOKUP` value-set row instead.
    Lookup,
    /// Matched neither; a synthetic, unresolved placeholder.
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConcept {
    pub concept_cd: String,
    pub display_label: String,
    pub value_type: ValueType,
    pub unit_cd: Option<String>,
    pub color_hint: Option<String>,
    pub icon_hint: Option<String>,
    /// Whether `code` matched anything at all. `false` only for
    /// [`ConceptSource::Fallback`] records.
    pub resolved: bool,
    pub source: ConceptSource,
}

/// Infer the colour heuristic context implied by a `CODE_LOOKUP` value set's
/// `table_cd`, so the heuristic table in [`crate::color`] fires on the
/// fallback path without every caller naming a context explicitly.
fn context_for_table(table_cd: &str) -> Option<HeuristicContext> {
    match table_cd.to_uppercase().as_str() {
        "VISIT_STATUS_CD" | "VISIT_STATUS" => Some(HeuristicContext::VisitStatus),
        "SEX_CD" | "GENDER_CD" => Some(HeuristicContext::Gender),
        "VITAL_STATUS_CD" | "VITAL_STATUS" => Some(HeuristicContext::VitalStatus),
        "SEVERITY_CD" | "SEVERITY" => Some(HeuristicContext::Severity),
        _ => None,
    }
}

impl ResolvedConcept {
    fn from_concept(concept: &Concept, context: Option<HeuristicContext>) -> Self {
        let (color_hint, icon_hint) = concept
            .concept_blob
            .as_ref()
            .map(|blob| {
                (
                    blob.get("color").and_then(|v| v.as_str()).map(str::to_string),
                    blob.get("icon").and_then(|v| v.as_str()).map(str::to_string),
                )
            })
            .unwrap_or((None, None));
        let color_hint = color_hint.or_else(|| {
            context.and_then(|ctx| color_for(ctx, &concept.name_char)).map(str::to_string)
        });
        Self {
            concept_cd: concept.concept_cd.clone(),
            display_label: concept.name_char.clone(),
            value_type: concept.value_type,
            unit_cd: concept.unit_cd.clone(),
            color_hint,
            icon_hint,
            resolved: true,
            source: ConceptSource::Concept,
        }
    }

    fn from_lookup(code: &str, lookup: &CodeLookup) -> Self {
        let context = context_for_table(&lookup.table_cd);
        let color_hint = lookup
            .color_hint()
            .map(str::to_string)
            .or_else(|| context.and_then(|ctx| color_for(ctx, &lookup.name_char)).map(str::to_string));
        Self {
            concept_cd: code.to_string(),
            display_label: lookup.label_hint().unwrap_or(lookup.name_char.as_str()).to_string(),
            value_type: ValueType::Text,
            unit_cd: None,
            color_hint,
            icon_hint: lookup.icon_hint().map(str::to_string),
            resolved: true,
            source: ConceptSource::Lookup,
        }
    }

    fn fallback(code: &str) -> Self {
        Self {
            concept_cd: code.to_string(),
            display_label: code.to_string(),
            value_type: ValueType::Text,
            unit_cd: None,
            color_hint: None,
            icon_hint: None,
            resolved: false,
            source: ConceptSource::Fallback,
        }
    }
}

/// Owns the resolved-concept cache map. Does not own the concept rows
/// themselves (those live in the Repository Layer).
pub struct ConceptCache {
    cache: RwLock<HashMap<String, ResolvedConcept>>,
    prefix: SourceSystemPrefix,
}

impl Default for ConceptCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ConceptCache {
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            prefix: SourceSystemPrefix::default(),
        }
    }

    /// Resolve a single concept code: cache, then the concept dimension,
    /// then a `CODE_LOOKUP` value set keyed by the bare code, then an
    /// unresolved fallback record. Never errors on a miss (spec.md §4.5).
    pub fn resolve(&self, storage: &Storage, code: &str) -> Result<ResolvedConcept> {
        let normalized = self.prefix.normalize(code);
        if let Some(hit) = self.cache.read().unwrap().get(&normalized) {
            return Ok(hit.clone());
        }

        let concept_repo = SqliteConceptRepository::new(storage);
        let found = concept_repo
            .find_all_concepts()?
            .into_iter()
            .find(|c| self.prefix.normalize(&c.concept_cd) == normalized);

        let resolved = match found {
            Some(concept) => ResolvedConcept::from_concept(&concept, None),
            None => {
                let lookup_repo = SqliteCodeLookupRepository::new(storage);
                match lookup_repo.find_by_code(code)?.into_iter().next() {
                    Some(lookup) => ResolvedConcept::from_lookup(code, &lookup),
                    None => ResolvedConcept::fallback(code),
                }
            }
        };

        self.cache.write().unwrap().insert(normalized, resolved.clone());
        Ok(resolved)
    }

    /// Resolve many codes in at most two round trips to storage: one bulk
    /// fetch of every concept, then (only for whatever still missed) one
    /// bulk `CODE_LOOKUP` fetch. Every code resolves to something, possibly
    /// an unresolved fallback record; this never errors.
    pub fn resolve_batch(&self, storage: &Storage, codes: &[String]) -> Result<HashMap<String, ResolvedConcept>> {
        let mut resolved = HashMap::new();
        let mut misses = Vec::new();

        {
            let cache = self.cache.read().unwrap();
            for code in codes {
                let normalized = self.prefix.normalize(code);
                match cache.get(&normalized) {
                    Some(hit) => {
                        resolved.insert(code.clone(), hit.clone());
                    }
                    None => misses.push((code.clone(), normalized)),
                }
            }
        }

        if misses.is_empty() {
            return Ok(resolved);
        }

        let concept_repo = SqliteConceptRepository::new(storage);
        let all_concepts = concept_repo.find_all_concepts()?;
        let mut still_missing = Vec::new();
        {
            let mut write_guard = self.cache.write().unwrap();
            for (original, normalized) in misses {
                match all_concepts.iter().find(|c| self.prefix.normalize(&c.concept_cd) == normalized) {
                    Some(concept) => {
                        let entry = ResolvedConcept::from_concept(concept, None);
                        write_guard.insert(normalized, entry.clone());
                        resolved.insert(original, entry);
                    }
                    None => still_missing.push(original),
                }
            }
        }

        if !still_missing.is_empty() {
            let lookup_repo = SqliteCodeLookupRepository::new(storage);
            let lookups = lookup_repo.find_by_codes(&still_missing)?;
            let mut write_guard = self.cache.write().unwrap();
            for code in still_missing {
                let normalized = self.prefix.normalize(&code);
                let entry = match lookups.iter().find(|l| l.code_cd == code) {
                    Some(lookup) => ResolvedConcept::from_lookup(&code, lookup),
                    None => ResolvedConcept::fallback(&code),
                };
                write_guard.insert(normalized, entry.clone());
                resolved.insert(code, entry);
            }
        }

        Ok(resolved)
    }

    /// Reverse lookup: the concept code whose display label matches `label`
    /// exactly (case-insensitive), or `None`.
    pub fn code_from_label(&self, storage: &Storage, label: &str) -> Result<Option<String>> {
        let repo = SqliteConceptRepository::new(storage);
        let label_lower = label.to_lowercase();
        Ok(repo
            .find_all_concepts()?
            .into_iter()
            .find(|c| c.name_char.to_lowercase() == label_lower)
            .map(|c| c.concept_cd))
    }

    pub fn search_concepts(&self, storage: &Storage, term: &str, limit: Option<u32>) -> Result<Vec<ResolvedConcept>> {
        let repo = SqliteConceptRepository::new(storage);
        let options = ncd_repo::SearchConceptsOptions { limit, context: None };
        Ok(repo
            .search_concepts(term, &options)?
            .iter()
            .map(|c| ResolvedConcept::from_concept(c, None))
            .collect())
    }

    /// Drop every cached entry, e.g. after an admin edits a concept.
    pub fn invalidate(&self) {
        self.cache.write().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ncd_migrate::{standard_migrations, MigrationRuntime};

    fn setup() -> Storage {
        let mut storage = Storage::connect_in_memory().unwrap();
        let mut runtime = MigrationRuntime::new();
        for m in standard_migrations() {
            runtime = runtime.register(m);
        }
        runtime.apply_all(&mut storage).unwrap();
        storage
            .execute_command(
                "INSERT INTO concepts (concept_cd, concept_path, name_char, valtype_cd) \
                 VALUES ('LOINC:2947-0', '\\Labs\\Sodium', 'Sodium', 'N')",
                [],
            )
            .unwrap();
        storage
    }

    #[test]
    fn resolves_via_normalised_prefix_alias() {
        let storage = setup();
        let cache = ConceptCache::new();
        let resolved = cache.resolve(&storage, "LID: 2947-0").unwrap();
        assert_eq!(resolved.display_label, "Sodium");
        assert!(resolved.resolved);
        assert_eq!(resolved.source, ConceptSource::Concept);
    }

    #[test]
    fn resolve_batch_caches_after_first_bulk_fetch() {
        let storage = setup();
        let cache = ConceptCache::new();
        let codes = vec!["LOINC:2947-0".to_string(), "LID:2947-0".to_string()];
        let resolved = cache.resolve_batch(&storage, &codes).unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved["LOINC:2947-0"].display_label, "Sodium");
        assert_eq!(resolved["LID:2947-0"].display_label, "Sodium");
    }

    #[test]
    fn unresolvable_code_falls_back_to_an_unresolved_record() {
        let storage = setup();
        let cache = ConceptCache::new();
        let resolved = cache.resolve(&storage, "NOPE:1").unwrap();
        assert!(!resolved.resolved);
        assert_eq!(resolved.source, ConceptSource::Fallback);
        assert_eq!(resolved.display_label, "NOPE:1");
    }

    #[test]
    fn falls_through_to_code_lookup_before_giving_up() {
        let storage = setup();
        storage
            .execute_command(
                "INSERT INTO code_lookup (table_cd, column_cd, code_cd, name_char, lookup_blob) \
                 VALUES ('SEX_CD', 'sex_cd', 'M', 'Male', '{\"color\":\"blue\"}')",
                [],
            )
            .unwrap();
        let cache = ConceptCache::new();
        let resolved = cache.resolve(&storage, "M").unwrap();
        assert!(resolved.resolved);
        assert_eq!(resolved.source, ConceptSource::Lookup);
        assert_eq!(resolved.display_label, "Male");
        assert_eq!(resolved.color_hint.as_deref(), Some("blue"));
    }

    #[test]
    fn resolve_batch_falls_through_to_code_lookup_for_remaining_misses() {
        let storage = setup();
        storage
            .execute_command(
                "INSERT INTO code_lookup (table_cd, column_cd, code_cd, name_char, lookup_blob) \
                 VALUES ('SEX_CD', 'sex_cd', 'F', 'Female', NULL)",
                [],
            )
            .unwrap();
        let cache = ConceptCache::new();
        let codes = vec!["LOINC:2947-0".to_string(), "F".to_string(), "GHOST".to_string()];
        let resolved = cache.resolve_batch(&storage, &codes).unwrap();
        assert_eq!(resolved["LOINC:2947-0"].source, ConceptSource::Concept);
        assert_eq!(resolved["F"].source, ConceptSource::Lookup);
        assert_eq!(resolved["GHOST"].source, ConceptSource::Fallback);
        assert!(!resolved["GHOST"].resolved);
    }
}

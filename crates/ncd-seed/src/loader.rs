//! Seed Loader (C3): loads reference data bundled as TSV files at compile
//! time. Idempotent by natural key — each loader checks for an existing row
//! before inserting.

use crate::error::{Result, SeedError};
use crate::report::SeedReport;
use ncd_model::concept::ConceptPath;
use ncd_model::value::ValueType;
use ncd_model::{CodeLookup, Concept, CqlRule, User};
use ncd_repo::{
    CodeLookupRepository, ConceptRepository, CqlRepository, Repository, SqliteCodeLookupRepository,
    SqliteConceptRepository, SqliteCqlRepository, SqliteUserRepository, UserRepository,
};
use ncd_storage::Storage;

/// Best-effort precompile: a rule body that doesn't parse as a bare
/// expression (e.g. it's written against a future statement grammar) is
/// still stored, just without a `precompiled_ast`. The evaluator falls back
/// to its own parsing at evaluation time either way.
fn precompile(body: &str) -> Option<serde_json::Value> {
    ncd_cql::parser::CqlParser::new()
        .parse_expression(body)
        .ok()
        .and_then(|expr| serde_json::to_value(&expr).ok())
}

const CONCEPTS_TSV: &str = include_str!("../data/concepts.tsv");
const CODE_LOOKUP_TSV: &str = include_str!("../data/code_lookup.tsv");
const CQL_RULES_TSV: &str = include_str!("../data/cql_rules.tsv");
const CONCEPT_CQL_LINK_TSV: &str = include_str!("../data/concept_cql_link.tsv");
const USERS_TSV: &str = include_str!("../data/users.tsv");

fn rows(file: &'static str, content: &str) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(content.as_bytes());
    let mut out = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| SeedError::Malformed { file, message: e.to_string() })?;
        out.push(record.iter().map(|s| s.to_string()).collect());
    }
    Ok(out)
}

fn field(row: &[String], index: usize) -> Option<String> {
    row.get(index).map(|s| s.trim()).filter(|s| !s.is_empty()).map(str::to_string)
}

pub fn load_concepts(storage: &Storage) -> Result<SeedReport> {
    let mut report = SeedReport::new("concepts.tsv");
    let repo = SqliteConceptRepository::new(storage);
    for row in rows("concepts.tsv", CONCEPTS_TSV)? {
        let concept_cd = field(&row, 0).ok_or_else(|| SeedError::Malformed { file: "concepts.tsv", message: "missing concept_cd".to_string() })?;
        if repo.find_by_concept_code(&concept_cd)?.is_some() {
            report.skipped += 1;
            continue;
        }
        let path_str = field(&row, 1).unwrap_or_else(|| "\\Uncategorized".to_string());
        let concept_path = ConceptPath::parse(path_str)
            .map_err(|e| SeedError::Malformed { file: "concepts.tsv", message: e.to_string() })?;
        let valtype_cd = field(&row, 4).unwrap_or_else(|| "T".to_string());
        let value_type = ValueType::from_code(valtype_cd.chars().next().unwrap_or('T')).unwrap_or(ValueType::Text);

        let concept = Concept {
            concept_cd,
            concept_path,
            name_char: field(&row, 2).unwrap_or_default(),
            category_cd: field(&row, 3),
            value_type,
            unit_cd: field(&row, 5),
            source_system_cd: "USER".to_string(),
            related_concept_cd: field(&row, 6),
            concept_blob: None,
        };
        repo.create(&concept)?;
        report.inserted += 1;
    }
    Ok(report)
}

pub fn load_code_lookup(storage: &Storage) -> Result<SeedReport> {
    let mut report = SeedReport::new("code_lookup.tsv");
    let repo = SqliteCodeLookupRepository::new(storage);
    for row in rows("code_lookup.tsv", CODE_LOOKUP_TSV)? {
        let table_cd = field(&row, 0).ok_or_else(|| SeedError::Malformed { file: "code_lookup.tsv", message: "missing table_cd".to_string() })?;
        let column_cd = field(&row, 1).unwrap_or_default();
        let code_cd = field(&row, 2).unwrap_or_default();
        if !repo.find_by_table_column(&table_cd, &column_cd)?.iter().all(|existing| existing.code_cd != code_cd) {
            report.skipped += 1;
            continue;
        }
        let mut entry = CodeLookup::new(table_cd, column_cd, code_cd, field(&row, 3).unwrap_or_default());
        let color = field(&row, 4);
        let icon = field(&row, 5);
        if color.is_some() || icon.is_some() {
            let mut blob = serde_json::Map::new();
            if let Some(color) = color {
                blob.insert("color".to_string(), serde_json::Value::String(color));
            }
            if let Some(icon) = icon {
                blob.insert("icon".to_string(), serde_json::Value::String(icon));
            }
            entry.lookup_blob = Some(serde_json::Value::Object(blob));
        }
        repo.upsert(&entry)?;
        report.inserted += 1;
    }
    Ok(report)
}

pub fn load_cql_rules(storage: &Storage) -> Result<SeedReport> {
    let mut report = SeedReport::new("cql_rules.tsv");
    let repo = SqliteCqlRepository::new(storage);
    for row in rows("cql_rules.tsv", CQL_RULES_TSV)? {
        let code = field(&row, 0).ok_or_else(|| SeedError::Malformed { file: "cql_rules.tsv", message: "missing code".to_string() })?;
        if repo.find_by_code(&code)?.is_some() {
            report.skipped += 1;
            continue;
        }
        let name = field(&row, 1).unwrap_or_default();
        let body = field(&row, 2).unwrap_or_default();
        let mut rule = CqlRule::new(code, name, CqlRule::encode_body(&body));
        rule.precompiled_ast = precompile(&body);
        repo.create(&rule)?;
        report.inserted += 1;
    }
    Ok(report)
}

pub fn load_concept_cql_links(storage: &Storage) -> Result<SeedReport> {
    let mut report = SeedReport::new("concept_cql_link.tsv");
    let concepts = SqliteConceptRepository::new(storage);
    let rules = SqliteCqlRepository::new(storage);
    for row in rows("concept_cql_link.tsv", CONCEPT_CQL_LINK_TSV)? {
        let concept_cd = field(&row, 0).ok_or_else(|| SeedError::Malformed { file: "concept_cql_link.tsv", message: "missing concept_cd".to_string() })?;
        let rule_code = field(&row, 1).ok_or_else(|| SeedError::Malformed { file: "concept_cql_link.tsv", message: "missing rule_code".to_string() })?;

        if concepts.find_by_concept_code(&concept_cd)?.is_none() {
            report.skipped += 1;
            continue;
        }
        let Some(rule) = rules.find_by_code(&rule_code)? else {
            report.skipped += 1;
            continue;
        };
        let already_linked = rules
            .find_by_concept_code(&concept_cd)?
            .iter()
            .any(|r| r.code == rule_code);
        if already_linked {
            report.skipped += 1;
            continue;
        }
        rules.link_to_concept(&concept_cd, rule.rule_id.expect("persisted rule has an id"))?;
        report.inserted += 1;
    }
    Ok(report)
}

pub fn load_users(storage: &Storage) -> Result<SeedReport> {
    let mut report = SeedReport::new("users.tsv");
    let repo = SqliteUserRepository::new(storage);
    for row in rows("users.tsv", USERS_TSV)? {
        let user_cd = field(&row, 0).ok_or_else(|| SeedError::Malformed { file: "users.tsv", message: "missing user_cd".to_string() })?;
        if repo.find_by_user_code(&user_cd)?.is_some() {
            report.skipped += 1;
            continue;
        }
        let mut user = User::new(user_cd, field(&row, 1).unwrap_or_default(), field(&row, 2).unwrap_or_default());
        user.role_cd = field(&row, 3);
        repo.create_user(&user)?;
        report.inserted += 1;
    }
    Ok(report)
}

/// Run every seed file's loader in a fixed order: concepts and code lookups
/// first (everything else references them), then CQL rules, then the
/// concept-to-rule links, then standard users.
pub fn load_all(storage: &Storage) -> Result<Vec<SeedReport>> {
    Ok(vec![
        load_concepts(storage)?,
        load_code_lookup(storage)?,
        load_cql_rules(storage)?,
        load_concept_cql_links(storage)?,
        load_users(storage)?,
    ])
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
    }

    #[test]
    fn load_all_is_idempotent() {
        let storage = setup();
        let first = load_all(&storage).unwrap();
        let second = load_all(&storage).unwrap();

        for report in &first {
            assert!(report.inserted > 0, "{} inserted nothing", report.file);
        }
        for report in &second {
            assert_eq!(report.inserted, 0, "{} re-inserted rows on second run", report.file);
        }
    }

    #[test]
    fn precompile_populates_ast_for_a_parseable_expression() {
        assert!(precompile("1 + 2").is_some());
    }

    #[test]
    fn precompile_is_none_for_an_unparseable_body_rather_than_erroring() {
        assert!(precompile("(((").is_none());
    }

    #[test]
    fn concept_cql_links_are_queryable() {
        let storage = setup();
        load_all(&storage).unwrap();
        let rules = SqliteCqlRepository::new(&storage);
        let linked = rules.find_by_concept_code("VITAL:AGE").unwrap();
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].code, "RULE_AGE_RANGE");
    }
}

//! The standard migration set for the neurostore schema: dimension/fact
//! star plus lookup and CQL side tables, and the cascade-delete triggers
//! as their own trailing migration (spec.md §4.2).

use crate::migration::Migration;

pub fn standard_migrations() -> Vec<Migration> {
    vec![
        Migration::sql(
            "0001_patients",
            "patient dimension",
            "CREATE TABLE patients (
                patient_num INTEGER PRIMARY KEY AUTOINCREMENT,
                patient_cd TEXT NOT NULL UNIQUE,
                sex_cd TEXT,
                age_in_years INTEGER,
                birth_date TEXT,
                death_date TEXT,
                language_cd TEXT,
                race_cd TEXT,
                marital_status_cd TEXT,
                religion_cd TEXT,
                patient_blob TEXT,
                import_date TEXT NOT NULL,
                update_date TEXT NOT NULL,
                upload_id INTEGER,
                sourcesystem_cd TEXT NOT NULL DEFAULT 'USER'
            )",
        ),
        Migration::sql(
            "0002_visits",
            "visit/encounter dimension",
            "CREATE TABLE visits (
                encounter_num INTEGER PRIMARY KEY AUTOINCREMENT,
                patient_num INTEGER NOT NULL REFERENCES patients(patient_num),
                start_date TEXT NOT NULL,
                end_date TEXT,
                active_status_cd TEXT,
                visit_kind TEXT,
                location_cd TEXT,
                visit_blob TEXT,
                import_date TEXT NOT NULL,
                update_date TEXT NOT NULL,
                upload_id INTEGER,
                sourcesystem_cd TEXT NOT NULL DEFAULT 'USER',
                CHECK (end_date IS NULL OR end_date >= start_date)
            )",
        ),
        Migration::sql(
            "0003_concepts",
            "concept dimension",
            "CREATE TABLE concepts (
                concept_cd TEXT PRIMARY KEY,
                concept_path TEXT NOT NULL,
                name_char TEXT NOT NULL,
                category_cd TEXT,
                valtype_cd TEXT NOT NULL,
                unit_cd TEXT,
                sourcesystem_cd TEXT NOT NULL DEFAULT 'USER',
                related_concept_cd TEXT,
                concept_blob TEXT
            )",
        ),
        Migration::sql(
            "0004_observations",
            "observation fact table",
            "CREATE TABLE observations (
                observation_num INTEGER PRIMARY KEY AUTOINCREMENT,
                patient_num INTEGER NOT NULL REFERENCES patients(patient_num),
                encounter_num INTEGER NOT NULL REFERENCES visits(encounter_num),
                concept_cd TEXT NOT NULL REFERENCES concepts(concept_cd),
                valtype_cd TEXT NOT NULL,
                nval_num REAL,
                tval_char TEXT,
                unit_cd TEXT,
                category_cd TEXT,
                provider_id TEXT,
                location_cd TEXT,
                start_date TEXT NOT NULL,
                end_date TEXT,
                instance_num INTEGER NOT NULL DEFAULT 1,
                observation_blob TEXT,
                import_date TEXT NOT NULL,
                update_date TEXT NOT NULL,
                upload_id INTEGER,
                sourcesystem_cd TEXT NOT NULL DEFAULT 'USER'
            )",
        ),
        Migration::sql(
            "0005_notes",
            "clinical notes",
            "CREATE TABLE notes (
                note_num INTEGER PRIMARY KEY AUTOINCREMENT,
                patient_num INTEGER NOT NULL REFERENCES patients(patient_num),
                encounter_num INTEGER REFERENCES visits(encounter_num),
                category_cd TEXT,
                note_body TEXT NOT NULL,
                note_blob TEXT,
                import_date TEXT NOT NULL,
                update_date TEXT NOT NULL,
                upload_id INTEGER,
                sourcesystem_cd TEXT NOT NULL DEFAULT 'USER'
            )",
        ),
        Migration::sql(
            "0006_code_lookup",
            "code lookup value sets",
            "CREATE TABLE code_lookup (
                table_cd TEXT NOT NULL,
                column_cd TEXT NOT NULL,
                code_cd TEXT NOT NULL,
                name_char TEXT NOT NULL,
                lookup_blob TEXT,
                PRIMARY KEY (table_cd, column_cd, code_cd)
            )",
        ),
        Migration::sql(
            "0007_cql_rules",
            "CQL rule storage",
            "CREATE TABLE cql_rules (
                rule_id INTEGER PRIMARY KEY AUTOINCREMENT,
                code TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                body TEXT NOT NULL,
                precompiled_ast TEXT,
                description_blob TEXT
            )",
        ),
        Migration::sql(
            "0008_concept_cql_link",
            "concept-to-CQL-rule linkage",
            "CREATE TABLE concept_cql_link (
                concept_cd TEXT NOT NULL REFERENCES concepts(concept_cd),
                rule_id INTEGER NOT NULL REFERENCES cql_rules(rule_id),
                PRIMARY KEY (concept_cd, rule_id)
            )",
        ),
        Migration::sql(
            "0009_users",
            "user accounts",
            "CREATE TABLE users (
                user_num INTEGER PRIMARY KEY AUTOINCREMENT,
                user_cd TEXT NOT NULL UNIQUE,
                display_name TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                role_cd TEXT,
                user_blob TEXT,
                import_date TEXT NOT NULL,
                update_date TEXT NOT NULL,
                upload_id INTEGER,
                sourcesystem_cd TEXT NOT NULL DEFAULT 'USER'
            )",
        ),
        Migration::sql(
            "0010_patient_observations_view",
            "read-time join producing CONCEPT_NAME_CHAR and TVAL_RESOLVED",
            "CREATE VIEW patient_observations AS
             SELECT
                o.observation_num,
                o.patient_num,
                o.encounter_num,
                o.concept_cd,
                c.name_char AS concept_name_char,
                COALESCE(o.tval_char, CAST(o.nval_num AS TEXT)) AS tval_resolved,
                o.start_date
             FROM observations o
             LEFT JOIN concepts c ON c.concept_cd = o.concept_cd",
        ),
        Migration::sql(
            "0011_cascade_triggers",
            "cascade child rows when a parent is removed",
            "CREATE TRIGGER cascade_delete_patient
             AFTER DELETE ON patients
             FOR EACH ROW BEGIN
                DELETE FROM observations WHERE patient_num = OLD.patient_num;
                DELETE FROM notes WHERE patient_num = OLD.patient_num;
                DELETE FROM visits WHERE patient_num = OLD.patient_num;
             END;

             CREATE TRIGGER cascade_delete_visit
             AFTER DELETE ON visits
             FOR EACH ROW BEGIN
                DELETE FROM observations WHERE encounter_num = OLD.encounter_num;
                UPDATE notes SET encounter_num = NULL WHERE encounter_num = OLD.encounter_num;
             END;",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MigrationRuntime;
    use ncd_storage::Storage;

    #[test]
    fn standard_migrations_apply_cleanly() {
        let mut storage = Storage::connect_in_memory().unwrap();
        let mut runtime = MigrationRuntime::new();
        for migration in standard_migrations() {
            runtime = runtime.register(migration);
        }
        runtime.apply_all(&mut storage).unwrap();

        let status = runtime.migration_status(&storage).unwrap();
        assert_eq!(status.pending, 0);
        assert!(runtime.validate(&storage).unwrap().is_empty());
    }

    #[test]
    fn cascade_delete_removes_children() {
        let mut storage = Storage::connect_in_memory().unwrap();
        let mut runtime = MigrationRuntime::new();
        for migration in standard_migrations() {
            runtime = runtime.register(migration);
        }
        runtime.apply_all(&mut storage).unwrap();

        storage
            .execute_command(
                "INSERT INTO patients (patient_cd, import_date, update_date) \
                 VALUES ('P1', datetime('now'), datetime('now'))",
                [],
            )
            .unwrap();
        storage
            .execute_command(
                "INSERT INTO visits (patient_num, start_date, visit_kind, import_date, update_date) \
                 VALUES (1, '2024-01-01', 'Outpatient', datetime('now'), datetime('now'))",
                [],
            )
            .unwrap();
        storage
            .execute_command(
                "INSERT INTO concepts (concept_cd, concept_path, name_char, valtype_cd) \
                 VALUES ('VITAL:HR', '\\Vitals\\HeartRate', 'Heart Rate', 'N')",
                [],
            )
            .unwrap();
        storage
            .execute_command(
                "INSERT INTO observations \
                 (patient_num, encounter_num, concept_cd, valtype_cd, nval_num, start_date, import_date, update_date) \
                 VALUES (1, 1, 'VITAL:HR', 'N', 72.0, '2024-01-01', datetime('now'), datetime('now'))",
                [],
            )
            .unwrap();

        storage.execute_command("DELETE FROM patients WHERE patient_num = 1", []).unwrap();

        let obs_count: i64 = storage
            .execute_query("SELECT COUNT(*) FROM observations", [], |row| row.get(0))
            .unwrap()[0];
        let visit_count: i64 = storage
            .execute_query("SELECT COUNT(*) FROM visits", [], |row| row.get(0))
            .unwrap()[0];
        assert_eq!(obs_count, 0);
        assert_eq!(visit_count, 0);
    }
}

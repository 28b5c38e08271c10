//! Deleting demo data relies on the `cascade_delete_patient` trigger
//! (`ncd-migrate`'s `0011_cascade_triggers`) to remove the patient's visits
//! and observations; no child table is touched directly here.

use crate::error::Result;
use crate::generator::PATIENT_PREFIX;
use ncd_repo::{FindOptions, Repository, SqlitePatientRepository};
use ncd_storage::Storage;

/// Delete every patient whose `patient_cd` was generated by [`crate::generate`],
/// returning the number of patients removed.
pub fn delete_demo_patients(storage: &Storage) -> Result<usize> {
    let repo = SqlitePatientRepository::new(storage);
    let demo_patients = repo
        .find_all(&FindOptions::default())?
        .into_iter()
        .filter(|p| p.patient_cd.starts_with(PATIENT_PREFIX));

    let mut removed = 0;
    for patient in demo_patients {
        let patient_num = patient.patient_num.expect("persisted patient has an id");
        if repo.delete(patient_num)? {
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate;
    use crate::repos::Repos;
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
    fn delete_removes_only_generated_patients_and_their_children() {
        let storage = setup();
        let repos = Repos::new(&storage);
        generate(&repos, 2).unwrap();

        let other_repo = SqlitePatientRepository::new(&storage);
        other_repo.create(&ncd_model::Patient::new("REAL_PATIENT_01")).unwrap();

        let removed = delete_demo_patients(&storage).unwrap();
        assert_eq!(removed, 2);

        let remaining = other_repo.find_all(&FindOptions::default()).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].patient_cd, "REAL_PATIENT_01");

        let obs_count: i64 = storage.execute_query("SELECT COUNT(*) FROM observations", [], |row| row.get(0)).unwrap()[0];
        assert_eq!(obs_count, 0);
    }
}

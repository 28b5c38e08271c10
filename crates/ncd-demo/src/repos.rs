//! Bundles the three repositories the generator writes through, so callers
//! (and tests) construct it once per `Storage` borrow.

use ncd_repo::{SqliteObservationRepository, SqlitePatientRepository, SqliteVisitRepository};
use ncd_storage::Storage;

pub struct Repos<'a> {
    pub patients: SqlitePatientRepository<'a>,
    pub visits: SqliteVisitRepository<'a>,
    pub observations: SqliteObservationRepository<'a>,
}

impl<'a> Repos<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self {
            patients: SqlitePatientRepository::new(storage),
            visits: SqliteVisitRepository::new(storage),
            observations: SqliteObservationRepository::new(storage),
        }
    }
}

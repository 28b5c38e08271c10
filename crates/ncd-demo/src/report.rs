use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DemoReport {
    pub patients_created: usize,
    pub visits_created: usize,
    pub observations_created: usize,
    pub patient_codes: Vec<String>,
}

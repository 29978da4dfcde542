use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::patient::PatientSummary;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Physician {
    pub id: Uuid,
    pub name: String,
    /// Cached patient summaries keyed by patient id.
    #[serde(default)]
    pub patients: BTreeMap<Uuid, PatientSummary>,
}

impl Physician {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            patients: BTreeMap::new(),
        }
    }

    /// Add a patient summary unless one with the same id is present.
    /// Returns true if the list changed.
    pub fn link_patient(&mut self, summary: PatientSummary) -> bool {
        if self.patients.contains_key(&summary.id) {
            return false;
        }
        self.patients.insert(summary.id, summary);
        true
    }

    pub fn has_patient(&self, patient_id: &Uuid) -> bool {
        self.patients.contains_key(patient_id)
    }
}

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{EatingStatus, PainSeverity};

/// One symptom report. Timestamps are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PainLog {
    pub id: Uuid,
    #[serde(default)]
    pub severity: PainSeverity,
    #[serde(default)]
    pub eating: EatingStatus,
    pub created: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medication {
    pub id: Uuid,
    pub name: String,
}

/// Adherence record: whether a dose was taken, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationLog {
    pub id: Uuid,
    pub medication_id: Uuid,
    pub medication_name: String,
    pub taken: bool,
    pub taken_at: i64,
    pub created: i64,
}

/// Free-text note posted by the patient, optionally with an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusLog {
    pub id: Uuid,
    pub note: String,
    pub image_location: Option<String>,
    pub created: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub birthdate: NaiveDate,
    #[serde(default)]
    pub physician_ids: BTreeSet<Uuid>,
    #[serde(default)]
    pub pain_logs: Vec<PainLog>,
    #[serde(default)]
    pub medications: Vec<Medication>,
    #[serde(default)]
    pub medication_logs: Vec<MedicationLog>,
    #[serde(default)]
    pub status_logs: Vec<StatusLog>,
}

impl Patient {
    pub fn new(name: impl Into<String>, birthdate: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            birthdate,
            physician_ids: BTreeSet::new(),
            pain_logs: Vec::new(),
            medications: Vec::new(),
            medication_logs: Vec::new(),
            status_logs: Vec::new(),
        }
    }

    /// Reduced clone carried in a physician's patient list. Never the full
    /// record, so the two aggregates cannot nest into each other.
    pub fn summary(&self) -> PatientSummary {
        PatientSummary {
            id: self.id,
            name: self.name.clone(),
            birthdate: self.birthdate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientSummary {
    pub id: Uuid,
    pub name: String,
    pub birthdate: NaiveDate,
}

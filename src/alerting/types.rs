use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::db::DatabaseError;

/// Who triggered an update. Only the admin identity may propagate a
/// patient into physicians' patient lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Caller {
    Admin,
    Client,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// Result of one write-path reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    pub severity_level: i32,
    pub alerts_created: usize,
    pub physicians_linked: usize,
}

#[derive(Error, Debug)]
pub enum AlertingError {
    #[error("Storage failure: {0}")]
    Storage(#[from] DatabaseError),

    #[error("Patient not found: {0}")]
    PatientNotFound(Uuid),

    #[error("Physician not found: {0}")]
    PhysicianNotFound(Uuid),
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Escalation record linking a patient's severity event to one physician.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub physician_id: Uuid,
    pub patient_name: String,
    pub severity_level: i32,
    pub created: i64,
    /// 0 until a later status log is found at read time.
    #[serde(default)]
    pub physician_contacted: i64,
}

impl Alert {
    pub fn is_contacted(&self) -> bool {
        self.physician_contacted != 0
    }
}

//! Repository layer: store traits and their SQLite adapter.
//!
//! The alert engine only sees the three store traits. `SqliteRepository`
//! borrows a connection and implements all of them on top of the
//! entity-scoped functions in the sub-modules.

mod alert;
mod patient;
mod physician;

use rusqlite::Connection;
use uuid::Uuid;

use super::DatabaseError;
use crate::models::{Alert, Patient, Physician};

pub use alert::*;
pub use patient::*;
pub use physician::*;

pub trait PatientStore {
    fn find_patient(&self, id: &Uuid) -> Result<Option<Patient>, DatabaseError>;
    fn save_patient(&self, patient: &Patient) -> Result<Patient, DatabaseError>;
    fn delete_patient(&self, patient: &Patient) -> Result<(), DatabaseError>;
    fn all_patients(&self) -> Result<Vec<Patient>, DatabaseError>;
}

pub trait PhysicianStore {
    fn find_physician(&self, id: &Uuid) -> Result<Option<Physician>, DatabaseError>;
    fn save_physician(&self, physician: &Physician) -> Result<Physician, DatabaseError>;
    fn all_physicians(&self) -> Result<Vec<Physician>, DatabaseError>;
}

pub trait AlertStore {
    fn all_alerts(&self) -> Result<Vec<Alert>, DatabaseError>;
    fn alerts_for_physician(&self, physician_id: &Uuid) -> Result<Vec<Alert>, DatabaseError>;
    fn alerts_for_patient(&self, patient_id: &Uuid) -> Result<Vec<Alert>, DatabaseError>;
    fn save_alert(&self, alert: &Alert) -> Result<(), DatabaseError>;
    fn delete_alert(&self, alert: &Alert) -> Result<(), DatabaseError>;

    /// Replace every alert of a patient with `alerts`.
    ///
    /// The default is delete-then-save and is not atomic: a failure part way
    /// leaves a partial set until the next successful update rewrites it.
    /// Stores with transactions should override this.
    fn replace_for_patient(&self, patient_id: &Uuid, alerts: &[Alert]) -> Result<(), DatabaseError> {
        for stale in self.alerts_for_patient(patient_id)? {
            self.delete_alert(&stale)?;
        }
        for alert in alerts {
            self.save_alert(alert)?;
        }
        Ok(())
    }
}

/// SQLite adapter for all three stores, borrowing one connection.
pub struct SqliteRepository<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl PatientStore for SqliteRepository<'_> {
    fn find_patient(&self, id: &Uuid) -> Result<Option<Patient>, DatabaseError> {
        get_patient(self.conn, id)
    }

    fn save_patient(&self, record: &Patient) -> Result<Patient, DatabaseError> {
        patient::save_patient(self.conn, record)?;
        Ok(record.clone())
    }

    fn delete_patient(&self, record: &Patient) -> Result<(), DatabaseError> {
        patient::delete_patient(self.conn, &record.id)
    }

    fn all_patients(&self) -> Result<Vec<Patient>, DatabaseError> {
        get_all_patients(self.conn)
    }
}

impl PhysicianStore for SqliteRepository<'_> {
    fn find_physician(&self, id: &Uuid) -> Result<Option<Physician>, DatabaseError> {
        get_physician(self.conn, id)
    }

    fn save_physician(&self, record: &Physician) -> Result<Physician, DatabaseError> {
        physician::save_physician(self.conn, record)?;
        Ok(record.clone())
    }

    fn all_physicians(&self) -> Result<Vec<Physician>, DatabaseError> {
        get_all_physicians(self.conn)
    }
}

impl AlertStore for SqliteRepository<'_> {
    fn all_alerts(&self) -> Result<Vec<Alert>, DatabaseError> {
        get_all_alerts(self.conn)
    }

    fn alerts_for_physician(&self, physician_id: &Uuid) -> Result<Vec<Alert>, DatabaseError> {
        get_alerts_by_physician(self.conn, physician_id)
    }

    fn alerts_for_patient(&self, patient_id: &Uuid) -> Result<Vec<Alert>, DatabaseError> {
        get_alerts_by_patient(self.conn, patient_id)
    }

    fn save_alert(&self, alert: &Alert) -> Result<(), DatabaseError> {
        insert_alert(self.conn, alert)
    }

    fn delete_alert(&self, record: &Alert) -> Result<(), DatabaseError> {
        alert::delete_alert(self.conn, &record.id)
    }

    fn replace_for_patient(&self, patient_id: &Uuid, alerts: &[Alert]) -> Result<(), DatabaseError> {
        let removed = replace_patient_alerts(self.conn, patient_id, alerts)?;
        tracing::debug!(
            patient_id = %patient_id,
            removed,
            inserted = alerts.len(),
            "Replaced patient alert set"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::{EatingStatus, PainSeverity};
    use crate::models::*;

    fn test_db() -> Connection {
        open_memory_database().unwrap()
    }

    fn make_patient() -> Patient {
        let mut patient = Patient::new(
            "Ana Ruiz",
            NaiveDate::from_ymd_opt(1962, 7, 4).unwrap(),
        );
        patient.pain_logs.push(PainLog {
            id: Uuid::new_v4(),
            severity: PainSeverity::Severe,
            eating: EatingStatus::SomeEating,
            created: 1_000,
        });
        patient.pain_logs.push(PainLog {
            id: Uuid::new_v4(),
            severity: PainSeverity::Moderate,
            eating: EatingStatus::Eating,
            created: 5_000,
        });
        let med = Medication {
            id: Uuid::new_v4(),
            name: "Oxycodone".into(),
        };
        patient.medication_logs.push(MedicationLog {
            id: Uuid::new_v4(),
            medication_id: med.id,
            medication_name: med.name.clone(),
            taken: true,
            taken_at: 4_000,
            created: 4_100,
        });
        patient.medications.push(med);
        patient.status_logs.push(StatusLog {
            id: Uuid::new_v4(),
            note: "Mouth sores are worse today".into(),
            image_location: Some("images/sores-1.jpg".into()),
            created: 6_000,
        });
        patient.physician_ids.insert(Uuid::new_v4());
        patient
    }

    fn make_alert(patient_id: Uuid, physician_id: Uuid, created: i64) -> Alert {
        Alert {
            id: Uuid::new_v4(),
            patient_id,
            physician_id,
            patient_name: "Ana Ruiz".into(),
            severity_level: 90,
            created,
            physician_contacted: 0,
        }
    }

    #[test]
    fn patient_save_and_reload_keeps_collections() {
        let conn = test_db();
        let repo = SqliteRepository::new(&conn);
        let patient = make_patient();

        repo.save_patient(&patient).unwrap();
        let loaded = repo.find_patient(&patient.id).unwrap().unwrap();

        assert_eq!(loaded.name, "Ana Ruiz");
        assert_eq!(loaded.physician_ids, patient.physician_ids);
        assert_eq!(loaded.pain_logs.len(), 2);
        // Most recent first
        assert_eq!(loaded.pain_logs[0].created, 5_000);
        assert_eq!(loaded.pain_logs[1].severity, PainSeverity::Severe);
        assert_eq!(loaded.medications, patient.medications);
        assert_eq!(loaded.medication_logs, patient.medication_logs);
        assert_eq!(loaded.status_logs, patient.status_logs);
    }

    #[test]
    fn patient_save_replaces_previous_collections() {
        let conn = test_db();
        let repo = SqliteRepository::new(&conn);
        let mut patient = make_patient();
        repo.save_patient(&patient).unwrap();

        patient.name = "Ana M. Ruiz".into();
        patient.pain_logs.truncate(1);
        patient.status_logs.clear();
        repo.save_patient(&patient).unwrap();

        let loaded = repo.find_patient(&patient.id).unwrap().unwrap();
        assert_eq!(loaded.name, "Ana M. Ruiz");
        assert_eq!(loaded.pain_logs.len(), 1);
        assert!(loaded.status_logs.is_empty());
        assert_eq!(repo.all_patients().unwrap().len(), 1);
    }

    #[test]
    fn unknown_stored_ordinals_load_as_not_defined() {
        let conn = test_db();
        let repo = SqliteRepository::new(&conn);
        let patient = make_patient();
        repo.save_patient(&patient).unwrap();

        conn.execute("UPDATE pain_logs SET severity = 'AGONIZING', eating = '7'", [])
            .unwrap();

        let loaded = repo.find_patient(&patient.id).unwrap().unwrap();
        assert!(loaded
            .pain_logs
            .iter()
            .all(|l| l.severity == PainSeverity::NotDefined && l.eating == EatingStatus::NotDefined));
    }

    #[test]
    fn patient_delete_cascades_logs() {
        let conn = test_db();
        let repo = SqliteRepository::new(&conn);
        let patient = make_patient();
        repo.save_patient(&patient).unwrap();

        repo.delete_patient(&patient).unwrap();

        assert!(repo.find_patient(&patient.id).unwrap().is_none());
        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM pain_logs", [], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn deleting_missing_patient_is_not_found() {
        let conn = test_db();
        let repo = SqliteRepository::new(&conn);
        let err = repo.delete_patient(&make_patient()).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn physician_round_trip_with_summaries() {
        let conn = test_db();
        let repo = SqliteRepository::new(&conn);
        let patient = make_patient();
        let mut physician = Physician::new("Dr. Osei");
        physician.link_patient(patient.summary());

        repo.save_physician(&physician).unwrap();
        let loaded = repo.find_physician(&physician.id).unwrap().unwrap();

        assert_eq!(loaded, physician);
        assert_eq!(repo.all_physicians().unwrap().len(), 1);
        assert!(repo.find_physician(&Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn alerts_filter_by_physician_and_patient() {
        let conn = test_db();
        let repo = SqliteRepository::new(&conn);
        let (patient_a, patient_b) = (Uuid::new_v4(), Uuid::new_v4());
        let (doc_1, doc_2) = (Uuid::new_v4(), Uuid::new_v4());

        repo.save_alert(&make_alert(patient_a, doc_1, 10)).unwrap();
        repo.save_alert(&make_alert(patient_a, doc_2, 10)).unwrap();
        repo.save_alert(&make_alert(patient_b, doc_1, 20)).unwrap();

        assert_eq!(repo.all_alerts().unwrap().len(), 3);
        assert_eq!(repo.alerts_for_physician(&doc_1).unwrap().len(), 2);
        assert_eq!(repo.alerts_for_patient(&patient_a).unwrap().len(), 2);

        let newest = &repo.alerts_for_physician(&doc_1).unwrap()[0];
        assert_eq!(newest.patient_id, patient_b);
    }

    #[test]
    fn replace_for_patient_swaps_only_that_patient() {
        let conn = test_db();
        let repo = SqliteRepository::new(&conn);
        let (patient_a, patient_b) = (Uuid::new_v4(), Uuid::new_v4());
        let doctor = Uuid::new_v4();

        repo.save_alert(&make_alert(patient_a, doctor, 10)).unwrap();
        repo.save_alert(&make_alert(patient_b, doctor, 10)).unwrap();

        let fresh = make_alert(patient_a, doctor, 99);
        repo.replace_for_patient(&patient_a, std::slice::from_ref(&fresh)).unwrap();

        let a_alerts = repo.alerts_for_patient(&patient_a).unwrap();
        assert_eq!(a_alerts, vec![fresh]);
        assert_eq!(repo.alerts_for_patient(&patient_b).unwrap().len(), 1);

        repo.replace_for_patient(&patient_a, &[]).unwrap();
        assert!(repo.alerts_for_patient(&patient_a).unwrap().is_empty());
    }

    #[test]
    fn delete_alert_removes_single_row() {
        let conn = test_db();
        let repo = SqliteRepository::new(&conn);
        let alert = make_alert(Uuid::new_v4(), Uuid::new_v4(), 10);
        repo.save_alert(&alert).unwrap();

        repo.delete_alert(&alert).unwrap();
        assert!(repo.all_alerts().unwrap().is_empty());
    }

    #[test]
    fn log_id_owned_by_another_patient_is_a_constraint_violation() {
        let conn = test_db();
        let repo = SqliteRepository::new(&conn);
        let first = make_patient();
        repo.save_patient(&first).unwrap();

        let mut second = make_patient();
        second.pain_logs[0].id = first.pain_logs[0].id;
        let err = repo.save_patient(&second).unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));

        // Rolled back: neither the row nor the log of the second patient exists.
        assert!(repo.find_patient(&second.id).unwrap().is_none());
        let kept = repo.find_patient(&first.id).unwrap().unwrap();
        assert_eq!(kept.pain_logs.len(), 2);
    }

    #[test]
    fn duplicate_status_log_id_rolls_back_the_update() {
        let conn = test_db();
        let repo = SqliteRepository::new(&conn);
        let mut patient = make_patient();
        repo.save_patient(&patient).unwrap();

        let mut copy = patient.status_logs[0].clone();
        copy.note = "again".into();
        patient.status_logs.push(copy);
        patient.name = "Renamed".into();

        let err = repo.save_patient(&patient).unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));
        let stored = repo.find_patient(&patient.id).unwrap().unwrap();
        assert_eq!(stored.name, "Ana Ruiz");
        assert_eq!(stored.status_logs.len(), 1);
    }
}

use std::collections::{BTreeSet, HashMap};

use uuid::Uuid;

use super::clock::Clock;
use super::severity;
use super::types::{AlertingError, Caller, ReconcileOutcome};
use crate::db::{AlertStore, PatientStore, PhysicianStore};
use crate::models::{Alert, Patient, Physician};

/// Keeps a patient's alert set in step with their pain log.
pub struct AlertReconciler<'a, S> {
    store: &'a S,
    clock: &'a dyn Clock,
}

impl<'a, S> AlertReconciler<'a, S>
where
    S: PatientStore + PhysicianStore + AlertStore,
{
    pub fn new(store: &'a S, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    /// Load the assigned physicians. Dangling ids are logged and skipped.
    pub fn resolve_physicians(
        &self,
        physician_ids: &BTreeSet<Uuid>,
    ) -> Result<Vec<Physician>, AlertingError> {
        let mut physicians = Vec::with_capacity(physician_ids.len());
        for id in physician_ids {
            match self.store.find_physician(id)? {
                Some(physician) => physicians.push(physician),
                None => tracing::warn!(physician_id = %id, "Assigned physician not found, skipping"),
            }
        }
        Ok(physicians)
    }

    /// Replace the patient's alerts with a fresh snapshot.
    ///
    /// Every previous alert of `patient_id` is dropped; if the evaluated tier
    /// is above zero one alert per assigned physician takes its place. An
    /// admin caller also links the patient summary into each physician.
    pub fn reconcile_on_update(
        &self,
        patient_id: &Uuid,
        patient: &Patient,
        assigned: &[Physician],
        caller: Caller,
    ) -> Result<ReconcileOutcome, AlertingError> {
        let now = self.clock.now_millis();
        let severity_level = severity::evaluate(&patient.pain_logs, now);

        let alerts: Vec<Alert> = if severity_level > severity::PAIN_SEVERITY_LEVEL_0 {
            assigned
                .iter()
                .map(|physician| Alert {
                    id: Uuid::new_v4(),
                    patient_id: *patient_id,
                    physician_id: physician.id,
                    patient_name: patient.name.clone(),
                    severity_level,
                    created: now,
                    physician_contacted: 0,
                })
                .collect()
        } else {
            Vec::new()
        };

        self.store.replace_for_patient(patient_id, &alerts)?;

        let physicians_linked = if caller.is_admin() {
            self.link_to_physicians(patient, assigned)?
        } else {
            0
        };

        tracing::info!(
            patient_id = %patient_id,
            severity_level,
            alerts = alerts.len(),
            physicians_linked,
            "Alerts reconciled"
        );

        Ok(ReconcileOutcome {
            severity_level,
            alerts_created: alerts.len(),
            physicians_linked,
        })
    }

    /// Load a stored patient and reconcile it against its assigned physicians.
    pub fn reconcile_stored(
        &self,
        patient_id: &Uuid,
        caller: Caller,
    ) -> Result<ReconcileOutcome, AlertingError> {
        let patient = self
            .store
            .find_patient(patient_id)?
            .ok_or(AlertingError::PatientNotFound(*patient_id))?;
        let assigned = self.resolve_physicians(&patient.physician_ids)?;
        self.reconcile_on_update(patient_id, &patient, &assigned, caller)
    }

    /// A physician's alerts with `physician_contacted` filled in for this read.
    pub fn physician_alert_feed(&self, physician_id: &Uuid) -> Result<Vec<Alert>, AlertingError> {
        let physician = self
            .store
            .find_physician(physician_id)?
            .ok_or(AlertingError::PhysicianNotFound(*physician_id))?;

        let patients = self.load_patients(physician.patients.keys())?;
        let alerts = self.store.alerts_for_physician(physician_id)?;

        Ok(annotate_contacted(alerts, std::slice::from_ref(&physician), &patients))
    }

    /// Every stored alert, annotated. Used by the admin overview.
    pub fn annotated_alerts(&self) -> Result<Vec<Alert>, AlertingError> {
        let physicians = self.store.all_physicians()?;
        let patients: HashMap<Uuid, Patient> = self
            .store
            .all_patients()?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let alerts = self.store.all_alerts()?;

        Ok(annotate_contacted(alerts, &physicians, &patients))
    }

    fn link_to_physicians(
        &self,
        patient: &Patient,
        assigned: &[Physician],
    ) -> Result<usize, AlertingError> {
        let mut linked = 0;
        for physician in assigned {
            if physician.has_patient(&patient.id) {
                continue;
            }
            let mut updated = physician.clone();
            updated.link_patient(patient.summary());
            self.store.save_physician(&updated)?;
            linked += 1;
        }
        Ok(linked)
    }

    fn load_patients<'i>(
        &self,
        ids: impl Iterator<Item = &'i Uuid>,
    ) -> Result<HashMap<Uuid, Patient>, AlertingError> {
        let mut patients = HashMap::new();
        for id in ids {
            match self.store.find_patient(id)? {
                Some(patient) => {
                    patients.insert(*id, patient);
                }
                None => tracing::warn!(patient_id = %id, "Listed patient not found, skipping"),
            }
        }
        Ok(patients)
    }
}

/// Fill in `physician_contacted` on each alert.
///
/// An alert counts as contacted once any patient of its physician posts a
/// status log after the alert was created; the earliest such log wins.
/// Alerts with no later log keep `0`. Nothing is persisted.
pub fn annotate_contacted(
    mut alerts: Vec<Alert>,
    physicians: &[Physician],
    patients: &HashMap<Uuid, Patient>,
) -> Vec<Alert> {
    let by_id: HashMap<Uuid, &Physician> = physicians.iter().map(|p| (p.id, p)).collect();

    for alert in &mut alerts {
        let Some(physician) = by_id.get(&alert.physician_id) else {
            tracing::warn!(
                alert_id = %alert.id,
                physician_id = %alert.physician_id,
                "Alert references unknown physician"
            );
            continue;
        };

        let contacted = physician
            .patients
            .keys()
            .filter_map(|id| patients.get(id))
            .flat_map(|patient| patient.status_logs.iter())
            .map(|log| log.created)
            .filter(|created| *created > alert.created)
            .min();

        alert.physician_contacted = contacted.unwrap_or(0);
    }

    alerts
}

//! Patient endpoints.
//!
//! Every write goes through `apply_update`, which holds the connection for
//! the whole load, mutate, save and reconcile sequence so two concurrent
//! writers on the same patient cannot interleave their alert snapshots.

use std::collections::{BTreeSet, HashSet};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::alerting::{AlertReconciler, Caller, Clock, ReconcileOutcome};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CallerContext};
use crate::db::{AlertStore, PatientStore, SqliteRepository};
use crate::models::{
    EatingStatus, Medication, MedicationLog, PainLog, PainSeverity, Patient, StatusLog,
};

// ═══════════════════════════════════════════════════════════
// Request / response bodies
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Serialize, Deserialize)]
pub struct NewPatient {
    pub name: String,
    pub birthdate: NaiveDate,
    #[serde(default)]
    pub physician_ids: BTreeSet<Uuid>,
    #[serde(default)]
    pub medications: Vec<NewMedication>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewMedication {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewPainLog {
    #[serde(default)]
    pub severity: PainSeverity,
    #[serde(default)]
    pub eating: EatingStatus,
    /// Defaults to the server clock.
    pub created: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewMedicationLog {
    pub medication_id: Uuid,
    pub taken: bool,
    pub taken_at: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewStatusLog {
    #[serde(default)]
    pub note: String,
    pub image_location: Option<String>,
}

/// A patient after a write, with the reconciliation it triggered.
#[derive(Debug, Serialize, Deserialize)]
pub struct PatientUpdateResponse {
    pub patient: Patient,
    pub reconcile: ReconcileOutcome,
}

// ═══════════════════════════════════════════════════════════
// Handlers
// ═══════════════════════════════════════════════════════════

/// `GET /api/patients`
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<Vec<Patient>>, ApiError> {
    let conn = ctx.core.lock_db()?;
    let patients = SqliteRepository::new(&conn).all_patients()?;
    Ok(Json(patients))
}

/// `POST /api/patients`: create and reconcile.
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    Json(body): Json<NewPatient>,
) -> Result<(StatusCode, Json<PatientUpdateResponse>), ApiError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Patient name is required".into()));
    }

    let mut patient = Patient::new(body.name.trim(), body.birthdate);
    patient.physician_ids = body.physician_ids;
    patient.medications = body
        .medications
        .into_iter()
        .map(|m| Medication {
            id: Uuid::new_v4(),
            name: m.name,
        })
        .collect();

    let conn = ctx.core.lock_db()?;
    let response = save_and_reconcile(&conn, ctx.core.clock(), patient, caller.caller)?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// `GET /api/patients/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Patient>, ApiError> {
    let id = parse_id(&id)?;
    let conn = ctx.core.lock_db()?;
    let patient = SqliteRepository::new(&conn)
        .find_patient(&id)?
        .ok_or_else(|| patient_not_found(&id))?;
    Ok(Json(patient))
}

/// `PUT /api/patients/:id`: replace the stored record and reconcile.
pub async fn replace(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
    Json(mut body): Json<Patient>,
) -> Result<Json<PatientUpdateResponse>, ApiError> {
    let id = parse_id(&id)?;
    if body.id != id {
        return Err(ApiError::BadRequest("Body id does not match path".into()));
    }
    if body.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Patient name is required".into()));
    }
    body.name = body.name.trim().to_string();
    ensure_unique_ids("pain log", body.pain_logs.iter().map(|l| l.id))?;
    ensure_unique_ids("medication", body.medications.iter().map(|m| m.id))?;
    ensure_unique_ids("medication log", body.medication_logs.iter().map(|l| l.id))?;
    ensure_unique_ids("status log", body.status_logs.iter().map(|l| l.id))?;

    let conn = ctx.core.lock_db()?;
    if SqliteRepository::new(&conn).find_patient(&id)?.is_none() {
        return Err(patient_not_found(&id));
    }
    let response = save_and_reconcile(&conn, ctx.core.clock(), body, caller.caller)?;
    Ok(Json(response))
}

/// `DELETE /api/patients/:id`: remove the patient and its alerts.
pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    let conn = ctx.core.lock_db()?;
    let repo = SqliteRepository::new(&conn);

    let patient = repo
        .find_patient(&id)?
        .ok_or_else(|| patient_not_found(&id))?;
    repo.replace_for_patient(&id, &[])?;
    repo.delete_patient(&patient)?;

    tracing::info!(patient_id = %id, "Patient deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/patients/:id/pain-logs`
pub async fn add_pain_log(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
    Json(body): Json<NewPainLog>,
) -> Result<(StatusCode, Json<PatientUpdateResponse>), ApiError> {
    let id = parse_id(&id)?;
    let clock = ctx.core.clock();
    let conn = ctx.core.lock_db()?;

    let response = apply_update(&conn, clock, &id, caller.caller, |patient| {
        patient.pain_logs.insert(
            0,
            PainLog {
                id: Uuid::new_v4(),
                severity: body.severity,
                eating: body.eating,
                created: body.created.unwrap_or_else(|| clock.now_millis()),
            },
        );
        Ok(())
    })?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// `POST /api/patients/:id/medication-logs`
pub async fn add_medication_log(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
    Json(body): Json<NewMedicationLog>,
) -> Result<(StatusCode, Json<PatientUpdateResponse>), ApiError> {
    let id = parse_id(&id)?;
    let clock = ctx.core.clock();
    let conn = ctx.core.lock_db()?;

    let response = apply_update(&conn, clock, &id, caller.caller, |patient| {
        let medication = patient
            .medications
            .iter()
            .find(|m| m.id == body.medication_id)
            .ok_or_else(|| {
                ApiError::BadRequest(format!("Unknown medication {}", body.medication_id))
            })?;
        let now = clock.now_millis();
        let log = MedicationLog {
            id: Uuid::new_v4(),
            medication_id: medication.id,
            medication_name: medication.name.clone(),
            taken: body.taken,
            taken_at: body.taken_at.unwrap_or(now),
            created: now,
        };
        patient.medication_logs.insert(0, log);
        Ok(())
    })?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// `POST /api/patients/:id/status-logs`
pub async fn add_status_log(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
    Json(body): Json<NewStatusLog>,
) -> Result<(StatusCode, Json<PatientUpdateResponse>), ApiError> {
    let id = parse_id(&id)?;
    let image_location = body
        .image_location
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    if body.note.trim().is_empty() && image_location.is_none() {
        return Err(ApiError::BadRequest("A note or an image is required".into()));
    }

    let clock = ctx.core.clock();
    let conn = ctx.core.lock_db()?;

    let response = apply_update(&conn, clock, &id, caller.caller, |patient| {
        patient.status_logs.insert(
            0,
            StatusLog {
                id: Uuid::new_v4(),
                note: body.note.trim().to_string(),
                image_location,
                created: clock.now_millis(),
            },
        );
        Ok(())
    })?;
    Ok((StatusCode::CREATED, Json(response)))
}

// ═══════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════

pub(crate) fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid id: {raw}")))
}

fn ensure_unique_ids(kind: &str, ids: impl Iterator<Item = Uuid>) -> Result<(), ApiError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(ApiError::BadRequest(format!("Duplicate {kind} id {id}")));
        }
    }
    Ok(())
}

fn patient_not_found(id: &Uuid) -> ApiError {
    ApiError::NotFound(format!("Patient {id} not found"))
}

/// Load a patient, mutate it, then save and reconcile.
fn apply_update(
    conn: &Connection,
    clock: &dyn Clock,
    id: &Uuid,
    caller: Caller,
    mutate: impl FnOnce(&mut Patient) -> Result<(), ApiError>,
) -> Result<PatientUpdateResponse, ApiError> {
    let mut patient = SqliteRepository::new(conn)
        .find_patient(id)?
        .ok_or_else(|| patient_not_found(id))?;
    mutate(&mut patient)?;
    save_and_reconcile(conn, clock, patient, caller)
}

fn save_and_reconcile(
    conn: &Connection,
    clock: &dyn Clock,
    patient: Patient,
    caller: Caller,
) -> Result<PatientUpdateResponse, ApiError> {
    let repo = SqliteRepository::new(conn);
    let saved = repo.save_patient(&patient)?;

    let reconciler = AlertReconciler::new(&repo, clock);
    let assigned = reconciler.resolve_physicians(&saved.physician_ids)?;
    let reconcile = reconciler.reconcile_on_update(&saved.id, &saved, &assigned, caller)?;

    Ok(PatientUpdateResponse {
        patient: saved,
        reconcile,
    })
}

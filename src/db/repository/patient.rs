use std::collections::BTreeSet;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::{EatingStatus, PainSeverity};
use crate::models::*;

pub(crate) fn parse_uuid(field: &str, value: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(value).map_err(|_| DatabaseError::InvalidValue {
        field: field.into(),
        value: value.into(),
    })
}

pub(crate) fn parse_date(field: &str, value: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| DatabaseError::InvalidValue {
        field: field.into(),
        value: value.into(),
    })
}

/// Map a primary-key clash on an owned row to `ConstraintViolation`.
/// Log ids are global, so a clash means the id already belongs to another
/// record or appears twice in the same patient.
fn owned_row_clash(table: &'static str, row_id: Uuid) -> impl FnOnce(rusqlite::Error) -> DatabaseError {
    move |err| match err.sqlite_error_code() {
        Some(rusqlite::ErrorCode::ConstraintViolation) => {
            DatabaseError::ConstraintViolation(format!("{table} id {row_id} is already in use"))
        }
        _ => DatabaseError::Sqlite(err),
    }
}

/// Upsert the patient row and rewrite every owned collection in one transaction.
pub fn save_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    let id = patient.id.to_string();

    tx.execute(
        "INSERT INTO patients (id, name, birthdate) VALUES (?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET name = excluded.name, birthdate = excluded.birthdate",
        params![id, patient.name, patient.birthdate.to_string()],
    )?;

    for table in [
        "patient_physicians",
        "pain_logs",
        "medications",
        "medication_logs",
        "status_logs",
    ] {
        tx.execute(&format!("DELETE FROM {table} WHERE patient_id = ?1"), params![id])?;
    }

    for physician_id in &patient.physician_ids {
        tx.execute(
            "INSERT INTO patient_physicians (patient_id, physician_id) VALUES (?1, ?2)",
            params![id, physician_id.to_string()],
        )?;
    }

    for log in &patient.pain_logs {
        tx.execute(
            "INSERT INTO pain_logs (id, patient_id, severity, eating, created)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                log.id.to_string(),
                id,
                log.severity.as_str(),
                log.eating.as_str(),
                log.created,
            ],
        )
        .map_err(owned_row_clash("pain_logs", log.id))?;
    }

    for med in &patient.medications {
        tx.execute(
            "INSERT INTO medications (id, patient_id, name) VALUES (?1, ?2, ?3)",
            params![med.id.to_string(), id, med.name],
        )
        .map_err(owned_row_clash("medications", med.id))?;
    }

    for log in &patient.medication_logs {
        tx.execute(
            "INSERT INTO medication_logs
             (id, patient_id, medication_id, medication_name, taken, taken_at, created)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                log.id.to_string(),
                id,
                log.medication_id.to_string(),
                log.medication_name,
                log.taken as i32,
                log.taken_at,
                log.created,
            ],
        )
        .map_err(owned_row_clash("medication_logs", log.id))?;
    }

    for log in &patient.status_logs {
        tx.execute(
            "INSERT INTO status_logs (id, patient_id, note, image_location, created)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                log.id.to_string(),
                id,
                log.note,
                log.image_location,
                log.created,
            ],
        )
        .map_err(owned_row_clash("status_logs", log.id))?;
    }

    tx.commit()?;
    Ok(())
}

pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Option<Patient>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, name, birthdate FROM patients WHERE id = ?1",
            params![id.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )
        .optional()?;

    let Some((id_str, name, birthdate)) = row else {
        return Ok(None);
    };

    let id = parse_uuid("patients.id", &id_str)?;
    Ok(Some(Patient {
        id,
        name,
        birthdate: parse_date("patients.birthdate", &birthdate)?,
        physician_ids: load_physician_ids(conn, &id_str)?,
        pain_logs: load_pain_logs(conn, &id_str)?,
        medications: load_medications(conn, &id_str)?,
        medication_logs: load_medication_logs(conn, &id_str)?,
        status_logs: load_status_logs(conn, &id_str)?,
    }))
}

pub fn get_all_patients(conn: &Connection) -> Result<Vec<Patient>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT id FROM patients ORDER BY name, id")?;
    let ids = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut patients = Vec::with_capacity(ids.len());
    for id in ids {
        let uuid = parse_uuid("patients.id", &id)?;
        // Rows deleted between the two queries are simply skipped
        if let Some(patient) = get_patient(conn, &uuid)? {
            patients.push(patient);
        }
    }
    Ok(patients)
}

/// Delete the patient; owned logs go with it via ON DELETE CASCADE.
pub fn delete_patient(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let removed = conn.execute("DELETE FROM patients WHERE id = ?1", params![id.to_string()])?;
    if removed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Patient".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

fn load_physician_ids(conn: &Connection, patient_id: &str) -> Result<BTreeSet<Uuid>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT physician_id FROM patient_physicians WHERE patient_id = ?1",
    )?;
    let rows = stmt.query_map(params![patient_id], |row| row.get::<_, String>(0))?;

    let mut ids = BTreeSet::new();
    for row in rows {
        ids.insert(parse_uuid("patient_physicians.physician_id", &row?)?);
    }
    Ok(ids)
}

fn load_pain_logs(conn: &Connection, patient_id: &str) -> Result<Vec<PainLog>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, severity, eating, created FROM pain_logs
         WHERE patient_id = ?1 ORDER BY created DESC",
    )?;
    let rows = stmt.query_map(params![patient_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, i64>(3)?,
        ))
    })?;

    let mut logs = Vec::new();
    for row in rows {
        let (id, severity, eating, created) = row?;
        logs.push(PainLog {
            id: parse_uuid("pain_logs.id", &id)?,
            severity: PainSeverity::parse_lossy(&severity),
            eating: EatingStatus::parse_lossy(&eating),
            created,
        });
    }
    Ok(logs)
}

fn load_medications(conn: &Connection, patient_id: &str) -> Result<Vec<Medication>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name FROM medications WHERE patient_id = ?1 ORDER BY name",
    )?;
    let rows = stmt.query_map(params![patient_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut meds = Vec::new();
    for row in rows {
        let (id, name) = row?;
        meds.push(Medication {
            id: parse_uuid("medications.id", &id)?,
            name,
        });
    }
    Ok(meds)
}

fn load_medication_logs(
    conn: &Connection,
    patient_id: &str,
) -> Result<Vec<MedicationLog>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, medication_id, medication_name, taken, taken_at, created
         FROM medication_logs WHERE patient_id = ?1 ORDER BY created DESC",
    )?;
    let rows = stmt.query_map(params![patient_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, i32>(3)?,
            row.get::<_, i64>(4)?,
            row.get::<_, i64>(5)?,
        ))
    })?;

    let mut logs = Vec::new();
    for row in rows {
        let (id, medication_id, medication_name, taken, taken_at, created) = row?;
        logs.push(MedicationLog {
            id: parse_uuid("medication_logs.id", &id)?,
            medication_id: parse_uuid("medication_logs.medication_id", &medication_id)?,
            medication_name,
            taken: taken != 0,
            taken_at,
            created,
        });
    }
    Ok(logs)
}

fn load_status_logs(conn: &Connection, patient_id: &str) -> Result<Vec<StatusLog>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, note, image_location, created FROM status_logs
         WHERE patient_id = ?1 ORDER BY created DESC",
    )?;
    let rows = stmt.query_map(params![patient_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, i64>(3)?,
        ))
    })?;

    let mut logs = Vec::new();
    for row in rows {
        let (id, note, image_location, created) = row?;
        logs.push(StatusLog {
            id: parse_uuid("status_logs.id", &id)?,
            note,
            image_location,
            created,
        });
    }
    Ok(logs)
}

use std::collections::BTreeMap;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::patient::{parse_date, parse_uuid};
use crate::db::DatabaseError;
use crate::models::*;

/// Upsert the physician and rewrite the cached patient summaries.
pub fn save_physician(conn: &Connection, physician: &Physician) -> Result<(), DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    let id = physician.id.to_string();

    tx.execute(
        "INSERT INTO physicians (id, name) VALUES (?1, ?2)
         ON CONFLICT(id) DO UPDATE SET name = excluded.name",
        params![id, physician.name],
    )?;
    tx.execute(
        "DELETE FROM physician_patients WHERE physician_id = ?1",
        params![id],
    )?;

    for summary in physician.patients.values() {
        tx.execute(
            "INSERT INTO physician_patients (physician_id, patient_id, patient_name, birthdate)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                id,
                summary.id.to_string(),
                summary.name,
                summary.birthdate.to_string(),
            ],
        )?;
    }

    tx.commit()?;
    Ok(())
}

pub fn get_physician(conn: &Connection, id: &Uuid) -> Result<Option<Physician>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, name FROM physicians WHERE id = ?1",
            params![id.to_string()],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()?;

    let Some((id_str, name)) = row else {
        return Ok(None);
    };

    Ok(Some(Physician {
        id: parse_uuid("physicians.id", &id_str)?,
        name,
        patients: load_patient_summaries(conn, &id_str)?,
    }))
}

pub fn get_all_physicians(conn: &Connection) -> Result<Vec<Physician>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT id, name FROM physicians ORDER BY name, id")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut physicians = Vec::with_capacity(rows.len());
    for (id_str, name) in rows {
        physicians.push(Physician {
            id: parse_uuid("physicians.id", &id_str)?,
            name,
            patients: load_patient_summaries(conn, &id_str)?,
        });
    }
    Ok(physicians)
}

fn load_patient_summaries(
    conn: &Connection,
    physician_id: &str,
) -> Result<BTreeMap<Uuid, PatientSummary>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT patient_id, patient_name, birthdate FROM physician_patients
         WHERE physician_id = ?1",
    )?;
    let rows = stmt.query_map(params![physician_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    let mut patients = BTreeMap::new();
    for row in rows {
        let (id, name, birthdate) = row?;
        let id = parse_uuid("physician_patients.patient_id", &id)?;
        patients.insert(
            id,
            PatientSummary {
                id,
                name,
                birthdate: parse_date("physician_patients.birthdate", &birthdate)?,
            },
        );
    }
    Ok(patients)
}

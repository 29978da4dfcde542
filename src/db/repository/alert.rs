use rusqlite::{params, Connection};
use uuid::Uuid;

use super::patient::parse_uuid;
use crate::db::DatabaseError;
use crate::models::*;

const ALERT_COLUMNS: &str =
    "id, patient_id, physician_id, patient_name, severity_level, created, physician_contacted";

pub fn insert_alert(conn: &Connection, alert: &Alert) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT OR REPLACE INTO alerts
         (id, patient_id, physician_id, patient_name, severity_level, created, physician_contacted)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            alert.id.to_string(),
            alert.patient_id.to_string(),
            alert.physician_id.to_string(),
            alert.patient_name,
            alert.severity_level,
            alert.created,
            alert.physician_contacted,
        ],
    )?;
    Ok(())
}

pub fn delete_alert(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    conn.execute("DELETE FROM alerts WHERE id = ?1", params![id.to_string()])?;
    Ok(())
}

/// Swap a patient's whole alert set inside one transaction.
pub fn replace_patient_alerts(
    conn: &Connection,
    patient_id: &Uuid,
    alerts: &[Alert],
) -> Result<usize, DatabaseError> {
    let tx = conn.unchecked_transaction()?;

    let removed = tx.execute(
        "DELETE FROM alerts WHERE patient_id = ?1",
        params![patient_id.to_string()],
    )?;
    for alert in alerts {
        insert_alert(&tx, alert)?;
    }

    tx.commit()?;
    Ok(removed)
}

pub fn get_all_alerts(conn: &Connection) -> Result<Vec<Alert>, DatabaseError> {
    query_alerts(
        conn,
        &format!("SELECT {ALERT_COLUMNS} FROM alerts ORDER BY created DESC, id"),
        None,
    )
}

pub fn get_alerts_by_physician(
    conn: &Connection,
    physician_id: &Uuid,
) -> Result<Vec<Alert>, DatabaseError> {
    query_alerts(
        conn,
        &format!(
            "SELECT {ALERT_COLUMNS} FROM alerts WHERE physician_id = ?1 ORDER BY created DESC, id"
        ),
        Some(physician_id),
    )
}

pub fn get_alerts_by_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Alert>, DatabaseError> {
    query_alerts(
        conn,
        &format!(
            "SELECT {ALERT_COLUMNS} FROM alerts WHERE patient_id = ?1 ORDER BY created DESC, id"
        ),
        Some(patient_id),
    )
}

type AlertRow = (String, String, String, String, i32, i64, i64);

fn query_alerts(
    conn: &Connection,
    sql: &str,
    key: Option<&Uuid>,
) -> Result<Vec<Alert>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<AlertRow> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
        ))
    };

    let rows = match key {
        Some(id) => stmt
            .query_map(params![id.to_string()], map_row)?
            .collect::<Result<Vec<_>, _>>()?,
        None => stmt.query_map([], map_row)?.collect::<Result<Vec<_>, _>>()?,
    };

    let mut alerts = Vec::with_capacity(rows.len());
    for (id, patient_id, physician_id, patient_name, severity_level, created, contacted) in rows {
        alerts.push(Alert {
            id: parse_uuid("alerts.id", &id)?,
            patient_id: parse_uuid("alerts.patient_id", &patient_id)?,
            physician_id: parse_uuid("alerts.physician_id", &physician_id)?,
            patient_name,
            severity_level,
            created,
            physician_contacted: contacted,
        });
    }
    Ok(alerts)
}

//! Physician endpoints, including the annotated alert feed.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::alerting::AlertReconciler;
use crate::api::endpoints::patients::parse_id;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::{PhysicianStore, SqliteRepository};
use crate::models::{Alert, Physician};

#[derive(Debug, Serialize, Deserialize)]
pub struct NewPhysician {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PhysicianAlertsResponse {
    pub physician_id: uuid::Uuid,
    pub alerts: Vec<Alert>,
}

/// `GET /api/physicians`
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<Vec<Physician>>, ApiError> {
    let conn = ctx.core.lock_db()?;
    let physicians = SqliteRepository::new(&conn).all_physicians()?;
    Ok(Json(physicians))
}

/// `POST /api/physicians`
pub async fn create(
    State(ctx): State<ApiContext>,
    Json(body): Json<NewPhysician>,
) -> Result<(StatusCode, Json<Physician>), ApiError> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Physician name is required".into()));
    }

    let conn = ctx.core.lock_db()?;
    let physician = SqliteRepository::new(&conn).save_physician(&Physician::new(name))?;

    tracing::info!(physician_id = %physician.id, "Physician created");
    Ok((StatusCode::CREATED, Json(physician)))
}

/// `GET /api/physicians/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Physician>, ApiError> {
    let id = parse_id(&id)?;
    let conn = ctx.core.lock_db()?;
    let physician = SqliteRepository::new(&conn)
        .find_physician(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("Physician {id} not found")))?;
    Ok(Json(physician))
}

/// `GET /api/physicians/:id/alerts`: alerts with response status filled in.
pub async fn alerts(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<PhysicianAlertsResponse>, ApiError> {
    let id = parse_id(&id)?;
    let conn = ctx.core.lock_db()?;
    let repo = SqliteRepository::new(&conn);

    let alerts = AlertReconciler::new(&repo, ctx.core.clock()).physician_alert_feed(&id)?;
    Ok(Json(PhysicianAlertsResponse {
        physician_id: id,
        alerts,
    }))
}

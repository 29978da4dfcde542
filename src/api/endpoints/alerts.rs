//! Admin alert overview.
//!
//! `GET /api/alerts`: every stored alert, annotated with physician response.

use axum::extract::State;
use axum::Extension;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::alerting::AlertReconciler;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CallerContext};
use crate::db::SqliteRepository;
use crate::models::Alert;

#[derive(Debug, Serialize, Deserialize)]
pub struct AlertsResponse {
    pub alerts: Vec<Alert>,
    pub uncontacted: usize,
}

/// `GET /api/alerts`
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
) -> Result<Json<AlertsResponse>, ApiError> {
    if !caller.is_admin() {
        return Err(ApiError::Forbidden);
    }

    let conn = ctx.core.lock_db()?;
    let repo = SqliteRepository::new(&conn);
    let alerts = AlertReconciler::new(&repo, ctx.core.clock()).annotated_alerts()?;
    let uncontacted = alerts.iter().filter(|a| !a.is_contacted()).count();

    Ok(Json(AlertsResponse {
        alerts,
        uncontacted,
    }))
}

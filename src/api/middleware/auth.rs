//! Bearer token identification middleware.
//!
//! Extracts `Authorization: Bearer <token>`, classifies the caller
//! against the configured admin credential, and injects `CallerContext`
//! into request extensions for downstream handlers.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CallerContext};

/// Require a bearer token and record who the caller is.
///
/// Accesses `ApiContext` from request extensions (injected by Extension layer).
pub async fn require_auth(
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    match require_auth_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_auth_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let token = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::Unauthorized)?
        .to_string();

    let caller = ctx.core.identify(&token);
    tracing::debug!(
        method = %req.method(),
        path = %req.uri().path(),
        ?caller,
        "Request authenticated"
    );

    req.extensions_mut().insert(CallerContext { caller });

    Ok(next.run(req).await)
}

//! REST router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.
//!
//! Middleware stack (outermost → innermost):
//! 1. Cache-Control header → 2. Extension(ApiContext) → 3. Auth identifier

use std::sync::Arc;

use axum::http::{header, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the API router over shared core state.
///
/// Middleware uses `Extension<ApiContext>` (injected outside the auth layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn api_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

fn build_router(ctx: ApiContext) -> Router {
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let protected = Router::new()
        .route(
            "/patients",
            get(endpoints::patients::list).post(endpoints::patients::create),
        )
        .route(
            "/patients/:id",
            get(endpoints::patients::detail)
                .put(endpoints::patients::replace)
                .delete(endpoints::patients::remove),
        )
        .route(
            "/patients/:id/pain-logs",
            post(endpoints::patients::add_pain_log),
        )
        .route(
            "/patients/:id/medication-logs",
            post(endpoints::patients::add_medication_log),
        )
        .route(
            "/patients/:id/status-logs",
            post(endpoints::patients::add_status_log),
        )
        .route(
            "/physicians",
            get(endpoints::physicians::list).post(endpoints::physicians::create),
        )
        .route("/physicians/:id", get(endpoints::physicians::detail))
        .route(
            "/physicians/:id/alerts",
            get(endpoints::physicians::alerts),
        )
        .route("/alerts", get(endpoints::alerts::list))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        // Extension must sit outside auth so the middleware can extract ApiContext
        .layer(axum::Extension(ctx));

    let unprotected = Router::new().route("/health", get(endpoints::health::check));

    Router::new()
        .nest("/api", protected.merge(unprotected))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
}

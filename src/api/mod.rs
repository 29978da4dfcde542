//! REST API.
//!
//! Exposes patient, physician and alert operations as HTTP endpoints.
//! Routes are nested under `/api/`; everything but the health check sits
//! behind the bearer-token identifier.
//!
//! The router is composable; `api_router()` returns a `Router` that can
//! be mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_api_server_on, ApiServer, ServerError, ServerSession};
pub use types::ApiContext;

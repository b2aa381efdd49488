//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: infrastructure wiring (event store/bus, ledger service, SSE)
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app() -> Router {
    let services = Arc::new(services::build_services());

    // Ledger routes: require owner context (actor context on mutations).
    let ledger = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn(middleware::context_middleware));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(ledger)
        .layer(ServiceBuilder::new())
}

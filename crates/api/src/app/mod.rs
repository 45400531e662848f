//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store, token issuer, mailer, geocoder and photo storage
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request DTOs and response envelopes
//! - `errors.rs`: consistent error responses

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Extension, Router,
    http::StatusCode,
    response::Response,
    routing::get,
};
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{self, RateLimiter};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs` and the
/// black-box tests).
pub fn build_app(services: Arc<AppServices>) -> Router {
    let config = &services.config;
    let limiter = Arc::new(RateLimiter::new(
        Duration::from_secs(config.rate_limit.window_secs),
        config.rate_limit.max_requests,
    ));

    let api = routes::router(config.uploads.max_bytes).layer(axum::middleware::from_fn_with_state(
        limiter,
        middleware::rate_limit,
    ));
    let api = match config.server.base_path.as_str() {
        "/" | "" => Router::new().merge(api),
        base => Router::new().nest(base, api),
    };

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(api)
        .fallback(routes::system::fallback)
        .layer(Extension(services))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(CorsLayer::permissive()),
        )
}

/// A panicking handler answers with the generic server error.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(detail, "handler panicked");
    errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "Server Error")
}

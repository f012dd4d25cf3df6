//! Marketplace storefront library.
//!
//! Procedure gateway for checkout: creates unpaid orders in the Payload CMS,
//! opens Stripe Checkout sessions for them, and reports whether an order has
//! been paid. Exposed as a library so the binary and the integration tests
//! serve the same router.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cms;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod payments;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, http::Request, routing::get};
use tower_http::trace::TraceLayer;
use tracing::field::Empty;

use crate::state::AppState;

/// Build the application router.
///
/// Sentry layers are added by the binary so tests run without a Sentry client.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(routes::routes())
        .layer(axum::middleware::from_fn(
            middleware::request_id_middleware,
        ))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = Empty,
                    user_id = Empty,
                )
            }),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

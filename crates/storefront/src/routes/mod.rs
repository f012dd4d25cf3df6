//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                 - Health check
//!
//! # Procedures (tRPC-compatible, caller must be signed in)
//! POST /api/trpc/payment.createSession         - Create order + checkout session
//! GET  /api/trpc/payment.pollOrderStatus       - Order paid status
//! ```

pub mod payment;
pub mod trpc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the procedure router, mounted under `/api/trpc`.
pub fn procedure_routes() -> Router<AppState> {
    Router::new()
        .route(
            &format!("/{}", payment::CREATE_SESSION),
            post(payment::create_session).fallback(trpc::method_not_supported),
        )
        .route(
            &format!("/{}", payment::POLL_ORDER_STATUS),
            get(payment::poll_order_status).fallback(trpc::method_not_supported),
        )
        .fallback(trpc::unknown_procedure)
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new().nest("/api/trpc", procedure_routes())
}

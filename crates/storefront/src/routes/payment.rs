//! Payment procedures.

use axum::Extension;
use axum::extract::State;
use marketplace_core::{OrderId, ProductId};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{RequestId, RequireUser};
use crate::routes::trpc::{ProcedureInput, ProcedureOutput};
use crate::services::CheckoutError;
use crate::state::AppState;

pub const CREATE_SESSION: &str = "payment.createSession";
pub const POLL_ORDER_STATUS: &str = "payment.pollOrderStatus";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionInput {
    pub product_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionOutput {
    /// Hosted checkout page, or `null` if no session could be opened.
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOrderStatusInput {
    pub order_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOrderStatusOutput {
    pub is_paid: bool,
}

/// `payment.createSession` (mutation).
///
/// A payment provider failure answers `{ url: null }`. The order stays
/// persisted and the failure is reported to Sentry.
#[instrument(skip_all, fields(user_id = %user.id, products = input.product_ids.len()))]
pub async fn create_session(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    request_id: Option<Extension<RequestId>>,
    ProcedureInput(input): ProcedureInput<CreateSessionInput>,
) -> Result<ProcedureOutput<CreateSessionOutput>> {
    let product_ids: Vec<ProductId> = input.product_ids.into_iter().map(ProductId::from).collect();

    let requested = product_ids.len().to_string();
    add_breadcrumb(
        "checkout",
        "Checkout session requested",
        Some(&[("products", requested.as_str())]),
    );

    match state.checkout().create_session(&user.id, &product_ids).await {
        Ok(created) => {
            tracing::info!(
                order_id = %created.order_id,
                session_id = %created.session_id,
                "Checkout session ready"
            );
            Ok(ProcedureOutput(CreateSessionOutput { url: created.url }))
        }
        Err(CheckoutError::Payment { order_id, source }) => {
            let event_id = sentry::capture_error(&source);
            let request_id = request_id.map(|Extension(RequestId(id))| id);
            tracing::error!(
                order_id = %order_id,
                request_id = request_id.as_deref().unwrap_or("-"),
                error = %source,
                sentry_event_id = %event_id,
                "Checkout session failed, order left unpaid"
            );
            Ok(ProcedureOutput(CreateSessionOutput { url: None }))
        }
        Err(err) => Err(AppError::from(err).at(CREATE_SESSION)),
    }
}

/// `payment.pollOrderStatus` (query).
#[instrument(skip_all, fields(user_id = %user.id, order_id = %input.order_id))]
pub async fn poll_order_status(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ProcedureInput(input): ProcedureInput<PollOrderStatusInput>,
) -> Result<ProcedureOutput<PollOrderStatusOutput>> {
    let order_id = OrderId::from(input.order_id);

    let is_paid = state
        .checkout()
        .poll_order_status(&order_id)
        .await
        .map_err(|err| AppError::from(err).at(POLL_ORDER_STATUS))?;

    Ok(ProcedureOutput(PollOrderStatusOutput { is_paid }))
}

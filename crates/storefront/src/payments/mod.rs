//! Payment provider integration.
//!
//! The checkout workflow depends on the [`PaymentGateway`] trait only.
//! [`StripeClient`] is the production implementation against the Stripe
//! Checkout Sessions API.

mod stripe;

pub use stripe::StripeClient;

use std::future::Future;

use marketplace_core::{OrderId, PriceId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when talking to the payment provider.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider rejected the request.
    #[error("payment provider returned {status} ({kind}): {message}")]
    Api {
        status: u16,
        kind: String,
        message: String,
    },

    /// Response body did not match the expected shape.
    #[error("failed to parse payment provider response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Request URL could not be built.
    #[error("invalid payment provider URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Payment method accepted by a checkout session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodType {
    Card,
}

impl PaymentMethodType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Card => "card",
        }
    }
}

/// Checkout session mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutMode {
    /// One-time payment.
    Payment,
}

impl CheckoutMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Payment => "payment",
        }
    }
}

/// Whether the buyer may change a line item's quantity on the hosted page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdjustableQuantity {
    pub enabled: bool,
}

/// One purchasable entry in a checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItem {
    pub price: PriceId,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjustable_quantity: Option<AdjustableQuantity>,
}

impl LineItem {
    /// A single unit of `price`.
    #[must_use]
    pub const fn single(price: PriceId) -> Self {
        Self {
            price,
            quantity: 1,
            adjustable_quantity: None,
        }
    }

    /// A single unit of `price` whose quantity the buyer cannot change.
    #[must_use]
    pub const fn fixed(price: PriceId) -> Self {
        Self {
            price,
            quantity: 1,
            adjustable_quantity: Some(AdjustableQuantity { enabled: false }),
        }
    }
}

/// Metadata attached to a session, echoed back by payment webhooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
    pub user_id: UserId,
    pub order_id: OrderId,
}

/// Parameters for creating a hosted checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutSessionParams {
    pub success_url: String,
    pub cancel_url: String,
    pub payment_method_types: Vec<PaymentMethodType>,
    pub mode: CheckoutMode,
    pub metadata: SessionMetadata,
    pub line_items: Vec<LineItem>,
}

/// A checkout session as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// Hosted payment page. Absent once the session is complete or expired.
    #[serde(default)]
    pub url: Option<String>,
}

/// Payment provider operations consumed by the checkout workflow.
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout session.
    fn create_checkout_session(
        &self,
        params: &CheckoutSessionParams,
    ) -> impl Future<Output = Result<CheckoutSession, PaymentError>> + Send;
}

//! Stripe Checkout Sessions client.

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use super::{CheckoutSession, CheckoutSessionParams, PaymentError, PaymentGateway};
use crate::config::StripeConfig;

const ERROR_BODY_EXCERPT: usize = 500;

/// Client for the Stripe REST API.
#[derive(Clone)]
pub struct StripeClient {
    inner: Arc<StripeClientInner>,
}

struct StripeClientInner {
    client: reqwest::Client,
    sessions_url: Url,
    secret_key: SecretString,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("sessions_url", &self.inner.sessions_url.as_str())
            .field("secret_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl StripeClient {
    /// Create a new Stripe client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build or the API base URL
    /// cannot be joined.
    pub fn new(config: &StripeConfig, timeout: Duration) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let sessions_url = config.api_base.join("v1/checkout/sessions")?;

        Ok(Self {
            inner: Arc::new(StripeClientInner {
                client,
                sessions_url,
                secret_key: config.secret_key.clone(),
            }),
        })
    }
}

impl PaymentGateway for StripeClient {
    #[instrument(
        skip(self, params),
        fields(order_id = %params.metadata.order_id, line_items = params.line_items.len())
    )]
    async fn create_checkout_session(
        &self,
        params: &CheckoutSessionParams,
    ) -> Result<CheckoutSession, PaymentError> {
        let response = self
            .inner
            .client
            .post(self.inner.sessions_url.clone())
            .bearer_auth(self.inner.secret_key.expose_secret())
            .form(&encode_form(params))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let error = parse_error(&body);
            tracing::error!(
                status = %status,
                kind = %error.kind,
                code = error.code.as_deref().unwrap_or("-"),
                body = %body.chars().take(ERROR_BODY_EXCERPT).collect::<String>(),
                "Stripe rejected checkout session"
            );
            return Err(PaymentError::Api {
                status: status.as_u16(),
                kind: error.kind,
                message: error.message,
            });
        }

        let session: CheckoutSession = serde_json::from_str(&body)?;
        debug!(session_id = %session.id, has_url = session.url.is_some(), "Checkout session created");
        Ok(session)
    }
}

struct ParsedError {
    kind: String,
    code: Option<String>,
    message: String,
}

fn parse_error(body: &str) -> ParsedError {
    match serde_json::from_str::<StripeErrorResponse>(body) {
        Ok(StripeErrorResponse { error }) => ParsedError {
            kind: error.kind.unwrap_or_else(|| "unknown".to_string()),
            code: error.code,
            message: error.message.unwrap_or_default(),
        },
        Err(_) => ParsedError {
            kind: "unknown".to_string(),
            code: None,
            message: body.chars().take(ERROR_BODY_EXCERPT).collect(),
        },
    }
}

/// Flatten session parameters into Stripe's bracketed form encoding.
///
/// Nested objects become `parent[child]`, arrays become `parent[index]`.
#[must_use]
pub fn encode_form(params: &CheckoutSessionParams) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), params.mode.as_str().to_string()),
        ("success_url".to_string(), params.success_url.clone()),
        ("cancel_url".to_string(), params.cancel_url.clone()),
    ];

    for (i, method) in params.payment_method_types.iter().enumerate() {
        form.push((
            format!("payment_method_types[{i}]"),
            method.as_str().to_string(),
        ));
    }

    form.push((
        "metadata[userId]".to_string(),
        params.metadata.user_id.to_string(),
    ));
    form.push((
        "metadata[orderId]".to_string(),
        params.metadata.order_id.to_string(),
    ));

    for (i, item) in params.line_items.iter().enumerate() {
        form.push((format!("line_items[{i}][price]"), item.price.to_string()));
        form.push((
            format!("line_items[{i}][quantity]"),
            item.quantity.to_string(),
        ));
        if let Some(adjustable) = item.adjustable_quantity {
            form.push((
                format!("line_items[{i}][adjustable_quantity][enabled]"),
                adjustable.enabled.to_string(),
            ));
        }
    }

    form
}

//! Application state shared across handlers.

use std::sync::Arc;

use crate::cms::{PayloadClient, StoreError};
use crate::config::StorefrontConfig;
use crate::payments::{PaymentError, StripeClient};
use crate::services::{CheckoutService, CheckoutSettings};

/// Error building the outbound clients.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("CMS client: {0}")]
    Cms(#[from] StoreError),
    #[error("Stripe client: {0}")]
    Payments(#[from] PaymentError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the configuration and the outbound API clients.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    cms: PayloadClient,
    payments: StripeClient,
    checkout: CheckoutSettings,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if either HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, StateError> {
        let cms = PayloadClient::new(&config.cms, config.http_timeout)?;
        let payments = StripeClient::new(&config.stripe, config.http_timeout)?;
        let checkout = CheckoutSettings {
            server_url: config.server_url.clone(),
            fee_price_id: config.stripe.fee_price_id.clone(),
        };

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                cms,
                payments,
                checkout,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the Payload CMS client.
    #[must_use]
    pub fn cms(&self) -> &PayloadClient {
        &self.inner.cms
    }

    /// Checkout workflow bound to the production clients.
    #[must_use]
    pub fn checkout(&self) -> CheckoutService<'_, PayloadClient, StripeClient> {
        CheckoutService::new(&self.inner.cms, &self.inner.payments, &self.inner.checkout)
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.inner.config)
            .field("cms", &self.inner.cms)
            .field("payments", &self.inner.payments)
            .finish_non_exhaustive()
    }
}

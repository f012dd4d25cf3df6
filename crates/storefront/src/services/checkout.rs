//! Checkout workflow: order creation and checkout session handoff.

use marketplace_core::{OrderId, PriceId, ProductId, UserId};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::cms::{Collection, DocumentStore, Filter, FindResult, StoreError};
use crate::models::{NewOrder, Order, Product};
use crate::payments::{
    CheckoutMode, CheckoutSessionParams, LineItem, PaymentError, PaymentGateway,
    PaymentMethodType, SessionMetadata,
};

/// Errors produced by the checkout workflow.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// No product IDs were supplied.
    #[error("at least one product is required")]
    EmptyCart,

    /// No order exists with this ID.
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    /// The document store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The payment provider failed after the order was persisted.
    #[error("checkout session for order {order_id} failed: {source}")]
    Payment {
        order_id: OrderId,
        #[source]
        source: PaymentError,
    },
}

/// Static inputs to every checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    /// Public base URL without trailing slash.
    pub server_url: String,
    /// Price charged once per checkout on top of the products.
    pub fee_price_id: PriceId,
}

impl CheckoutSettings {
    #[must_use]
    pub fn success_url(&self, order_id: &OrderId) -> String {
        format!("{}/thank-you?orderId={order_id}", self.server_url)
    }

    #[must_use]
    pub fn cancel_url(&self) -> String {
        format!("{}/cart", self.server_url)
    }
}

/// A checkout session created for a freshly persisted order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedSession {
    pub order_id: OrderId,
    pub session_id: String,
    /// Hosted payment page; `None` if the provider returned no URL.
    pub url: Option<String>,
}

/// Checkout operations over a document store and a payment gateway.
pub struct CheckoutService<'a, S, P> {
    store: &'a S,
    payments: &'a P,
    settings: &'a CheckoutSettings,
}

impl<'a, S, P> CheckoutService<'a, S, P>
where
    S: DocumentStore,
    P: PaymentGateway,
{
    #[must_use]
    pub const fn new(store: &'a S, payments: &'a P, settings: &'a CheckoutSettings) -> Self {
        Self {
            store,
            payments,
            settings,
        }
    }

    /// Create an unpaid order for the purchasable subset of `product_ids`
    /// and open a checkout session for it.
    ///
    /// Products without a price are dropped silently. The fee line item is
    /// always appended, so a cart of only unpriced products still yields a
    /// session charging the fee alone.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::EmptyCart`] if `product_ids` is empty; nothing is
    ///   read or written.
    /// - [`CheckoutError::Store`] if the product lookup or order creation fails.
    /// - [`CheckoutError::Payment`] if session creation fails. The order has
    ///   already been persisted and is kept.
    #[instrument(skip(self, product_ids), fields(user_id = %user_id, requested = product_ids.len()))]
    pub async fn create_session(
        &self,
        user_id: &UserId,
        product_ids: &[ProductId],
    ) -> Result<CreatedSession, CheckoutError> {
        if product_ids.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let found: FindResult<Product> = self
            .store
            .find(
                Collection::Products,
                &Filter::id_in(product_ids.iter().map(ProductId::as_str)),
            )
            .await?;

        let (purchasable, unpriced) = split_purchasable(found.docs);
        if !unpriced.is_empty() {
            warn!(
                unpriced = ?unpriced,
                purchasable = purchasable.len(),
                "Dropped products without a price"
            );
        }

        let new_order = NewOrder::unpaid(
            purchasable.iter().map(|p| p.id.clone()).collect(),
            user_id.clone(),
        );
        let order: Order = self.store.create(Collection::Orders, &new_order).await?;
        info!(order_id = %order.id, products = order.products.len(), "Order created");

        let params = CheckoutSessionParams {
            success_url: self.settings.success_url(&order.id),
            cancel_url: self.settings.cancel_url(),
            payment_method_types: vec![PaymentMethodType::Card],
            mode: CheckoutMode::Payment,
            metadata: SessionMetadata {
                user_id: user_id.clone(),
                order_id: order.id.clone(),
            },
            line_items: build_line_items(&purchasable, &self.settings.fee_price_id),
        };

        match self.payments.create_checkout_session(&params).await {
            Ok(session) => Ok(CreatedSession {
                order_id: order.id,
                session_id: session.id,
                url: session.url,
            }),
            Err(source) => Err(CheckoutError::Payment {
                order_id: order.id,
                source,
            }),
        }
    }

    /// Whether the order has been paid.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::OrderNotFound`] if no order has this ID.
    /// - [`CheckoutError::Store`] if the lookup fails.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn poll_order_status(&self, order_id: &OrderId) -> Result<bool, CheckoutError> {
        let found: FindResult<Order> = self
            .store
            .find(Collection::Orders, &Filter::id_equals(order_id.as_str()))
            .await?;

        found
            .docs
            .into_iter()
            .next()
            .map(|order| order.is_paid)
            .ok_or_else(|| CheckoutError::OrderNotFound(order_id.clone()))
    }
}

/// Separate found products into purchasable ones and the IDs of those
/// without a price.
fn split_purchasable(docs: Vec<Product>) -> (Vec<Product>, Vec<ProductId>) {
    let (purchasable, unpriced): (Vec<Product>, Vec<Product>) =
        docs.into_iter().partition(Product::is_purchasable);
    (purchasable, unpriced.into_iter().map(|p| p.id).collect())
}

/// One single-unit item per product, then the non-adjustable fee item.
#[must_use]
pub fn build_line_items(products: &[Product], fee_price_id: &PriceId) -> Vec<LineItem> {
    products
        .iter()
        .filter_map(|p| p.price_id.clone())
        .map(LineItem::single)
        .chain(std::iter::once(LineItem::fixed(fee_price_id.clone())))
        .collect()
}

//! Orders created at checkout time.
//!
//! An order is created unpaid when a checkout session is requested. The
//! payment-confirmation webhook (a separate service) flips `_isPaid` once
//! the payment provider reports success. Orders are never deleted here.

use chrono::{DateTime, Utc};
use marketplace_core::{OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};

/// An order document from the `orders` collection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Order {
    /// Document ID.
    pub id: OrderId,
    /// Whether the payment provider has confirmed payment.
    #[serde(rename = "_isPaid", default)]
    pub is_paid: bool,
    /// Ordered product IDs (relationship stored by ID).
    #[serde(default)]
    pub products: Vec<ProductId>,
    /// Owning user.
    pub user: UserId,
    /// Creation timestamp set by the store.
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Payload for creating an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewOrder {
    #[serde(rename = "_isPaid")]
    pub is_paid: bool,
    pub products: Vec<ProductId>,
    pub user: UserId,
}

impl NewOrder {
    /// An unpaid order for the given products.
    #[must_use]
    pub const fn unpaid(products: Vec<ProductId>, user: UserId) -> Self {
        Self {
            is_paid: false,
            products,
            user,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_order_wire_format() {
        let order = NewOrder::unpaid(vec![ProductId::new("p1")], UserId::new("u1"));
        let json = serde_json::to_value(&order).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"_isPaid": false, "products": ["p1"], "user": "u1"})
        );
    }

    #[test]
    fn test_order_from_store_normalizes_ids() {
        let order: Order = serde_json::from_str(
            r#"{
                "id": 9,
                "_isPaid": true,
                "products": [3, "p-4"],
                "user": 12,
                "createdAt": "2024-03-01T10:00:00.000Z",
                "updatedAt": "2024-03-01T10:05:00.000Z"
            }"#,
        )
        .unwrap();

        assert_eq!(order.id.as_str(), "9");
        assert!(order.is_paid);
        assert_eq!(order.products, vec![ProductId::new("3"), ProductId::new("p-4")]);
        assert_eq!(order.user.as_str(), "12");
        assert!(order.created_at.is_some());
    }

    #[test]
    fn test_order_paid_flag_defaults_false() {
        let order: Order = serde_json::from_str(r#"{"id": "o1", "user": "u1"}"#).unwrap();
        assert!(!order.is_paid);
        assert!(order.products.is_empty());
    }
}

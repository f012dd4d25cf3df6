//! Catalog products.

use marketplace_core::{PriceId, ProductId};
use serde::Deserialize;

/// A product document from the `products` collection.
///
/// Only the fields the checkout workflow reads are typed; other catalog
/// fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Document ID (string or integer in the store).
    pub id: ProductId,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Payment-provider price ID; `None` when absent or falsy.
    #[serde(default, deserialize_with = "PriceId::deserialize_optional")]
    pub price_id: Option<PriceId>,
}

impl Product {
    /// Whether this product can be added to a checkout session.
    #[must_use]
    pub const fn is_purchasable(&self) -> bool {
        self.price_id.is_some()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_with_integer_id_and_price() {
        let product: Product = serde_json::from_str(
            r#"{"id": 42, "name": "Icon pack", "priceId": "price_abc", "approvedForSale": "approved"}"#,
        )
        .unwrap();

        assert_eq!(product.id.as_str(), "42");
        assert_eq!(product.name.as_deref(), Some("Icon pack"));
        assert_eq!(product.price_id.unwrap().as_str(), "price_abc");
    }

    #[test]
    fn test_product_without_price_is_not_purchasable() {
        let missing: Product = serde_json::from_str(r#"{"id": "p2"}"#).unwrap();
        let empty: Product = serde_json::from_str(r#"{"id": "p3", "priceId": ""}"#).unwrap();

        assert!(!missing.is_purchasable());
        assert!(!empty.is_purchasable());
    }

    #[test]
    fn test_product_with_falsy_price_is_not_purchasable() {
        for json in [
            r#"{"id": "p4", "priceId": 0}"#,
            r#"{"id": "p4", "priceId": false}"#,
        ] {
            let product: Product = serde_json::from_str(json).unwrap();
            assert!(!product.is_purchasable(), "{json}");
        }
    }

    #[test]
    fn test_product_with_blank_price_is_purchasable() {
        let product: Product = serde_json::from_str(r#"{"id": "p5", "priceId": " "}"#).unwrap();
        assert_eq!(product.price_id.unwrap().as_str(), " ");
    }

    #[test]
    fn test_product_with_truthy_non_string_price_fails_to_decode() {
        let result = serde_json::from_str::<Product>(r#"{"id": "p4", "priceId": 1200}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_product_with_invalid_id_fails_to_decode() {
        let result = serde_json::from_str::<Product>(r#"{"id": true, "priceId": "price_x"}"#);
        assert!(result.is_err());
    }
}

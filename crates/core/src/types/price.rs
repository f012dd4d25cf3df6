//! Payment-provider price identifiers.
//!
//! Products in the catalog reference a price object held by the payment
//! provider. Only products carrying a non-empty price identifier can be
//! checked out. Configured prices go through [`PriceId::parse`], which also
//! rejects blank values; catalog values go through
//! [`PriceId::deserialize_optional`].

use core::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

/// Error returned when parsing an empty price identifier.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("price id cannot be empty")]
pub struct PriceIdError;

/// A non-empty payment-provider price identifier (e.g., `price_1Oo4Y0...`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PriceId(String);

impl PriceId {
    /// Parse a price identifier.
    ///
    /// # Errors
    ///
    /// Returns [`PriceIdError`] if the value is empty or whitespace.
    pub fn parse(value: impl Into<String>) -> Result<Self, PriceIdError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(PriceIdError);
        }
        Ok(Self(value))
    }

    /// Borrow the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Deserialize an optional price identifier from a catalog document.
    ///
    /// Falsy values (`null`, `""`, `false`, `0`) mean the product has no
    /// price and map to `None`. Any other string is kept as-is, whitespace
    /// included.
    ///
    /// # Errors
    ///
    /// Returns the deserializer's error for a truthy value that is not a
    /// string (e.g., `42`, `true`, an object).
    pub fn deserialize_optional<'de, D>(deserializer: D) -> Result<Option<Self>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_option(OptionalPriceVisitor)
    }
}

struct OptionalPriceVisitor;

impl<'de> Visitor<'de> for OptionalPriceVisitor {
    type Value = Option<PriceId>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a price id string or a falsy value")
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(self)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok((!v.is_empty()).then(|| PriceId(v.to_owned())))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok((!v.is_empty()).then_some(PriceId(v)))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        if v {
            return Err(E::invalid_type(de::Unexpected::Bool(v), &self));
        }
        Ok(None)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        if v != 0 {
            return Err(E::invalid_type(de::Unexpected::Signed(v), &self));
        }
        Ok(None)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        if v != 0 {
            return Err(E::invalid_type(de::Unexpected::Unsigned(v), &self));
        }
        Ok(None)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        if v.abs() > 0.0 {
            return Err(E::invalid_type(de::Unexpected::Float(v), &self));
        }
        Ok(None)
    }
}

impl<'de> Deserialize<'de> for PriceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::parse(value).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for PriceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PriceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Priced {
        #[serde(default, deserialize_with = "PriceId::deserialize_optional")]
        price: Option<PriceId>,
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(PriceId::parse(""), Err(PriceIdError));
        assert_eq!(PriceId::parse("   "), Err(PriceIdError));
        assert_eq!(PriceId::parse("price_abc").unwrap().as_str(), "price_abc");
    }

    #[test]
    fn test_optional_missing_null_and_empty_are_none() {
        for json in [r"{}", r#"{"price":null}"#, r#"{"price":""}"#] {
            let priced: Priced = serde_json::from_str(json).unwrap();
            assert!(priced.price.is_none(), "expected no price for {json}");
        }
    }

    #[test]
    fn test_optional_string_is_some() {
        let priced: Priced = serde_json::from_str(r#"{"price":"price_abc"}"#).unwrap();
        assert_eq!(priced.price, Some(PriceId::parse("price_abc").unwrap()));
    }

    #[test]
    fn test_optional_falsy_non_strings_are_none() {
        for json in [r#"{"price":0}"#, r#"{"price":false}"#, r#"{"price":0.0}"#] {
            let priced: Priced = serde_json::from_str(json).unwrap();
            assert!(priced.price.is_none(), "expected no price for {json}");
        }
    }

    #[test]
    fn test_optional_whitespace_is_kept() {
        let priced: Priced = serde_json::from_str(r#"{"price":" "}"#).unwrap();
        assert_eq!(priced.price.unwrap().as_str(), " ");
    }

    #[test]
    fn test_optional_rejects_truthy_non_string() {
        assert!(serde_json::from_str::<Priced>(r#"{"price":42}"#).is_err());
        assert!(serde_json::from_str::<Priced>(r#"{"price":true}"#).is_err());
        assert!(serde_json::from_str::<Priced>(r#"{"price":{"id":"price_abc"}}"#).is_err());
    }

    #[test]
    fn test_strict_deserialize_rejects_empty() {
        assert!(serde_json::from_str::<PriceId>(r#""""#).is_err());
    }
}

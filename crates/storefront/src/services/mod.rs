//! Business logic services for storefront.
//!
//! # Services
//!
//! - `checkout` - Order creation and checkout session handoff

pub mod checkout;

pub use checkout::{CheckoutError, CheckoutService, CheckoutSettings, CreatedSession};

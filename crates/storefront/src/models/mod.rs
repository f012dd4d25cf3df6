//! Domain models for the storefront.
//!
//! These are the shapes of the content store documents the checkout workflow
//! reads and writes. Identifiers are normalized by `marketplace_core` while
//! deserializing, so a product stored with an integer ID arrives here as a
//! string `ProductId`.

pub mod order;
pub mod product;
pub mod user;

pub use order::{NewOrder, Order};
pub use product::Product;
pub use user::CurrentUser;

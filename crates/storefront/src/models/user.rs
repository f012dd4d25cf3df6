//! Authenticated caller identity.

use marketplace_core::UserId;
use serde::{Deserialize, Serialize};

/// The user resolved from the caller's CMS session token.
///
/// Only the ID is used by the checkout workflow; the email is attached to
/// error reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User document ID.
    pub id: UserId,
    /// User's email address.
    #[serde(default)]
    pub email: Option<String>,
}

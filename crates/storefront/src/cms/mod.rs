//! Payload CMS document store.
//!
//! # Architecture
//!
//! - The CMS is the source of truth for products and orders
//! - Collections are accessed over the Payload REST API (`/api/{collection}`)
//! - The client is constructed once at startup and shared through `AppState`
//! - Relationships are always requested at `depth=0`, so related documents
//!   arrive as IDs rather than populated objects
//!
//! The checkout workflow only depends on the [`DocumentStore`] trait, which
//! keeps it testable against an in-memory store.
//!
//! # Example
//!
//! ```rust,ignore
//! use marketplace_storefront::cms::{Collection, DocumentStore, Filter, PayloadClient};
//!
//! let client = PayloadClient::new(&config.cms, config.http_timeout)?;
//!
//! let products: FindResult<Product> = client
//!     .find(Collection::Products, &Filter::id_in(["p1", "p2"]))
//!     .await?;
//! ```

mod client;
#[cfg(test)]
pub mod memory;

pub use client::PayloadClient;

use std::future::Future;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when talking to the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The CMS answered with a non-success status.
    #[error("CMS returned {status} for {collection}: {message}")]
    Api {
        status: u16,
        collection: &'static str,
        message: String,
    },

    /// A document did not match the expected shape (e.g., an ID that is
    /// neither a string nor an integer).
    #[error("failed to decode {collection} response: {source}")]
    Decode {
        collection: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Request URL could not be built.
    #[error("invalid CMS URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Named collections of the document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Products,
    Orders,
    Users,
}

impl Collection {
    /// Collection slug as used in REST paths.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Products => "products",
            Self::Orders => "orders",
            Self::Users => "users",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

/// A `where` clause on a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Field equals one value.
    Equals { field: &'static str, value: String },
    /// Field is one of several values.
    In {
        field: &'static str,
        values: Vec<String>,
    },
}

impl Filter {
    /// Match documents whose ID is one of `ids`.
    pub fn id_in<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::In {
            field: "id",
            values: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Match the document with this ID.
    pub fn id_equals(id: impl Into<String>) -> Self {
        Self::Equals {
            field: "id",
            value: id.into(),
        }
    }

    /// Query-string pairs in Payload's bracket syntax.
    ///
    /// `in` values get one indexed key each (`where[id][in][0]=...`), so a
    /// value containing a comma is never split by the CMS.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        match self {
            Self::Equals { field, value } => {
                vec![(format!("where[{field}][equals]"), value.clone())]
            }
            Self::In { field, values } => values
                .iter()
                .enumerate()
                .map(|(i, value)| (format!("where[{field}][in][{i}]"), value.clone()))
                .collect(),
        }
    }

    /// Upper bound on the number of matching documents.
    ///
    /// Payload paginates find results (10 per page by default); requesting
    /// exactly as many documents as there are candidate IDs keeps every
    /// match on the first page.
    #[must_use]
    pub fn limit(&self) -> usize {
        match self {
            Self::Equals { .. } => 1,
            Self::In { values, .. } => values.len().max(1),
        }
    }
}

/// Result of a `find` call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindResult<T> {
    /// Matching documents.
    pub docs: Vec<T>,
    /// Total number of matches reported by the store.
    #[serde(default)]
    pub total_docs: Option<u64>,
}

/// Document store operations consumed by the checkout workflow.
pub trait DocumentStore: Send + Sync {
    /// Find documents in `collection` matching `filter`.
    fn find<T>(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> impl Future<Output = Result<FindResult<T>, StoreError>> + Send
    where
        T: DeserializeOwned + Send;

    /// Create a document in `collection` and return the stored document.
    fn create<D, T>(
        &self,
        collection: Collection,
        data: &D,
    ) -> impl Future<Output = Result<T, StoreError>> + Send
    where
        D: Serialize + Sync,
        T: DeserializeOwned + Send;
}

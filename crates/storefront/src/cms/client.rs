//! Payload CMS REST client.
//!
//! Server-side collection access authenticates with the service user's API
//! key. Caller resolution (`/api/users/me`) forwards the caller's own token
//! instead, so the CMS decides whether the session is still valid.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use super::{Collection, DocumentStore, Filter, FindResult, StoreError};
use crate::config::CmsConfig;
use crate::models::CurrentUser;

/// Maximum number of response body characters kept in error messages.
const ERROR_BODY_EXCERPT: usize = 500;

/// Client for the Payload CMS REST API.
///
/// Cheaply cloneable; all clones share one connection pool.
#[derive(Clone)]
pub struct PayloadClient {
    inner: Arc<PayloadClientInner>,
}

struct PayloadClientInner {
    client: reqwest::Client,
    /// Base URL, always ending with `/`.
    base_url: Url,
    api_key: SecretString,
}

impl std::fmt::Debug for PayloadClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Envelope of a successful create.
#[derive(Debug, Deserialize)]
struct CreateResponse<T> {
    doc: T,
}

/// Envelope of `/api/users/me`.
#[derive(Debug, Deserialize)]
struct MeResponse {
    user: Option<CurrentUser>,
}

/// Payload error body: `{"errors": [{"message": "..."}]}`.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    errors: Vec<ErrorMessage>,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: String,
}

impl PayloadClient {
    /// Create a new Payload CMS client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &CmsConfig, timeout: Duration) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        // Url::join drops the last path segment unless the base ends with '/'
        let mut base_url = config.url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(PayloadClientInner {
                client,
                base_url,
                api_key: config.api_key.clone(),
            }),
        })
    }

    /// Resolve the user owning a CMS session token.
    ///
    /// Returns `Ok(None)` if the token is unknown, expired, or rejected.
    ///
    /// # Errors
    ///
    /// Returns error if the CMS cannot be reached or answers unexpectedly.
    #[instrument(skip(self, token))]
    pub async fn current_user(&self, token: &str) -> Result<Option<CurrentUser>, StoreError> {
        let url = self.endpoint(Collection::Users, Some("me"))?;

        let response = self
            .inner
            .client
            .get(url)
            .header(AUTHORIZATION, format!("JWT {token}"))
            .send()
            .await?;

        if matches!(
            response.status(),
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN
        ) {
            debug!(status = %response.status(), "CMS rejected session token");
            return Ok(None);
        }

        let me: MeResponse = read_json(response, Collection::Users).await?;
        Ok(me.user)
    }

    /// Build `{base}/api/{collection}[/{suffix}]?depth=0`.
    fn endpoint(&self, collection: Collection, suffix: Option<&str>) -> Result<Url, StoreError> {
        let path = match suffix {
            Some(suffix) => format!("api/{}/{suffix}", collection.slug()),
            None => format!("api/{}", collection.slug()),
        };
        let mut url = self.inner.base_url.join(&path)?;
        url.query_pairs_mut().append_pair("depth", "0");
        Ok(url)
    }

    fn api_key_header(&self) -> String {
        format!(
            "{} API-Key {}",
            Collection::Users.slug(),
            self.inner.api_key.expose_secret()
        )
    }
}

impl DocumentStore for PayloadClient {
    #[instrument(skip(self), fields(collection = %collection))]
    async fn find<T>(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<FindResult<T>, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        let mut url = self.endpoint(collection, None)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &filter.limit().to_string());
            for (key, value) in filter.query_pairs() {
                query.append_pair(&key, &value);
            }
        }

        let response = self
            .inner
            .client
            .get(url)
            .header(AUTHORIZATION, self.api_key_header())
            .send()
            .await?;

        let result: FindResult<T> = read_json(response, collection).await?;
        debug!(
            matched = result.docs.len(),
            total = ?result.total_docs,
            "CMS find completed"
        );
        Ok(result)
    }

    #[instrument(skip(self, data), fields(collection = %collection))]
    async fn create<D, T>(&self, collection: Collection, data: &D) -> Result<T, StoreError>
    where
        D: Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        let url = self.endpoint(collection, None)?;

        let response = self
            .inner
            .client
            .post(url)
            .header(AUTHORIZATION, self.api_key_header())
            .json(data)
            .send()
            .await?;

        let created: CreateResponse<T> = read_json(response, collection).await?;
        debug!("CMS document created");
        Ok(created.doc)
    }
}

/// Read a response body as JSON, mapping non-success statuses to `StoreError::Api`.
async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    collection: Collection,
) -> Result<T, StoreError> {
    let status = response.status();

    // Get response body as text first for better error diagnostics
    let body = response.text().await?;

    if !status.is_success() {
        tracing::error!(
            status = %status,
            collection = %collection,
            body = %excerpt(&body),
            "CMS returned non-success status"
        );
        return Err(StoreError::Api {
            status: status.as_u16(),
            collection: collection.slug(),
            message: error_message(&body),
        });
    }

    serde_json::from_str(&body).map_err(|source| StoreError::Decode {
        collection: collection.slug(),
        source,
    })
}

/// Extract Payload's error messages, falling back to a body excerpt.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(parsed) if !parsed.errors.is_empty() => parsed
            .errors
            .into_iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join("; "),
        _ => excerpt(body),
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(ERROR_BODY_EXCERPT).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::models::{NewOrder, Order, Product};
    use marketplace_core::{ProductId, UserId};

    const API_KEY: &str = "cms-test-api-key";

    fn client_for(server: &MockServer) -> PayloadClient {
        let config = CmsConfig {
            url: Url::parse(&server.base_url()).unwrap(),
            api_key: SecretString::from(API_KEY),
        };
        PayloadClient::new(&config, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_find_products_by_ids() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/products")
                    .query_param("depth", "0")
                    .query_param("limit", "2")
                    .query_param("where[id][in][0]", "p1")
                    .query_param("where[id][in][1]", "p2")
                    .header("authorization", format!("users API-Key {API_KEY}").as_str());
                then.status(200).json_body(json!({
                    "docs": [
                        {"id": "p1", "name": "Icons", "priceId": "price_abc"},
                        {"id": 2, "name": "Fonts", "priceId": null}
                    ],
                    "totalDocs": 2,
                    "page": 1
                }));
            })
            .await;

        let client = client_for(&server);
        let result: FindResult<Product> = client
            .find(Collection::Products, &Filter::id_in(["p1", "p2"]))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result.total_docs, Some(2));
        assert_eq!(result.docs.len(), 2);
        assert_eq!(result.docs[0].id, ProductId::new("p1"));
        assert!(result.docs[0].is_purchasable());
        assert_eq!(result.docs[1].id, ProductId::new("2"));
        assert!(!result.docs[1].is_purchasable());
    }

    #[tokio::test]
    async fn test_create_order_returns_stored_doc() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/orders")
                    .header("authorization", format!("users API-Key {API_KEY}").as_str())
                    .json_body(json!({"_isPaid": false, "products": ["p1"], "user": "u1"}));
                then.status(201).json_body(json!({
                    "message": "Order successfully created.",
                    "doc": {"id": 77, "_isPaid": false, "products": ["p1"], "user": "u1"}
                }));
            })
            .await;

        let client = client_for(&server);
        let new_order = NewOrder::unpaid(vec![ProductId::new("p1")], UserId::new("u1"));
        let order: Order = client.create(Collection::Orders, &new_order).await.unwrap();

        mock.assert_async().await;
        assert_eq!(order.id.as_str(), "77");
        assert!(!order.is_paid);
    }

    #[tokio::test]
    async fn test_non_success_status_maps_to_api_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/orders");
                then.status(403).json_body(json!({
                    "errors": [{"message": "You are not allowed to perform this action."}]
                }));
            })
            .await;

        let client = client_for(&server);
        let err = client
            .find::<Order>(Collection::Orders, &Filter::id_equals("o1"))
            .await
            .unwrap_err();

        match err {
            StoreError::Api {
                status,
                collection,
                message,
            } => {
                assert_eq!(status, 403);
                assert_eq!(collection, "orders");
                assert_eq!(message, "You are not allowed to perform this action.");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_document_maps_to_decode_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/products");
                then.status(200)
                    .json_body(json!({"docs": [{"id": {"$oid": "abc"}, "priceId": "price_x"}]}));
            })
            .await;

        let client = client_for(&server);
        let err = client
            .find::<Product>(Collection::Products, &Filter::id_in(["abc"]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StoreError::Decode {
                collection: "products",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_current_user_forwards_token() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/users/me")
                    .header("authorization", "JWT caller-token");
                then.status(200).json_body(json!({
                    "user": {"id": 5, "email": "buyer@shop.test", "role": "user"},
                    "collection": "users"
                }));
            })
            .await;

        let client = client_for(&server);
        let user = client.current_user("caller-token").await.unwrap().unwrap();

        mock.assert_async().await;
        assert_eq!(user.id, UserId::new("5"));
        assert_eq!(user.email.as_deref(), Some("buyer@shop.test"));
    }

    #[tokio::test]
    async fn test_current_user_none_for_anonymous_or_rejected_token() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/users/me")
                    .header("authorization", "JWT stale");
                then.status(200).json_body(json!({"user": null}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/users/me")
                    .header("authorization", "JWT forged");
                then.status(401).json_body(json!({"errors": [{"message": "Unauthorized"}]}));
            })
            .await;

        let client = client_for(&server);
        assert!(client.current_user("stale").await.unwrap().is_none());
        assert!(client.current_user("forged").await.unwrap().is_none());
    }

    #[test]
    fn test_base_url_keeps_path_prefix() {
        let config = CmsConfig {
            url: Url::parse("https://cms.shop.test/cms").unwrap(),
            api_key: SecretString::from(API_KEY),
        };
        let client = PayloadClient::new(&config, Duration::from_secs(5)).unwrap();
        let url = client.endpoint(Collection::Orders, None).unwrap();

        assert_eq!(url.as_str(), "https://cms.shop.test/cms/api/orders?depth=0");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = CmsConfig {
            url: Url::parse("https://cms.shop.test").unwrap(),
            api_key: SecretString::from(API_KEY),
        };
        let client = PayloadClient::new(&config, Duration::from_secs(5)).unwrap();
        let debug_output = format!("{client:?}");

        assert!(debug_output.contains("cms.shop.test"));
        assert!(!debug_output.contains(API_KEY));
    }

    #[test]
    fn test_error_message_falls_back_to_excerpt() {
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(
            error_message(r#"{"errors":[{"message":"a"},{"message":"b"}]}"#),
            "a; b"
        );
    }
}

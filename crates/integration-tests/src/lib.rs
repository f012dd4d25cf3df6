//! Integration tests for the marketplace storefront.
//!
//! Each test builds the real router with its CMS and Stripe clients pointed
//! at local `httpmock` servers and drives it in-process with
//! `tower::ServiceExt::oneshot`. No network access or running services are
//! needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p marketplace-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use httpmock::prelude::*;
use httpmock::Mock;
use marketplace_core::PriceId;
use marketplace_storefront::config::{
    CmsConfig, DEFAULT_FEE_PRICE_ID, SentryConfig, StorefrontConfig, StripeConfig,
};
use marketplace_storefront::state::AppState;
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;
use url::Url;

/// Public base URL used in checkout redirect URLs.
pub const SERVER_URL: &str = "https://shop.test";

/// API key the storefront presents to the CMS.
pub const CMS_API_KEY: &str = "cms-integration-key-9f3a";

/// Stripe secret key the storefront presents to Stripe.
pub const STRIPE_SECRET_KEY: &str = "sk_test_integration_7Qm2";

/// A storefront router wired to mocked upstream services.
pub struct TestContext {
    pub cms: MockServer,
    pub stripe: MockServer,
    pub app: Router,
}

impl TestContext {
    /// Start both mock servers and build the router against them.
    ///
    /// # Panics
    ///
    /// Panics if the application state cannot be built.
    pub async fn new() -> Self {
        let cms = MockServer::start_async().await;
        let stripe = MockServer::start_async().await;

        let state = AppState::new(config(&cms, &stripe)).expect("state should build");

        Self {
            app: marketplace_storefront::app(state),
            cms,
            stripe,
        }
    }

    /// Register a CMS session token for `user_id`.
    pub async fn sign_in(&self, token: &str, user_id: &str) -> Mock<'_> {
        let email = format!("{user_id}@shop.test");
        self.cms
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/users/me")
                    .header("authorization", format!("JWT {token}").as_str());
                then.status(200).json_body(json!({
                    "user": {"id": user_id, "email": email, "collection": "users"},
                    "collection": "users"
                }));
            })
            .await
    }

    /// Send a request through the router and decode the JSON body.
    ///
    /// # Panics
    ///
    /// Panics if the router fails or the body is not JSON.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        let body = serde_json::from_slice(&bytes).expect("body should be JSON");
        (status, body)
    }
}

fn config(cms: &MockServer, stripe: &MockServer) -> StorefrontConfig {
    StorefrontConfig {
        host: [127, 0, 0, 1].into(),
        port: 0,
        server_url: SERVER_URL.to_string(),
        cms: CmsConfig {
            url: Url::parse(&cms.base_url()).expect("mock URL is valid"),
            api_key: SecretString::from(CMS_API_KEY),
        },
        stripe: StripeConfig {
            api_base: Url::parse(&stripe.base_url()).expect("mock URL is valid"),
            secret_key: SecretString::from(STRIPE_SECRET_KEY),
            fee_price_id: PriceId::parse(DEFAULT_FEE_PRICE_ID).expect("default fee price is valid"),
        },
        http_timeout: Duration::from_secs(5),
        sentry: SentryConfig::default(),
    }
}

/// `POST /api/trpc/<path>` with a JSON body.
///
/// # Panics
///
/// Panics if the request cannot be built.
pub fn mutation(path: &str, token: Option<&str>, input: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/trpc/{path}"))
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("cookie", format!("payload-token={token}"));
    }
    builder
        .body(Body::from(input.to_string()))
        .expect("request should build")
}

/// `GET /api/trpc/<path>?input=<json>`.
///
/// # Panics
///
/// Panics if the request cannot be built.
pub fn query(path: &str, token: Option<&str>, input: &Value) -> Request<Body> {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("input", &input.to_string())
        .finish();
    let mut builder = Request::builder()
        .method(Method::GET)
        .uri(format!("/api/trpc/{path}?{query}"));
    if let Some(token) = token {
        builder = builder.header("authorization", format!("JWT {token}"));
    }
    builder.body(Body::empty()).expect("request should build")
}

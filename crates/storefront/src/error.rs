//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. Procedure handlers return `Result<T, ProcedureError>`,
//! which renders the tRPC error envelope:
//!
//! ```json
//! {"error": {"message": "...", "code": -32004,
//!            "data": {"code": "NOT_FOUND", "httpStatus": 404, "path": "payment.pollOrderStatus"}}}
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::cms::StoreError;
use crate::payments::PaymentError;
use crate::services::CheckoutError;

/// Error kinds visible to procedure callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    BadRequest,
    Unauthorized,
    NotFound,
    MethodNotSupported,
    BadGateway,
    InternalServerError,
}

impl ErrorCode {
    /// Wire name (e.g., `NOT_FOUND`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BadRequest => "BAD_REQUEST",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::NotFound => "NOT_FOUND",
            Self::MethodNotSupported => "METHOD_NOT_SUPPORTED",
            Self::BadGateway => "BAD_GATEWAY",
            Self::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }

    #[must_use]
    pub const fn http_status(self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotSupported => StatusCode::METHOD_NOT_ALLOWED,
            Self::BadGateway => StatusCode::BAD_GATEWAY,
            Self::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON-RPC 2.0 error code used in the envelope's top-level `code`.
    #[must_use]
    pub const fn json_rpc_code(self) -> i32 {
        match self {
            Self::BadRequest => -32600,
            Self::Unauthorized => -32001,
            Self::NotFound => -32004,
            Self::MethodNotSupported => -32005,
            Self::BadGateway | Self::InternalServerError => -32603,
        }
    }
}

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Document store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Payment provider operation failed.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Procedure exists but not for this HTTP method.
    #[error("Method not supported: {0}")]
    MethodNotSupported(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Store(_) | Self::Internal(_) => ErrorCode::InternalServerError,
            Self::Payment(_) => ErrorCode::BadGateway,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::Unauthorized(_) => ErrorCode::Unauthorized,
            Self::BadRequest(_) => ErrorCode::BadRequest,
            Self::MethodNotSupported(_) => ErrorCode::MethodNotSupported,
        }
    }

    /// Message shown to the caller. Server-side details are not exposed.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Store(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Payment(_) => "Payment provider error".to_string(),
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::BadRequest(msg)
            | Self::MethodNotSupported(msg) => msg.clone(),
        }
    }

    /// Attach the procedure path reported in the error envelope.
    #[must_use]
    pub fn at(self, path: impl Into<String>) -> ProcedureError {
        ProcedureError {
            path: Some(path.into()),
            error: self,
        }
    }
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::EmptyCart => Self::BadRequest(err.to_string()),
            CheckoutError::OrderNotFound(_) => Self::NotFound(err.to_string()),
            CheckoutError::Store(source) => Self::Store(source),
            CheckoutError::Payment { source, .. } => Self::Payment(source),
        }
    }
}

/// An [`AppError`] raised while serving a procedure call.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct ProcedureError {
    pub path: Option<String>,
    #[source]
    pub error: AppError,
}

impl From<AppError> for ProcedureError {
    fn from(error: AppError) -> Self {
        Self { path: None, error }
    }
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    error: ErrorShape<'a>,
}

#[derive(Serialize)]
struct ErrorShape<'a> {
    message: String,
    code: i32,
    data: ErrorData<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorData<'a> {
    code: &'static str,
    http_status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a str>,
}

impl IntoResponse for ProcedureError {
    fn into_response(self) -> Response {
        let error = &self.error;

        // Capture server errors to Sentry
        if matches!(
            error,
            AppError::Store(_) | AppError::Payment(_) | AppError::Internal(_)
        ) {
            let event_id = sentry::capture_error(error);
            tracing::error!(
                error = %error,
                path = self.path.as_deref().unwrap_or("-"),
                sentry_event_id = %event_id,
                "Procedure error"
            );
        }

        let code = error.code();
        let status = code.http_status();
        let body = ErrorEnvelope {
            error: ErrorShape {
                message: error.public_message(),
                code: code.json_rpc_code(),
                data: ErrorData {
                    code: code.as_str(),
                    http_status: status.as_u16(),
                    path: self.path.as_deref(),
                },
            },
        };

        (status, Json(body)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        ProcedureError::from(self).into_response()
    }
}

/// Result type alias for procedure handlers.
pub type Result<T> = std::result::Result<T, ProcedureError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Checkout session requested", Some(&[("order_id", "42")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use marketplace_core::OrderId;

    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("order 7 not found".to_string());
        assert_eq!(err.to_string(), "Not found: order 7 not found");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            let response = err.into_response();
            response.status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::MethodNotSupported("test".to_string())),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_checkout_error_mapping() {
        assert_eq!(
            AppError::from(CheckoutError::EmptyCart).code(),
            ErrorCode::BadRequest
        );
        assert_eq!(
            AppError::from(CheckoutError::OrderNotFound(OrderId::new("o1"))).code(),
            ErrorCode::NotFound
        );
        let payment = CheckoutError::Payment {
            order_id: OrderId::new("o1"),
            source: PaymentError::Api {
                status: 402,
                kind: "card_error".to_string(),
                message: "declined".to_string(),
            },
        };
        assert_eq!(AppError::from(payment).code(), ErrorCode::BadGateway);
    }

    #[tokio::test]
    async fn test_envelope_shape() {
        let response = AppError::NotFound("order o1 not found".to_string())
            .at("payment.pollOrderStatus")
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({
                "error": {
                    "message": "order o1 not found",
                    "code": -32004,
                    "data": {
                        "code": "NOT_FOUND",
                        "httpStatus": 404,
                        "path": "payment.pollOrderStatus"
                    }
                }
            })
        );
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let err = AppError::Store(StoreError::Api {
            status: 500,
            collection: "orders",
            message: "connection refused to mongodb://10.0.0.5".to_string(),
        });
        let response = err.at("payment.createSession").into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "Internal server error");
        assert_eq!(body["error"]["data"]["code"], "INTERNAL_SERVER_ERROR");
        assert!(!body.to_string().contains("mongodb"));
    }
}

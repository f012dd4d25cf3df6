//! Caller authentication for procedures.
//!
//! The CMS owns user sessions. A request carries the caller's CMS token in the
//! `payload-token` cookie (browser) or an `Authorization: JWT <token>` /
//! `Authorization: Bearer <token>` header (API clients). The token is
//! resolved to a user through the CMS on every call.

use axum::{
    extract::FromRequestParts,
    http::{
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
    },
};
use tracing::Span;

use crate::error::{AppError, ProcedureError, set_sentry_user};
use crate::models::CurrentUser;
use crate::routes::trpc::procedure_path_of;
use crate::state::AppState;

/// Name of the CMS session cookie.
pub const TOKEN_COOKIE: &str = "payload-token";

/// Extractor that requires a signed-in caller.
///
/// Rejects with `UNAUTHORIZED` when no token is present or the CMS does not
/// recognize it.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_procedure(
///     RequireUser(user): RequireUser,
/// ) -> Result<ProcedureOutput<String>> {
///     Ok(ProcedureOutput(user.id.to_string()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireUser(pub CurrentUser);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = ProcedureError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let path = procedure_path_of(&parts.uri);
        let reject = |error: AppError| ProcedureError {
            path: path.clone(),
            error,
        };

        let token = session_token(parts)
            .ok_or_else(|| reject(AppError::Unauthorized("Not signed in".to_string())))?;

        let user = state
            .cms()
            .current_user(&token)
            .await
            .map_err(|e| reject(AppError::Store(e)))?
            .ok_or_else(|| reject(AppError::Unauthorized("Session is not valid".to_string())))?;

        set_sentry_user(&user.id, user.email.as_deref());
        Span::current().record("user_id", user.id.as_str());

        Ok(Self(user))
    }
}

/// Caller token from the `Authorization` header or the session cookie.
fn session_token(parts: &Parts) -> Option<String> {
    let from_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            value
                .strip_prefix("JWT ")
                .or_else(|| value.strip_prefix("Bearer "))
        })
        .map(str::trim)
        .filter(|token| !token.is_empty());

    if let Some(token) = from_header {
        return Some(token.to_string());
    }

    parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == TOKEN_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/api/trpc/payment.pollOrderStatus");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_token_from_jwt_header() {
        let parts = parts(&[("authorization", "JWT abc.def.ghi")]);
        assert_eq!(session_token(&parts).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_token_from_bearer_header() {
        let parts = parts(&[("authorization", "Bearer abc")]);
        assert_eq!(session_token(&parts).as_deref(), Some("abc"));
    }

    #[test]
    fn test_token_from_cookie() {
        let parts = parts(&[("cookie", "theme=dark; payload-token=tok123; other=x")]);
        assert_eq!(session_token(&parts).as_deref(), Some("tok123"));
    }

    #[test]
    fn test_header_wins_over_cookie() {
        let parts = parts(&[
            ("cookie", "payload-token=from-cookie"),
            ("authorization", "JWT from-header"),
        ]);
        assert_eq!(session_token(&parts).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_missing_or_empty_token() {
        assert!(session_token(&parts(&[])).is_none());
        assert!(session_token(&parts(&[("cookie", "payload-token=")])).is_none());
        assert!(session_token(&parts(&[("authorization", "Basic dXNlcg==")])).is_none());
    }
}

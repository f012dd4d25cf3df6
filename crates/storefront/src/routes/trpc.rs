//! tRPC-compatible request and response plumbing.
//!
//! Non-batched HTTP calls only:
//!
//! ```text
//! GET  /api/trpc/<path>?input=<url-encoded JSON>   - query
//! POST /api/trpc/<path>   body: <JSON>             - mutation
//! ```
//!
//! Successful calls answer `{"result": {"data": <output>}}`.

use std::borrow::Cow;

use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, Request},
    http::{Method, Uri},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{AppError, ProcedureError};

/// Query parameter carrying the input of a query procedure.
const INPUT_PARAM: &str = "input";

/// Procedure path (`payment.createSession`) from a request path.
#[must_use]
pub fn procedure_path(path: &str) -> Option<&str> {
    path.rsplit('/').next().filter(|segment| !segment.is_empty())
}

/// Procedure path of a request URI, for error envelopes.
#[must_use]
pub fn procedure_path_of(uri: &Uri) -> Option<String> {
    procedure_path(uri.path()).map(str::to_owned)
}

/// Extractor for a procedure's typed input.
///
/// Queries (`GET`) read the `input` query parameter, mutations read the JSON
/// body. A missing input decodes as `null`. Any decode failure is a
/// `BAD_REQUEST` carrying the serde message.
#[derive(Debug, Clone)]
pub struct ProcedureInput<T>(pub T);

impl<S, T> FromRequest<S> for ProcedureInput<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ProcedureError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let path = procedure_path_of(req.uri());
        let reject = |message: String| ProcedureError {
            path: path.clone(),
            error: AppError::BadRequest(message),
        };

        let parsed = if req.method() == Method::GET {
            let raw = query_input(req.uri().query()).unwrap_or(Cow::Borrowed("null"));
            serde_json::from_str(&raw)
        } else {
            let body = Bytes::from_request(req, state)
                .await
                .map_err(|rejection| reject(rejection.body_text()))?;
            if body.is_empty() {
                serde_json::from_slice(b"null")
            } else {
                serde_json::from_slice(&body)
            }
        };

        parsed
            .map(Self)
            .map_err(|e| reject(format!("Invalid input: {e}")))
    }
}

fn query_input(query: Option<&str>) -> Option<Cow<'_, str>> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == INPUT_PARAM)
        .map(|(_, value)| value)
}

/// Successful procedure result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureOutput<T>(pub T);

#[derive(Serialize)]
struct ResultEnvelope<T> {
    result: ResultData<T>,
}

#[derive(Serialize)]
struct ResultData<T> {
    data: T,
}

impl<T: Serialize> IntoResponse for ProcedureOutput<T> {
    fn into_response(self) -> Response {
        Json(ResultEnvelope {
            result: ResultData { data: self.0 },
        })
        .into_response()
    }
}

/// Fallback for paths under the procedure prefix that name no procedure.
pub async fn unknown_procedure(uri: Uri) -> ProcedureError {
    let path = procedure_path_of(&uri);
    let message = format!(
        "No procedure found on path \"{}\"",
        path.as_deref().unwrap_or_default()
    );
    ProcedureError {
        path,
        error: AppError::NotFound(message),
    }
}

/// Fallback for a known procedure called with the wrong HTTP method.
pub async fn method_not_supported(method: Method, uri: Uri) -> ProcedureError {
    let path = procedure_path_of(&uri);
    let kind = if method == Method::GET {
        "mutation"
    } else {
        "query"
    };
    ProcedureError {
        path,
        error: AppError::MethodNotSupported(format!(
            "Unsupported {method} request to {kind} procedure"
        )),
    }
}

//! API error type and the JSON error envelope.
//!
//! Every failure is rendered as a JSON array of
//! `{"title", "details"?, "status"}` objects with string status codes —
//! clients match on `details` verbatim, so the texts come straight from the
//! core evaluator.

use axum::{
  Json,
  extract::{FromRequest, Request},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("unauthorized: {0}")]
  Unauthorized(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  /// No representation satisfies the Accept header.
  #[error("not acceptable")]
  NotAcceptable,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<stele_core::Error> for ApiError {
  fn from(err: stele_core::Error) -> Self {
    match err {
      stele_core::Error::BadRequest(m) => ApiError::BadRequest(m),
      stele_core::Error::Unauthorized(m) => ApiError::Unauthorized(m),
      stele_core::Error::NotFound(what) => ApiError::NotFound(what),
      stele_core::Error::Conflict => {
        ApiError::Conflict(stele_core::Error::Conflict.to_string())
      }
      stele_core::Error::Storage(e) => ApiError::Store(e),
    }
  }
}

/// [`Json`] with the rejection routed through the error envelope: a body
/// that fails to parse or deserialize is a 400, not axum's plain-text 422.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
  S: Send + Sync,
  T: DeserializeOwned,
{
  type Rejection = ApiError;

  async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
    let Json(value) = Json::<T>::from_request(req, state)
      .await
      .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    Ok(Self(value))
  }
}

/// One element of the error envelope.
#[derive(Debug, Serialize)]
struct ErrorBody {
  title:   &'static str,
  #[serde(skip_serializing_if = "Option::is_none")]
  details: Option<String>,
  status:  String,
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, title, details) = match self {
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, "Bad Request", Some(m)),
      ApiError::Unauthorized(m) => {
        (StatusCode::UNAUTHORIZED, "Unauthorized", Some(m))
      }
      // 404s carry no details.
      ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "Not Found", None),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, "Conflict", Some(m)),
      ApiError::NotAcceptable => {
        (StatusCode::NOT_ACCEPTABLE, "Not Acceptable", None)
      }
      ApiError::Store(e) => {
        // Unexpected failures are logged here; the expected 4xx above are
        // the client's problem, not ours.
        tracing::error!(error = %e, "storage failure");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          "Server error",
          Some(e.to_string()),
        )
      }
    };

    let body = vec![ErrorBody {
      title,
      details,
      status: status.as_u16().to_string(),
    }];
    (status, Json(body)).into_response()
  }
}

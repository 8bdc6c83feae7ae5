//! API error taxonomy and its rendering into the uniform `{status, message}` envelope.

use axum::{
  extract::rejection::JsonRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use thiserror::Error;
use tracing::{error, warn};

use crate::lifecycle::ValidationError;
use crate::protocol::ErrorOut;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
  /// Malformed input: missing/unknown fields, bad JSON, out-of-range values.
  #[error("{0}")]
  Validation(String),

  /// Public lookups never say whether the id is missing or just not active.
  #[error("Riddle not found or not active")]
  NotFoundOrInactive,

  /// Admin lookups may tell the difference.
  #[error("Riddle not found")]
  NotFound,

  #[error("Invalid or missing auth code")]
  Auth,

  #[error("No such endpoint")]
  UnknownRoute,

  #[error("Method not allowed")]
  MethodNotAllowed,

  #[error("internal error: {0}")]
  Internal(String),
}

impl ApiError {
  pub fn status_code(&self) -> StatusCode {
    match self {
      Self::Validation(_) => StatusCode::BAD_REQUEST,
      Self::NotFoundOrInactive | Self::NotFound | Self::UnknownRoute => StatusCode::NOT_FOUND,
      Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
      Self::Auth => StatusCode::UNAUTHORIZED,
      Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  /// Message safe to hand to callers. Internals stay in the logs.
  pub fn public_message(&self) -> String {
    match self {
      Self::Internal(_) => "Internal server error".into(),
      other => other.to_string(),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match &self {
      Self::Internal(detail) => error!(target: "riddle_lock", error = %detail, "Request failed"),
      Self::Auth => warn!(target: "riddle_lock", "Rejected admin request"),
      other => tracing::debug!(target: "riddle_lock", error = %other, "Request rejected"),
    }
    (self.status_code(), Json(ErrorOut::new(self.public_message()))).into_response()
  }
}

impl From<ValidationError> for ApiError {
  fn from(e: ValidationError) -> Self { Self::Validation(e.to_string()) }
}

impl From<StoreError> for ApiError {
  fn from(e: StoreError) -> Self { Self::Internal(e.to_string()) }
}

impl From<JsonRejection> for ApiError {
  fn from(e: JsonRejection) -> Self { Self::Validation(format!("Invalid request body: {}", e.body_text())) }
}

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::warn;

use crate::validation::ValidationError;

/// Standard error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
  pub error: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub details: Option<String>,
}

impl ErrorResponse {
  pub fn new(error: impl Into<String>) -> Self {
    Self {
      error: error.into(),
      details: None,
    }
  }
}

/// API error types that map to HTTP responses
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  #[error("validation error: {0}")]
  Validation(String),
}

impl From<ValidationError> for ApiError {
  fn from(err: ValidationError) -> Self {
    ApiError::Validation(err.to_string())
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match self {
      ApiError::Validation(msg) => {
        warn!("Validation error: {}", msg);
        (StatusCode::BAD_REQUEST, msg)
      }
    };

    (status, Json(ErrorResponse::new(message))).into_response()
  }
}

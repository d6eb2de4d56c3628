//! Error types for the scrapper: API errors rendered as HTTP responses, and
//! transport errors raised while delivering link updates.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use linktrack_core::{Error, api::ApiErrorResponse};
use thiserror::Error;

// ─── API ─────────────────────────────────────────────────────────────────────

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// Reported under the kind's default status.
  #[error(transparent)]
  Rejected(#[from] Error),

  /// Reported under an endpoint-specific status.
  #[error("{error}")]
  RejectedAs { status: StatusCode, error: Error },
}

impl ApiError {
  /// Convert any store error through the shared taxonomy.
  pub fn store<E: Into<Error>>(e: E) -> Self { ApiError::Rejected(e.into()) }

  pub fn with_status(status: StatusCode, error: Error) -> Self {
    ApiError::RejectedAs { status, error }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, error) = match self {
      ApiError::Rejected(error) => {
        let status =
          StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, error)
      }
      ApiError::RejectedAs { status, error } => (status, error),
    };

    if let Error::Store(e) = &error {
      tracing::error!(error = %e, "store failure");
      return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let body = ApiErrorResponse::with_status(&error, status.as_u16());
    (status, Json(body)).into_response()
  }
}

// ─── Transport ───────────────────────────────────────────────────────────────

/// A link update could not be delivered to the bot.
#[derive(Debug, Error)]
pub enum TransportError {
  #[error("bot rejected update with status {0}")]
  TransportFailed(u16),

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("bus error: {0}")]
  Bus(#[from] linktrack_bus::Error),

  #[error("encode error: {0}")]
  Encode(#[from] serde_json::Error),
}

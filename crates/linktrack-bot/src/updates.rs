//! `POST /updates`: link updates pushed by the scrapper over HTTP.
//!
//! | Status | When                                        |
//! |--------|---------------------------------------------|
//! | 200    | update accepted and fanned out              |
//! | 400    | body is not a `LinkUpdate`; API error body  |
//! | 405    | any other method                            |

use std::sync::Arc;

use axum::{
  Json, Router,
  extract::{State, rejection::JsonRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
  routing::post,
};
use linktrack_core::{LinkUpdate, api::ApiErrorResponse};
use tower_http::trace::TraceLayer;

use crate::{chat::ChatClient, delivery};

pub async fn receive(
  State(chat): State<Arc<dyn ChatClient>>,
  payload: Result<Json<LinkUpdate>, JsonRejection>,
) -> Response {
  let update = match payload {
    Ok(Json(update)) => update,
    Err(rejection) => {
      let error = linktrack_core::Error::BadJson(rejection.body_text());
      tracing::warn!(error = %error, "rejected update");
      return (StatusCode::BAD_REQUEST, Json(ApiErrorResponse::from_error(&error))).into_response();
    }
  };

  tracing::info!(link_id = %update.id, url = %update.url, "update received");
  delivery::deliver(chat.as_ref(), &update).await;
  StatusCode::OK.into_response()
}

/// Build the updates router.
pub fn router(chat: Arc<dyn ChatClient>) -> Router {
  Router::new()
    .route("/updates", post(receive))
    .layer(TraceLayer::new_for_http())
    .with_state(chat)
}

//! Handlers for `/links`. The caller's chat id travels in the `Tg-Chat-Id`
//! header.
//!
//! | Method   | Path     | Body                  | Notes                          |
//! |----------|----------|-----------------------|--------------------------------|
//! | `GET`    | `/links` | —                     | 400 if the chat is unknown     |
//! | `POST`   | `/links` | `{link, tags, filters}` | 400 if unsupported or duplicate |
//! | `DELETE` | `/links` | `{link}`              | 404 if the link is not tracked |

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
  http::{HeaderMap, StatusCode},
};
use chrono::Utc;
use linktrack_core::{
  ChatId, Error,
  api::{AddLinkRequest, CHAT_ID_HEADER, LinkResponse, ListLinksResponse, RemoveLinkRequest},
  store::SubscriptionStore,
};

use crate::{AppState, chats::parse_chat_id, error::ApiError};

fn chat_id(headers: &HeaderMap) -> Result<ChatId, Error> {
  let raw = headers
    .get(CHAT_ID_HEADER)
    .and_then(|v| v.to_str().ok())
    .unwrap_or_default();
  parse_chat_id(raw)
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Error> {
  payload
    .map(|Json(body)| body)
    .map_err(|rejection| Error::BadJson(rejection.body_text()))
}

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /links`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
) -> Result<Json<ListLinksResponse>, ApiError>
where
  S: SubscriptionStore,
{
  let id = chat_id(&headers)?;
  if !state.store.user_exists(id).await.map_err(ApiError::store)? {
    return Err(ApiError::with_status(StatusCode::BAD_REQUEST, Error::UserNotRegistered(id)));
  }

  let links: Vec<LinkResponse> = state
    .store
    .all_user_links(id)
    .await
    .map_err(ApiError::store)?
    .into_iter()
    .map(|(id, url)| LinkResponse { id, url, tags: Vec::new(), filters: Vec::new() })
    .collect();
  Ok(Json(ListLinksResponse { size: links.len(), links }))
}

// ─── Add ─────────────────────────────────────────────────────────────────────

/// `POST /links`
pub async fn add<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  payload: Result<Json<AddLinkRequest>, JsonRejection>,
) -> Result<Json<LinkResponse>, ApiError>
where
  S: SubscriptionStore,
{
  let id = chat_id(&headers)?;
  let request = body(payload)?;
  let url = request.link.trim().to_owned();

  if state.source_for(&url).await.is_none() {
    return Err(Error::UnsupportedLink(url).into());
  }

  let link_id = state
    .store
    .track_link(id, &url, Utc::now())
    .await
    .map_err(ApiError::store)?;
  tracing::info!(chat_id = %id, %url, %link_id, "link tracked");

  Ok(Json(LinkResponse {
    id: link_id,
    url,
    tags: request.tags.unwrap_or_default(),
    filters: request.filters.unwrap_or_default(),
  }))
}

// ─── Remove ──────────────────────────────────────────────────────────────────

/// `DELETE /links`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  payload: Result<Json<RemoveLinkRequest>, JsonRejection>,
) -> Result<Json<LinkResponse>, ApiError>
where
  S: SubscriptionStore,
{
  let id = chat_id(&headers)?;
  let url = body(payload)?.link.trim().to_owned();

  // Checked up front so a missing edge is a 404 whatever the store reports.
  if !state.store.user_tracks_link(id, &url).await.map_err(ApiError::store)? {
    return Err(Error::LinkNotTracked(url).into());
  }

  let link_id = state.store.untrack_link(id, &url).await.map_err(ApiError::store)?;
  tracing::info!(chat_id = %id, %url, %link_id, "link untracked");

  Ok(Json(LinkResponse { id: link_id, url, tags: Vec::new(), filters: Vec::new() }))
}

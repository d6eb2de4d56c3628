//! Handlers for `/tg-chat/{id}`.
//!
//! | Method   | Path            | Notes                                   |
//! |----------|-----------------|-----------------------------------------|
//! | `POST`   | `/tg-chat/{id}` | 400 if the chat is already registered   |
//! | `DELETE` | `/tg-chat/{id}` | 404 if the chat is not registered       |

use axum::extract::{Path, State};
use linktrack_core::{ChatId, Error, store::SubscriptionStore};

use crate::{AppState, error::ApiError};

/// Parse a chat id from its textual form.
pub fn parse_chat_id(raw: &str) -> Result<ChatId, Error> {
  let id: i64 = raw.trim().parse().map_err(|_| Error::IdNotNumber(raw.to_owned()))?;
  if id < 0 {
    return Err(Error::NegativeId(id));
  }
  Ok(ChatId(id))
}

/// `POST /tg-chat/{id}`
pub async fn register<S>(
  State(state): State<AppState<S>>,
  Path(raw): Path<String>,
) -> Result<(), ApiError>
where
  S: SubscriptionStore,
{
  let id = parse_chat_id(&raw)?;
  if state.store.user_exists(id).await.map_err(ApiError::store)? {
    return Err(Error::UserAlreadyRegistered(id).into());
  }
  state.store.register_user(id).await.map_err(ApiError::store)?;
  tracing::info!(chat_id = %id, "chat registered");
  Ok(())
}

/// `DELETE /tg-chat/{id}`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  Path(raw): Path<String>,
) -> Result<(), ApiError>
where
  S: SubscriptionStore,
{
  let id = parse_chat_id(&raw)?;
  if !state.store.user_exists(id).await.map_err(ApiError::store)? {
    return Err(Error::UserNotRegistered(id).into());
  }
  state.store.delete_user(id).await.map_err(ApiError::store)?;
  tracing::info!(chat_id = %id, "chat deleted");
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn chat_ids_must_be_non_negative_integers() {
    assert_eq!(parse_chat_id("42").unwrap(), ChatId(42));
    assert_eq!(parse_chat_id("0").unwrap(), ChatId(0));
    assert!(matches!(parse_chat_id("abc"), Err(Error::IdNotNumber(_))));
    assert!(matches!(parse_chat_id("4.2"), Err(Error::IdNotNumber(_))));
    assert!(matches!(parse_chat_id("-1"), Err(Error::NegativeId(-1))));
  }
}

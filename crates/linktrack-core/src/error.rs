//! Error taxonomy shared by the subscription API and its clients.
//!
//! The `Display` text of each variant is the user-facing message that travels
//! in the `exceptionMessage` field of an API error body, so it doubles as the
//! key [`Error::from_api`] uses to recover the variant on the client side.

use thiserror::Error;

use crate::{api::ApiErrorResponse, link::ChatId};

const MSG_ID_NOT_NUMBER: &str = "id должен быть числом";
const MSG_NEGATIVE_ID: &str = "id не может быть отрицательным";
const MSG_BAD_JSON: &str = "некорректный json";
const MSG_UNSUPPORTED: &str = "переданная ссылка не поддерживается";
const MSG_USER_REGISTERED: &str = "пользователь уже зарегистрирован";
const MSG_USER_NOT_REGISTERED: &str = "пользователь не зарегистрирован";
const MSG_ALREADY_TRACKED: &str = "пользователь уже отслеживает эту ссылку";
const MSG_NOT_TRACKED: &str = "пользователь не отслеживает эту ссылку";

#[derive(Debug, Error)]
pub enum Error {
  // ── Input / validation ────────────────────────────────────────────────
  #[error("{}", MSG_ID_NOT_NUMBER)]
  IdNotNumber(String),

  #[error("{}", MSG_NEGATIVE_ID)]
  NegativeId(i64),

  #[error("{}", MSG_BAD_JSON)]
  BadJson(String),

  #[error("{}", MSG_UNSUPPORTED)]
  UnsupportedLink(String),

  // ── State conflicts ───────────────────────────────────────────────────
  #[error("{}", MSG_USER_REGISTERED)]
  UserAlreadyRegistered(ChatId),

  #[error("{}", MSG_USER_NOT_REGISTERED)]
  UserNotRegistered(ChatId),

  #[error("{}", MSG_ALREADY_TRACKED)]
  LinkAlreadyTracked(String),

  #[error("{}", MSG_NOT_TRACKED)]
  LinkNotTracked(String),

  // ── Upstream ──────────────────────────────────────────────────────────
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// An API response that does not decode to any known kind.
  #[error("unexpected api response ({status}): {message}")]
  Unexpected { status: u16, message: String },
}

impl Error {
  /// Wrap any backend error as [`Error::Store`].
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Error::Store(Box::new(e))
  }

  /// The `exceptionName` reported in API error bodies.
  pub fn exception_name(&self) -> &'static str {
    match self {
      Error::IdNotNumber(_) | Error::NegativeId(_) => "id error",
      Error::BadJson(_) => "json error",
      Error::UnsupportedLink(_)
      | Error::LinkAlreadyTracked(_)
      | Error::LinkNotTracked(_) => "link erroe",
      Error::UserAlreadyRegistered(_) | Error::UserNotRegistered(_) => "user error",
      Error::Store(_) | Error::Unexpected { .. } => "server error",
    }
  }

  /// Default HTTP status for this kind. Individual endpoints may narrow it
  /// (e.g. `GET /links` reports an unknown user as 400).
  pub fn status_code(&self) -> u16 {
    match self {
      Error::IdNotNumber(_)
      | Error::NegativeId(_)
      | Error::BadJson(_)
      | Error::UnsupportedLink(_)
      | Error::UserAlreadyRegistered(_)
      | Error::LinkAlreadyTracked(_) => 400,
      Error::UserNotRegistered(_) | Error::LinkNotTracked(_) => 404,
      Error::Store(_) => 500,
      Error::Unexpected { status, .. } => *status,
    }
  }

  /// Reconstruct a typed error from an API error body.
  ///
  /// The payload fields of the recovered variant are filled from `chat_id`
  /// and `link` since the body does not carry them.
  pub fn from_api(
    status: u16,
    body: &ApiErrorResponse,
    chat_id: ChatId,
    link: &str,
  ) -> Self {
    match body.exception_message.as_str() {
      MSG_ID_NOT_NUMBER => Error::IdNotNumber(chat_id.to_string()),
      MSG_NEGATIVE_ID => Error::NegativeId(chat_id.0),
      MSG_BAD_JSON => Error::BadJson(body.description.clone()),
      MSG_UNSUPPORTED => Error::UnsupportedLink(link.to_owned()),
      MSG_USER_REGISTERED => Error::UserAlreadyRegistered(chat_id),
      MSG_USER_NOT_REGISTERED => Error::UserNotRegistered(chat_id),
      MSG_ALREADY_TRACKED => Error::LinkAlreadyTracked(link.to_owned()),
      MSG_NOT_TRACKED => Error::LinkNotTracked(link.to_owned()),
      other => Error::Unexpected { status, message: other.to_owned() },
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

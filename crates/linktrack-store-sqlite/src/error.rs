//! Error type for `linktrack-store-sqlite`.

use linktrack_core::ChatId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("query build error: {0}")]
  Query(#[from] sea_query::error::Error),

  #[error("cannot bind query value: {0}")]
  Unbindable(String),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("chat {chat_id} already tracks {url}")]
  AlreadyTracked { chat_id: ChatId, url: String },

  #[error("chat {chat_id} does not track {url}")]
  NotTracked { chat_id: ChatId, url: String },

  /// A transaction body failed and the rollback failed as well.
  #[error("{cause}; rollback failed: {rollback}")]
  Rollback {
    #[source]
    cause:    Box<Error>,
    rollback: rusqlite::Error,
  },
}

impl From<Error> for linktrack_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::AlreadyTracked { url, .. } => linktrack_core::Error::LinkAlreadyTracked(url),
      Error::NotTracked { url, .. } => linktrack_core::Error::LinkNotTracked(url),
      other => linktrack_core::Error::store(other),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

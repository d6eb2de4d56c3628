//! Error type for `linktrack-bot`.

use linktrack_core::ChatId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  // ── Upstream ──────────────────────────────────────────────────────────
  #[error("chat api error: {0}")]
  ChatApi(String),

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// A typed rejection from the subscription API.
  #[error(transparent)]
  Subscription(#[from] linktrack_core::Error),

  #[error("bus error: {0}")]
  Bus(#[from] linktrack_bus::Error),

  // ── Dialog context ────────────────────────────────────────────────────
  #[error("chat {0} already has a dialog context")]
  AlreadyRegistered(ChatId),

  #[error("chat {0} has no dialog context; /start was never sent")]
  DialogNotInitialized(ChatId),

  // ── Dialog ────────────────────────────────────────────────────────────
  #[error("no transition from {state} on {event}")]
  EventDeclined { state: String, event: String },

  #[error("unknown command {0}")]
  CommandNotFound(String),

  #[error("malformed filter {0:?}; expected key:value")]
  InvalidFilter(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

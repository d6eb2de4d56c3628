//! Identity types for chats and links, and the scan-time read model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat-platform conversation identifier. Issued by the chat platform;
/// the only identity a user has.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

/// Internal, monotonically assigned identifier of a tracked link.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LinkId(pub i64);

impl fmt::Display for LinkId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

/// A link as seen by the scrapper during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkInfo {
  pub link_id:    LinkId,
  pub url:        String,
  /// Wall-clock instant of the last completed check. Never moves backwards.
  pub last_check: DateTime<Utc>,
}

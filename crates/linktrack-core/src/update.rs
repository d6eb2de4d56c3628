//! Update records produced by site adapters and the `LinkUpdate` wire message
//! carried from the scrapper to the bot.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::link::{ChatId, LinkId};

/// Upper bound, in bytes, of [`UpdateRecord::preview`].
pub const PREVIEW_LIMIT: usize = 200;

/// Offset of the zone timestamps are reported in (UTC+3).
pub const REPORT_OFFSET_SECS: i32 = 3 * 3600;

// ─── Update records ──────────────────────────────────────────────────────────

/// What kind of upstream event an [`UpdateRecord`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
  Issue,
  PullRequest,
  QuestionActivity,
}

impl UpdateKind {
  pub fn label(self) -> &'static str {
    match self {
      UpdateKind::Issue => "Новый issue",
      UpdateKind::PullRequest => "Новый pull request",
      UpdateKind::QuestionActivity => "Новая активность в вопросе",
    }
  }
}

/// One upstream event reported by a site adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRecord {
  pub kind:       UpdateKind,
  pub author:     String,
  pub created_at: DateTime<Utc>,
  pub title:      String,
  /// Plain-text excerpt, at most [`PREVIEW_LIMIT`] bytes.
  pub preview:    String,
}

impl UpdateRecord {
  /// Render the human-readable notification text.
  pub fn describe(&self) -> String {
    let mut text = format!(
      "{}\nНазвание: {}\nАвтор: {}\nСоздано: {}",
      self.kind.label(),
      self.title,
      self.author,
      report_time(self.created_at),
    );
    if !self.preview.is_empty() {
      text.push_str("\nПревью: ");
      text.push_str(&self.preview);
    }
    text
  }
}

/// Format `at` in the reporting zone with second precision.
pub fn report_time(at: DateTime<Utc>) -> String {
  match FixedOffset::east_opt(REPORT_OFFSET_SECS) {
    Some(zone) => at.with_timezone(&zone).format("%Y-%m-%d %H:%M:%S %:z").to_string(),
    None => at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
  }
}

/// Cut `text` to at most `limit` bytes without splitting a UTF-8 character.
pub fn truncate_bytes(text: &str, limit: usize) -> &str {
  if text.len() <= limit {
    return text;
  }
  let mut end = limit;
  while !text.is_char_boundary(end) {
    end -= 1;
  }
  &text[..end]
}

// ─── Wire message ────────────────────────────────────────────────────────────

/// The notification payload sent from the scrapper to the bot, over HTTP or
/// the message bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkUpdate {
  pub id:          LinkId,
  pub url:         String,
  pub description: String,
  #[serde(rename = "tgChatIds")]
  pub subscribers: Vec<ChatId>,
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn link_update_uses_tg_chat_ids_on_the_wire() {
    let update = LinkUpdate {
      id:          LinkId(7),
      url:         "https://github.com/o/r".into(),
      description: "d".into(),
      subscribers: vec![ChatId(1), ChatId(-2)],
    };
    let json = serde_json::to_value(&update).unwrap();
    assert_eq!(json["tgChatIds"], serde_json::json!([1, -2]));
    assert_eq!(json["id"], 7);

    let back: LinkUpdate = serde_json::from_value(json).unwrap();
    assert_eq!(back, update);
  }

  #[test]
  fn truncate_respects_char_boundaries() {
    // Cyrillic letters are two bytes each.
    let text = "привет";
    assert_eq!(truncate_bytes(text, 5), "пр");
    assert_eq!(truncate_bytes(text, 100), text);
    assert_eq!(truncate_bytes("abc", 0), "");
  }

  #[test]
  fn report_time_is_shifted_to_utc_plus_three() {
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 22, 30, 5).unwrap();
    assert_eq!(report_time(at), "2024-01-02 01:30:05 +03:00");
  }

  #[test]
  fn describe_omits_empty_preview() {
    let record = UpdateRecord {
      kind:       UpdateKind::PullRequest,
      author:     "octocat".into(),
      created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
      title:      "Fix".into(),
      preview:    String::new(),
    };
    let text = record.describe();
    assert!(text.starts_with("Новый pull request"));
    assert!(text.contains("octocat"));
    assert!(!text.contains("Превью"));
  }
}

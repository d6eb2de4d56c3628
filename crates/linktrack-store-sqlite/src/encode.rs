//! Encoding and decoding helpers between domain types and SQLite columns.
//!
//! Timestamps are stored as RFC 3339 UTC strings truncated to whole seconds,
//! so lexicographic order in SQL equals chronological order.

use chrono::{DateTime, SecondsFormat, Utc};
use linktrack_core::{LinkId, LinkInfo};

use crate::{Error, Result};

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// Raw values read directly from a `links` row.
pub struct RawLink {
  pub link_id:    i64,
  pub url:        String,
  pub last_check: String,
}

impl RawLink {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawLink {
      link_id:    row.get(0)?,
      url:        row.get(1)?,
      last_check: row.get(2)?,
    })
  }

  pub fn into_info(self) -> Result<LinkInfo> {
    Ok(LinkInfo {
      link_id:    LinkId(self.link_id),
      url:        self.url,
      last_check: decode_dt(&self.last_check)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn encoded_timestamps_sort_chronologically() {
    let early = Utc.with_ymd_and_hms(2024, 9, 30, 23, 59, 59).unwrap();
    let late  = Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap();
    assert!(encode_dt(early) < encode_dt(late));
    assert_eq!(encode_dt(late), "2024-10-01T00:00:00Z");
    assert_eq!(decode_dt(&encode_dt(late)).unwrap(), late);
  }
}

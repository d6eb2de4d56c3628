//! [`RawSql`]: hand-written statements.

use chrono::{DateTime, Utc};
use linktrack_core::{ChatId, LinkId, LinkInfo};
use rusqlite::{Connection, OptionalExtension as _, params};

use super::Queries;
use crate::{
  Result,
  encode::{RawLink, encode_dt},
};

#[derive(Debug, Clone, Copy, Default)]
pub struct RawSql;

impl Queries for RawSql {
  fn insert_user(&self, conn: &Connection, id: ChatId) -> Result<()> {
    conn.execute(
      "INSERT INTO users (user_id) VALUES (?1) ON CONFLICT (user_id) DO NOTHING",
      params![id.0],
    )?;
    Ok(())
  }

  fn user_exists(&self, conn: &Connection, id: ChatId) -> Result<bool> {
    Ok(
      conn
        .query_row("SELECT 1 FROM users WHERE user_id = ?1", params![id.0], |_| Ok(()))
        .optional()?
        .is_some(),
    )
  }

  fn delete_user(&self, conn: &Connection, id: ChatId) -> Result<usize> {
    Ok(conn.execute("DELETE FROM users WHERE user_id = ?1", params![id.0])?)
  }

  fn delete_user_edges(&self, conn: &Connection, id: ChatId) -> Result<usize> {
    Ok(conn.execute("DELETE FROM userlinks WHERE user_id = ?1", params![id.0])?)
  }

  fn upsert_link(&self, conn: &Connection, url: &str, now: DateTime<Utc>) -> Result<LinkId> {
    conn.execute(
      "INSERT INTO links (link_url, last_update_check) VALUES (?1, ?2)
       ON CONFLICT (link_url) DO NOTHING",
      params![url, encode_dt(now)],
    )?;
    let id: i64 = conn.query_row(
      "SELECT link_id FROM links WHERE link_url = ?1",
      params![url],
      |row| row.get(0),
    )?;
    Ok(LinkId(id))
  }

  fn find_link(&self, conn: &Connection, url: &str) -> Result<Option<LinkId>> {
    Ok(
      conn
        .query_row(
          "SELECT link_id FROM links WHERE link_url = ?1",
          params![url],
          |row| row.get(0),
        )
        .optional()?
        .map(LinkId),
    )
  }

  fn touch_last_check(&self, conn: &Connection, url: &str, at: DateTime<Utc>) -> Result<()> {
    let at = encode_dt(at);
    conn.execute(
      "UPDATE links SET last_update_check = ?2
       WHERE link_url = ?1 AND last_update_check <= ?2",
      params![url, at],
    )?;
    Ok(())
  }

  fn stale_links(
    &self,
    conn: &Connection,
    after: Option<LinkId>,
    stale_before: DateTime<Utc>,
    limit: usize,
  ) -> Result<Vec<LinkInfo>> {
    let after = after.map(|id| id.0).unwrap_or(i64::MIN);
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);

    let mut stmt = conn.prepare_cached(
      "SELECT link_id, link_url, last_update_check
       FROM links
       WHERE last_update_check < ?1
         AND link_id > ?2
       ORDER BY link_id ASC
       LIMIT ?3",
    )?;
    let raws = stmt
      .query_map(params![encode_dt(stale_before), after, limit], RawLink::from_row)?
      .collect::<rusqlite::Result<Vec<_>>>()?;

    raws.into_iter().map(RawLink::into_info).collect()
  }

  fn delete_orphan_links(&self, conn: &Connection) -> Result<usize> {
    Ok(conn.execute(
      "DELETE FROM links
       WHERE link_id NOT IN (SELECT link_id FROM userlinks)",
      [],
    )?)
  }

  fn insert_edge(&self, conn: &Connection, id: ChatId, link: LinkId) -> Result<bool> {
    let inserted = conn.execute(
      "INSERT INTO userlinks (user_id, link_id) VALUES (?1, ?2)
       ON CONFLICT (user_id, link_id) DO NOTHING",
      params![id.0, link.0],
    )?;
    Ok(inserted == 1)
  }

  fn delete_edge(&self, conn: &Connection, id: ChatId, link: LinkId) -> Result<bool> {
    let deleted = conn.execute(
      "DELETE FROM userlinks WHERE user_id = ?1 AND link_id = ?2",
      params![id.0, link.0],
    )?;
    Ok(deleted == 1)
  }

  fn edge_exists(&self, conn: &Connection, id: ChatId, url: &str) -> Result<bool> {
    Ok(
      conn
        .query_row(
          "SELECT 1
           FROM userlinks ul
           JOIN links l ON l.link_id = ul.link_id
           WHERE ul.user_id = ?1 AND l.link_url = ?2",
          params![id.0, url],
          |_| Ok(()),
        )
        .optional()?
        .is_some(),
    )
  }

  fn user_links(&self, conn: &Connection, id: ChatId) -> Result<Vec<(LinkId, String)>> {
    let mut stmt = conn.prepare_cached(
      "SELECT l.link_id, l.link_url
       FROM userlinks ul
       JOIN links l ON l.link_id = ul.link_id
       WHERE ul.user_id = ?1",
    )?;
    let rows = stmt
      .query_map(params![id.0], |row| Ok((LinkId(row.get(0)?), row.get(1)?)))?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
  }

  fn link_subscribers(&self, conn: &Connection, link: LinkId) -> Result<Vec<ChatId>> {
    let mut stmt = conn.prepare_cached("SELECT user_id FROM userlinks WHERE link_id = ?1")?;
    let rows = stmt
      .query_map(params![link.0], |row| row.get(0).map(ChatId))?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
  }
}

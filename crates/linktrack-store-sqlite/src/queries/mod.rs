//! Statement sets behind the store.
//!
//! Each method is a single statement (or a select-after-insert pair) against
//! whatever connection it is handed, so the store decides what runs inside a
//! transaction and what runs in autocommit mode.

mod builder;
mod raw;

pub use builder::Builder;
pub use raw::RawSql;

use chrono::{DateTime, Utc};
use linktrack_core::{ChatId, LinkId, LinkInfo};
use rusqlite::Connection;

use crate::Result;

pub trait Queries: Clone + Default + Send + Sync + 'static {
  // ── users ─────────────────────────────────────────────────────────────

  /// `INSERT ... ON CONFLICT DO NOTHING`.
  fn insert_user(&self, conn: &Connection, id: ChatId) -> Result<()>;

  fn user_exists(&self, conn: &Connection, id: ChatId) -> Result<bool>;

  /// Returns the number of deleted rows.
  fn delete_user(&self, conn: &Connection, id: ChatId) -> Result<usize>;

  /// Delete every edge of the user. Returns the number of deleted rows.
  fn delete_user_edges(&self, conn: &Connection, id: ChatId) -> Result<usize>;

  // ── links ─────────────────────────────────────────────────────────────

  /// Insert the link if absent, then return its id.
  fn upsert_link(&self, conn: &Connection, url: &str, now: DateTime<Utc>) -> Result<LinkId>;

  fn find_link(&self, conn: &Connection, url: &str) -> Result<Option<LinkId>>;

  /// Set `last_update_check` unless the stored value is already newer.
  fn touch_last_check(&self, conn: &Connection, url: &str, at: DateTime<Utc>) -> Result<()>;

  /// Up to `limit` links checked before `stale_before` with an id above
  /// `after`, ascending by id.
  fn stale_links(
    &self,
    conn: &Connection,
    after: Option<LinkId>,
    stale_before: DateTime<Utc>,
    limit: usize,
  ) -> Result<Vec<LinkInfo>>;

  /// Returns the number of deleted rows.
  fn delete_orphan_links(&self, conn: &Connection) -> Result<usize>;

  // ── edges ─────────────────────────────────────────────────────────────

  /// Returns `false` if the edge already existed.
  fn insert_edge(&self, conn: &Connection, id: ChatId, link: LinkId) -> Result<bool>;

  /// Returns `false` if there was no such edge.
  fn delete_edge(&self, conn: &Connection, id: ChatId, link: LinkId) -> Result<bool>;

  fn edge_exists(&self, conn: &Connection, id: ChatId, url: &str) -> Result<bool>;

  fn user_links(&self, conn: &Connection, id: ChatId) -> Result<Vec<(LinkId, String)>>;

  fn link_subscribers(&self, conn: &Connection, link: LinkId) -> Result<Vec<ChatId>>;
}

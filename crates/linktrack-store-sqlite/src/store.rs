//! [`SqliteStore`]: the SQLite implementation of [`SubscriptionStore`].

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use linktrack_core::{
  ChatId, LinkId, LinkInfo,
  store::{DEFAULT_BATCH_SIZE, LinkPaginator, STALENESS_SECS, SubscriptionStore},
};

use crate::{
  Error, Result,
  queries::{Queries, RawSql},
  schema::SCHEMA,
  transactor::Transactor,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A subscription store backed by a single SQLite file.
///
/// `Q` selects the statement set; both [`RawSql`] and
/// [`Builder`](crate::Builder) satisfy the same contract. Cloning is cheap.
#[derive(Clone)]
pub struct SqliteStore<Q = RawSql> {
  db:         Transactor,
  queries:    Q,
  batch_size: usize,
}

impl<Q: Queries> SqliteStore<Q> {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>, batch_size: usize) -> Result<Self> {
    let db = Transactor::open(path).await?;
    Self::init(db, batch_size).await
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let db = Transactor::open_in_memory().await?;
    Self::init(db, DEFAULT_BATCH_SIZE).await
  }

  async fn init(db: Transactor, batch_size: usize) -> Result<Self> {
    db.execute_batch(SCHEMA).await?;
    Ok(Self { db, queries: Q::default(), batch_size: batch_size.max(1) })
  }

  /// Override the paginator batch size.
  pub fn with_batch_size(mut self, batch_size: usize) -> Self {
    self.batch_size = batch_size.max(1);
    self
  }

  /// The transactor shared by every operation of this store.
  pub fn transactor(&self) -> &Transactor { &self.db }
}

// ─── SubscriptionStore impl ──────────────────────────────────────────────────

impl<Q: Queries> SubscriptionStore for SqliteStore<Q> {
  type Error = Error;
  type Paginator = SqlitePaginator<Q>;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn register_user(&self, id: ChatId) -> Result<()> {
    let q = self.queries.clone();
    self.db.run(move |conn| q.insert_user(conn, id)).await
  }

  async fn user_exists(&self, id: ChatId) -> Result<bool> {
    let q = self.queries.clone();
    self.db.run(move |conn| q.user_exists(conn, id)).await
  }

  async fn delete_user(&self, id: ChatId) -> Result<()> {
    let q = self.queries.clone();
    self
      .db
      .with_transaction(move |conn| {
        q.delete_user_edges(conn, id)?;
        q.delete_user(conn, id)?;
        Ok(())
      })
      .await
  }

  // ── Subscriptions ─────────────────────────────────────────────────────────

  async fn track_link(&self, id: ChatId, url: &str, now: DateTime<Utc>) -> Result<LinkId> {
    let q   = self.queries.clone();
    let url = url.to_owned();
    self
      .db
      .with_transaction(move |conn| {
        let link_id = q.upsert_link(conn, &url, now)?;
        q.insert_user(conn, id)?;
        if !q.insert_edge(conn, id, link_id)? {
          return Err(Error::AlreadyTracked { chat_id: id, url });
        }
        Ok(link_id)
      })
      .await
  }

  async fn untrack_link(&self, id: ChatId, url: &str) -> Result<LinkId> {
    let q   = self.queries.clone();
    let url = url.to_owned();
    self
      .db
      .with_transaction(move |conn| {
        let Some(link_id) = q.find_link(conn, &url)? else {
          return Err(Error::NotTracked { chat_id: id, url });
        };
        if !q.delete_edge(conn, id, link_id)? {
          return Err(Error::NotTracked { chat_id: id, url });
        }
        Ok(link_id)
      })
      .await
  }

  async fn user_tracks_link(&self, id: ChatId, url: &str) -> Result<bool> {
    let q   = self.queries.clone();
    let url = url.to_owned();
    self.db.run(move |conn| q.edge_exists(conn, id, &url)).await
  }

  async fn all_user_links(&self, id: ChatId) -> Result<Vec<(LinkId, String)>> {
    let q = self.queries.clone();
    self.db.run(move |conn| q.user_links(conn, id)).await
  }

  async fn users_tracking(&self, link_id: LinkId) -> Result<Vec<ChatId>> {
    let q = self.queries.clone();
    self.db.run(move |conn| q.link_subscribers(conn, link_id)).await
  }

  // ── Scan bookkeeping ──────────────────────────────────────────────────────

  async fn touch_last_check(&self, url: &str, at: DateTime<Utc>) -> Result<()> {
    let q   = self.queries.clone();
    let url = url.to_owned();
    self.db.run(move |conn| q.touch_last_check(conn, &url, at)).await
  }

  fn new_paginator(&self) -> SqlitePaginator<Q> {
    SqlitePaginator {
      db:         self.db.clone(),
      queries:    self.queries.clone(),
      batch_size: self.batch_size,
      last_id:    None,
      exhausted:  false,
    }
  }

  async fn sweep_orphan_links(&self) -> Result<usize> {
    let q = self.queries.clone();
    let removed = self.db.run(move |conn| q.delete_orphan_links(conn)).await?;
    if removed > 0 {
      tracing::debug!(removed, "swept orphan links");
    }
    Ok(removed)
  }
}

// ─── Paginator ───────────────────────────────────────────────────────────────

/// Keyset cursor over stale links. See [`LinkPaginator`].
pub struct SqlitePaginator<Q = RawSql> {
  db:         Transactor,
  queries:    Q,
  batch_size: usize,
  last_id:    Option<LinkId>,
  exhausted:  bool,
}

impl<Q: Queries> LinkPaginator for SqlitePaginator<Q> {
  type Error = Error;

  async fn next_batch(&mut self) -> Result<Vec<LinkInfo>> {
    if self.exhausted {
      return Ok(Vec::new());
    }

    let q            = self.queries.clone();
    let after        = self.last_id;
    let limit        = self.batch_size;
    let stale_before = Utc::now() - Duration::seconds(STALENESS_SECS);

    let batch = self
      .db
      .run(move |conn| q.stale_links(conn, after, stale_before, limit))
      .await?;

    match batch.last() {
      Some(last) => self.last_id = Some(last.link_id),
      None => self.exhausted = true,
    }
    Ok(batch)
  }
}

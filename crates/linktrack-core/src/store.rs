//! The `SubscriptionStore` trait and the stale-link paginator.
//!
//! The trait is implemented by storage backends (e.g.
//! `linktrack-store-sqlite`). The scrapper's API and scheduler depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::link::{ChatId, LinkId, LinkInfo};

/// Links checked more recently than this many seconds ago are skipped by a
/// scan.
pub const STALENESS_SECS: i64 = 5 * 60;

/// Default number of links a paginator returns per batch.
pub const DEFAULT_BATCH_SIZE: usize = 100;

// ─── Paginator ───────────────────────────────────────────────────────────────

/// Single-use cursor over stale links, ordered by ascending [`LinkId`].
///
/// Each call returns at most the store's batch size of links with an id
/// greater than the last one returned. The end of the walk is signalled by an
/// empty batch; after that every call returns an empty batch without touching
/// the backend.
pub trait LinkPaginator: Send {
  type Error: std::error::Error + Send + Sync + 'static;

  fn next_batch(
    &mut self,
  ) -> impl Future<Output = Result<Vec<LinkInfo>, Self::Error>> + Send + '_;
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the persistent user ↔ link subscription graph.
///
/// Conflict kinds (`AlreadyTracked`, `NotTracked`) surface through the
/// backend's error type, which converts into [`crate::Error`] so the HTTP
/// layer can map them without knowing the backend.
pub trait SubscriptionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + Into<crate::Error> + 'static;
  type Paginator: LinkPaginator<Error = Self::Error>;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Insert the user; a second call is a no-op.
  fn register_user(
    &self,
    id: ChatId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn user_exists(
    &self,
    id: ChatId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Remove every subscription edge of the user, then the user, in one
  /// transaction.
  fn delete_user(
    &self,
    id: ChatId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Subscriptions ─────────────────────────────────────────────────────

  /// Upsert the link and the user and insert the edge, in one transaction.
  ///
  /// Returns the id of the (possibly pre-existing) link. Fails with the
  /// backend's `AlreadyTracked` kind if the edge exists; the transaction is
  /// then rolled back and no state changes.
  fn track_link<'a>(
    &'a self,
    id: ChatId,
    url: &'a str,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<LinkId, Self::Error>> + Send + 'a;

  /// Delete the edge. Fails with the backend's `NotTracked` kind if it did
  /// not exist. The link row is left for [`Self::sweep_orphan_links`].
  fn untrack_link<'a>(
    &'a self,
    id: ChatId,
    url: &'a str,
  ) -> impl Future<Output = Result<LinkId, Self::Error>> + Send + 'a;

  fn user_tracks_link<'a>(
    &'a self,
    id: ChatId,
    url: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Every link the user tracks, as `(id, url)`. Order unspecified.
  fn all_user_links(
    &self,
    id: ChatId,
  ) -> impl Future<Output = Result<Vec<(LinkId, String)>, Self::Error>> + Send + '_;

  /// Every chat subscribed to the link.
  fn users_tracking(
    &self,
    link_id: LinkId,
  ) -> impl Future<Output = Result<Vec<ChatId>, Self::Error>> + Send + '_;

  // ── Scan bookkeeping ──────────────────────────────────────────────────

  /// Set `last_check := at`. Writes older than the stored value are ignored,
  /// so `last_check` never moves backwards.
  fn touch_last_check<'a>(
    &'a self,
    url: &'a str,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Start a fresh walk over stale links.
  fn new_paginator(&self) -> Self::Paginator;

  /// Delete links no user references. Returns how many were removed.
  fn sweep_orphan_links(
    &self,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}

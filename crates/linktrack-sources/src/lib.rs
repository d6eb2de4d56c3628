//! Site adapters: per-source link validation and change queries.
//!
//! Each adapter implements [`Source`]. The scrapper holds them as
//! `Arc<dyn Source>` in a fixed order and lets the first one whose
//! [`Source::can_track`] returns `true` handle a link.

pub mod error;
pub mod github;
pub mod preview;
pub mod stackoverflow;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use linktrack_core::UpdateRecord;
use reqwest::Client;

pub use error::{Error, Result};
pub use github::GithubSource;
pub use stackoverflow::StackOverflowSource;

/// Timeout applied to every outbound request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A site the scrapper knows how to poll.
#[async_trait]
pub trait Source: Send + Sync {
  /// Short name used in logs.
  fn name(&self) -> &'static str;

  /// Pure syntactic check of `url`; no network access.
  fn accepts(&self, url: &str) -> bool;

  /// [`Source::accepts`] plus one request confirming the resource exists. `false` on any network failure.
  async fn can_track(&self, url: &str) -> bool;

  /// Activity on `url` created strictly after `since`, oldest first.
  async fn updates_since(&self, url: &str, since: DateTime<Utc>) -> Result<Vec<UpdateRecord>>;
}

/// Build the HTTP client shared by the adapters.
pub fn http_client() -> Result<Client> {
  Ok(
    Client::builder()
      .timeout(REQUEST_TIMEOUT)
      .user_agent(concat!("linktrack/", env!("CARGO_PKG_VERSION")))
      .build()?,
  )
}

#[cfg(test)]
pub(crate) mod testing {
  use axum::Router;
  use tokio::net::TcpListener;

  /// Serve `router` on an ephemeral local port and return its base URL.
  pub async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{addr}")
  }
}

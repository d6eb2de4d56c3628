//! GitHub repositories: new issues and pull requests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use linktrack_core::{UpdateKind, UpdateRecord};
use reqwest::{Client, RequestBuilder, Url, header};
use serde::Deserialize;

use crate::{Error, Result, Source, preview::plain_preview};

pub const GITHUB_API: &str = "https://api.github.com";

const NAME: &str = "github";
const PAGE_SIZE: &str = "100";

/// Extract `(owner, repo)` from `https://github.com/{owner}/{repo}`.
///
/// The scheme must be `https`, the host `github.com` or `www.github.com`,
/// and the path exactly two non-empty segments.
pub fn parse_repo(url: &str) -> Option<(String, String)> {
  let url = Url::parse(url).ok()?;
  if url.scheme() != "https" {
    return None;
  }
  if !matches!(url.host_str(), Some("github.com" | "www.github.com")) {
    return None;
  }
  let segments: Vec<&str> = url.path_segments()?.collect();
  match segments.as_slice() {
    [owner, repo] if !owner.is_empty() && !repo.is_empty() => {
      Some(((*owner).to_owned(), (*repo).to_owned()))
    }
    _ => None,
  }
}

// ─── Wire ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SearchResponse {
  #[serde(default)]
  items: Vec<Issue>,
}

#[derive(Debug, Deserialize)]
struct Issue {
  title:        String,
  #[serde(default)]
  body:         Option<String>,
  user:         User,
  created_at:   DateTime<Utc>,
  #[serde(default)]
  pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct User {
  login: String,
}

impl Issue {
  fn into_record(self) -> UpdateRecord {
    let kind = if self.pull_request.is_some() {
      UpdateKind::PullRequest
    } else {
      UpdateKind::Issue
    };
    UpdateRecord {
      kind,
      author: self.user.login,
      created_at: self.created_at,
      title: self.title,
      preview: plain_preview(self.body.as_deref().unwrap_or_default()),
    }
  }
}

// ─── Source ──────────────────────────────────────────────────────────────────

/// Adapter over the GitHub REST API.
pub struct GithubSource {
  client: Client,
  api:    String,
  token:  Option<String>,
}

impl GithubSource {
  pub fn new(client: Client, token: Option<String>) -> Self {
    Self { client, api: GITHUB_API.to_owned(), token: token.filter(|t| !t.is_empty()) }
  }

  /// Point the adapter at a different API root.
  pub fn with_api(mut self, api: impl Into<String>) -> Self {
    self.api = api.into().trim_end_matches('/').to_owned();
    self
  }

  fn get(&self, path: &str) -> RequestBuilder {
    let request = self
      .client
      .get(format!("{}{path}", self.api))
      .header(header::ACCEPT, "application/vnd.github+json");
    match &self.token {
      Some(token) => request.bearer_auth(token),
      None => request,
    }
  }

  fn unsupported(url: &str) -> Error {
    Error::UnsupportedLink { source_name: NAME, url: url.to_owned() }
  }
}

#[async_trait]
impl Source for GithubSource {
  fn name(&self) -> &'static str { NAME }

  fn accepts(&self, url: &str) -> bool { parse_repo(url).is_some() }

  async fn can_track(&self, url: &str) -> bool {
    let Some((owner, repo)) = parse_repo(url) else {
      return false;
    };
    match self.get(&format!("/repos/{owner}/{repo}")).send().await {
      Ok(response) => response.status().is_success(),
      Err(e) => {
        tracing::debug!(url, error = %e, "github repository check failed");
        false
      }
    }
  }

  async fn updates_since(&self, url: &str, since: DateTime<Utc>) -> Result<Vec<UpdateRecord>> {
    let (owner, repo) = parse_repo(url).ok_or_else(|| Self::unsupported(url))?;
    let query = format!(
      "repo:{owner}/{repo} created:>{}",
      since.format("%Y-%m-%dT%H:%M:%SZ")
    );

    let response = self
      .get("/search/issues")
      .query(&[
        ("q", query.as_str()),
        ("sort", "created"),
        ("order", "asc"),
        ("per_page", PAGE_SIZE),
      ])
      .send()
      .await
      .map_err(|e| Error::unavailable(NAME, e))?;

    let status = response.status();
    if !status.is_success() {
      return Err(Error::SourceUnavailable {
        source_name: NAME,
        reason:      format!("search returned {status}"),
      });
    }

    let page: SearchResponse =
      response.json().await.map_err(|e| Error::unavailable(NAME, e))?;
    let mut records: Vec<UpdateRecord> = page
      .items
      .into_iter()
      .filter(|issue| issue.created_at > since)
      .map(Issue::into_record)
      .collect();
    records.sort_by_key(|r| r.created_at);
    Ok(records)
  }
}

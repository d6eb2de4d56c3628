//! Stack Overflow questions: activity since the last check.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use linktrack_core::{UpdateKind, UpdateRecord};
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::{
  Error, Result, Source,
  preview::{decode_entities, html_preview},
};

pub const STACKOVERFLOW_API: &str = "https://api.stackexchange.com";

const NAME: &str = "stackoverflow";
const SITE: &str = "stackoverflow";

/// Extract the question id from
/// `https://stackoverflow.com/questions/{id}[/slug[/...]]`.
///
/// Counting the empty segment before the leading slash, the path has three
/// to five parts, and `id` must be a positive integer.
pub fn parse_question(url: &str) -> Option<u64> {
  let url = Url::parse(url).ok()?;
  if url.scheme() != "https" {
    return None;
  }
  if !matches!(url.host_str(), Some("stackoverflow.com" | "www.stackoverflow.com")) {
    return None;
  }
  let segments: Vec<&str> = url.path_segments()?.collect();
  if !(2..=4).contains(&segments.len()) || segments[0] != "questions" {
    return None;
  }
  segments[1].parse::<u64>().ok().filter(|id| *id > 0)
}

// ─── Wire ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct QuestionsResponse {
  #[serde(default)]
  items: Vec<Question>,
}

#[derive(Debug, Deserialize)]
struct Question {
  last_activity_date: i64,
  #[serde(default)]
  title:              String,
  #[serde(default)]
  body:               String,
  #[serde(default)]
  owner:              Owner,
}

#[derive(Debug, Default, Deserialize)]
struct Owner {
  #[serde(default)]
  display_name: String,
}

// ─── Source ──────────────────────────────────────────────────────────────────

/// Adapter over the Stack Exchange API, restricted to stackoverflow.com.
pub struct StackOverflowSource {
  client: Client,
  api:    String,
}

impl StackOverflowSource {
  pub fn new(client: Client) -> Self {
    Self { client, api: STACKOVERFLOW_API.to_owned() }
  }

  /// Point the adapter at a different API root.
  pub fn with_api(mut self, api: impl Into<String>) -> Self {
    self.api = api.into().trim_end_matches('/').to_owned();
    self
  }

  async fn fetch(&self, id: u64, filter: Option<&str>) -> Result<Option<Question>> {
    let mut request = self
      .client
      .get(format!("{}/2.3/questions/{id}", self.api))
      .query(&[("site", SITE)]);
    if let Some(filter) = filter {
      request = request.query(&[("filter", filter)]);
    }

    let response = request.send().await.map_err(|e| Error::unavailable(NAME, e))?;
    let status = response.status();
    if !status.is_success() {
      return Err(Error::SourceUnavailable {
        source_name: NAME,
        reason:      format!("question {id} returned {status}"),
      });
    }
    let page: QuestionsResponse =
      response.json().await.map_err(|e| Error::unavailable(NAME, e))?;
    Ok(page.items.into_iter().next())
  }
}

#[async_trait]
impl Source for StackOverflowSource {
  fn name(&self) -> &'static str { NAME }

  fn accepts(&self, url: &str) -> bool { parse_question(url).is_some() }

  async fn can_track(&self, url: &str) -> bool {
    let Some(id) = parse_question(url) else {
      return false;
    };
    match self.fetch(id, None).await {
      Ok(question) => question.is_some(),
      Err(e) => {
        tracing::debug!(url, error = %e, "stackoverflow question check failed");
        false
      }
    }
  }

  async fn updates_since(&self, url: &str, since: DateTime<Utc>) -> Result<Vec<UpdateRecord>> {
    let id = parse_question(url).ok_or_else(|| Error::UnsupportedLink {
      source_name: NAME,
      url:         url.to_owned(),
    })?;

    let question = self.fetch(id, Some("withbody")).await?.ok_or_else(|| {
      Error::SourceUnavailable { source_name: NAME, reason: format!("question {id} not found") }
    })?;

    let activity = DateTime::from_timestamp(question.last_activity_date, 0).ok_or_else(|| {
      Error::SourceUnavailable {
        source_name: NAME,
        reason:      format!("bad last_activity_date {}", question.last_activity_date),
      }
    })?;
    if activity <= since {
      return Ok(Vec::new());
    }

    Ok(vec![UpdateRecord {
      kind:       UpdateKind::QuestionActivity,
      author:     decode_entities(&question.owner.display_name),
      created_at: activity,
      title:      decode_entities(&question.title),
      preview:    html_preview(&question.body),
    }])
  }
}

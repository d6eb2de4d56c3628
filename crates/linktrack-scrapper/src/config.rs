//! Runtime configuration, deserialised from the TOML file and the process
//! environment (`BOT_HOST` arrives as `bot_host`, and so on).

use std::{path::PathBuf, time::Duration};

use linktrack_core::store::DEFAULT_BATCH_SIZE;
use linktrack_sources::{github::GITHUB_API, stackoverflow::STACKOVERFLOW_API};
use serde::Deserialize;

/// Which statement set the SQLite store runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum AccessType {
  /// Hand-written SQL.
  #[default]
  #[serde(rename = "SQL", alias = "sql")]
  Sql,
  /// Statements assembled by the query builder.
  #[serde(rename = "ORM", alias = "orm")]
  Orm,
}

/// How link updates travel to the bot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdatesTransport {
  #[default]
  #[serde(alias = "HTTP")]
  Http,
  #[serde(alias = "BUS", alias = "kafka")]
  Bus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScrapperConfig {
  #[serde(default = "default_host")]
  pub scrapper_host:       String,
  #[serde(default = "default_scrapper_port")]
  pub scrapper_port:       u16,
  #[serde(default = "default_host")]
  pub bot_host:            String,
  #[serde(default = "default_bot_port")]
  pub bot_port:            u16,

  /// Path of the SQLite database file.
  #[serde(default = "default_db_name")]
  pub db_name:             PathBuf,
  #[serde(default = "default_batch_size")]
  pub batch_size:          usize,
  #[serde(default)]
  pub access_type:         AccessType,
  #[serde(default = "default_check_interval")]
  pub check_interval_secs: u64,

  /// GitHub API token; anonymous requests are used when empty.
  #[serde(default)]
  pub git_key:             Option<String>,
  #[serde(default = "default_github_api")]
  pub github_api:          String,
  #[serde(default = "default_stackoverflow_api")]
  pub stackoverflow_api:   String,

  #[serde(default)]
  pub updates_transport:   UpdatesTransport,
  #[serde(default = "default_brokers")]
  pub brokers_addr:        String,
  #[serde(default = "default_topic")]
  pub update_topic:        String,
  #[serde(default = "default_partitions")]
  pub kafka_partitions:    i32,
}

fn default_host() -> String { "127.0.0.1".into() }
fn default_scrapper_port() -> u16 { 8080 }
fn default_bot_port() -> u16 { 8090 }
fn default_db_name() -> PathBuf { PathBuf::from("linktrack.db") }
fn default_batch_size() -> usize { DEFAULT_BATCH_SIZE }
fn default_check_interval() -> u64 { 60 }
fn default_github_api() -> String { GITHUB_API.into() }
fn default_stackoverflow_api() -> String { STACKOVERFLOW_API.into() }
fn default_brokers() -> String { "127.0.0.1:9092".into() }
fn default_topic() -> String { "link-updates".into() }
fn default_partitions() -> i32 { 1 }

impl ScrapperConfig {
  pub fn listen_addr(&self) -> String { format!("{}:{}", self.scrapper_host, self.scrapper_port) }

  /// The bot's `/updates` endpoint.
  pub fn updates_url(&self) -> String {
    format!("http://{}:{}/updates", self.bot_host, self.bot_port)
  }

  pub fn check_interval(&self) -> Duration { Duration::from_secs(self.check_interval_secs.max(1)) }
}

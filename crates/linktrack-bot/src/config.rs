//! Runtime configuration, deserialised from the TOML file and the process
//! environment (`BOT_TOKEN` arrives as `bot_token`, and so on).

use std::time::Duration;

use serde::Deserialize;

use crate::chat::TELEGRAM_API;

/// How link updates reach the bot.
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
pub struct BotConfig {
  pub bot_token:          String,
  #[serde(default = "default_host")]
  pub bot_host:           String,
  #[serde(default = "default_bot_port")]
  pub bot_port:           u16,
  #[serde(default = "default_host")]
  pub scrapper_host:      String,
  #[serde(default = "default_scrapper_port")]
  pub scrapper_port:      u16,
  #[serde(default = "default_telegram_api")]
  pub telegram_api:       String,

  #[serde(default = "default_poll_limit")]
  pub poll_limit:         usize,
  #[serde(default = "default_poll_interval")]
  pub poll_interval_secs: u64,
  /// Cache rendered `/list` replies in process.
  #[serde(default = "default_link_cache")]
  pub link_cache:         bool,
  /// Accepted for compatibility; the link cache is always in process.
  #[serde(default)]
  pub redis_addr:         Option<String>,

  #[serde(default)]
  pub updates_transport:  UpdatesTransport,
  #[serde(default = "default_brokers")]
  pub brokers_addr:       String,
  #[serde(default = "default_topic")]
  pub update_topic:       String,
  /// Defaults to `{update_topic}.dlq`.
  #[serde(default)]
  pub dead_letter_topic:  Option<String>,
  #[serde(default = "default_kafka_batch")]
  pub kafka_batch_size:   usize,
  #[serde(default = "default_partitions")]
  pub kafka_partitions:   i32,
}

fn default_host() -> String { "127.0.0.1".into() }
fn default_bot_port() -> u16 { 8090 }
fn default_scrapper_port() -> u16 { 8080 }
fn default_telegram_api() -> String { TELEGRAM_API.into() }
fn default_poll_limit() -> usize { 100 }
fn default_poll_interval() -> u64 { 5 }
fn default_link_cache() -> bool { true }
fn default_brokers() -> String { "127.0.0.1:9092".into() }
fn default_topic() -> String { "link-updates".into() }
fn default_kafka_batch() -> usize { 100 }
fn default_partitions() -> i32 { 1 }

impl BotConfig {
  pub fn listen_addr(&self) -> String { format!("{}:{}", self.bot_host, self.bot_port) }

  pub fn scrapper_url(&self) -> String {
    format!("http://{}:{}", self.scrapper_host, self.scrapper_port)
  }

  pub fn poll_interval(&self) -> Duration { Duration::from_secs(self.poll_interval_secs.max(1)) }

  pub fn dead_letter_topic(&self) -> String {
    self
      .dead_letter_topic
      .clone()
      .filter(|t| !t.is_empty())
      .unwrap_or_else(|| format!("{}.dlq", self.update_topic))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn load(pairs: &[(&str, &str)]) -> Result<BotConfig, config::ConfigError> {
    let mut builder = config::Config::builder();
    for (key, value) in pairs {
      builder = builder.set_override(*key, *value)?;
    }
    builder.build()?.try_deserialize()
  }

  #[test]
  fn token_is_required() {
    assert!(load(&[]).is_err());
  }

  #[test]
  fn defaults_fill_the_rest() {
    let cfg = load(&[("bot_token", "T")]).unwrap();
    assert_eq!(cfg.poll_limit, 100);
    assert_eq!(cfg.poll_interval(), Duration::from_secs(5));
    assert!(cfg.link_cache);
    assert_eq!(cfg.updates_transport, UpdatesTransport::Http);
    assert_eq!(cfg.scrapper_url(), "http://127.0.0.1:8080");
    assert_eq!(cfg.listen_addr(), "127.0.0.1:8090");
    assert_eq!(cfg.dead_letter_topic(), "link-updates.dlq");
  }

  #[test]
  fn bus_settings() {
    let cfg = load(&[
      ("bot_token", "T"),
      ("updates_transport", "bus"),
      ("update_topic", "updates"),
      ("dead_letter_topic", "updates-dead"),
      ("kafka_batch_size", "20"),
      ("redis_addr", "redis:6379"),
    ])
    .unwrap();
    assert_eq!(cfg.updates_transport, UpdatesTransport::Bus);
    assert_eq!(cfg.dead_letter_topic(), "updates-dead");
    assert_eq!(cfg.kafka_batch_size, 20);
  }
}

//! The chat platform: long-polled updates, outbound messages and command
//! registration over the Telegram Bot API.

use async_trait::async_trait;
use linktrack_core::ChatId;
use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{Error, Result};

pub const TELEGRAM_API: &str = "https://api.telegram.org";

/// One incoming update, reduced to what the dialog needs. Updates that carry
/// no message have neither chat nor text but still count toward the offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatUpdate {
  pub update_id: i64,
  pub chat_id:   Option<ChatId>,
  pub text:      Option<String>,
}

/// A command advertised in the chat client's menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BotCommand {
  pub command:     &'static str,
  pub description: &'static str,
}

#[async_trait]
pub trait ChatClient: Send + Sync {
  /// Updates with `update_id >= offset`, at most `limit` of them.
  async fn get_updates(&self, offset: i64, limit: usize) -> Result<Vec<ChatUpdate>>;

  async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<()>;

  async fn set_my_commands(&self, commands: &[BotCommand]) -> Result<()>;
}

// ─── Wire ────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct Envelope<T> {
  ok:          bool,
  #[serde(default)]
  description: Option<String>,
  result:      Option<T>,
}

#[derive(Deserialize)]
struct RawUpdate {
  update_id: i64,
  #[serde(default)]
  message:   Option<RawMessage>,
}

#[derive(Deserialize)]
struct RawMessage {
  chat: RawChat,
  #[serde(default)]
  text: Option<String>,
}

#[derive(Deserialize)]
struct RawChat {
  id: i64,
}

#[derive(Serialize)]
struct GetUpdates {
  offset:          i64,
  limit:           usize,
  timeout:         u32,
  allowed_updates: [&'static str; 1],
}

#[derive(Serialize)]
struct SendMessage<'a> {
  chat_id: i64,
  text:    &'a str,
}

#[derive(Serialize)]
struct SetMyCommands<'a> {
  commands: &'a [BotCommand],
}

// ─── Client ──────────────────────────────────────────────────────────────────

pub struct TelegramClient {
  client: Client,
  base:   String,
}

impl TelegramClient {
  /// `api` is the API root, e.g. [`TELEGRAM_API`].
  pub fn new(client: Client, api: &str, token: &str) -> Self {
    Self { client, base: format!("{}/bot{token}", api.trim_end_matches('/')) }
  }

  async fn call<B, T>(&self, method: &str, body: &B) -> Result<T>
  where
    B: Serialize + Sync,
    T: DeserializeOwned,
  {
    let response = self
      .client
      .post(format!("{}/{method}", self.base))
      .json(body)
      .send()
      .await?;
    let status = response.status();
    let envelope: Envelope<T> = response.json().await?;
    if !envelope.ok {
      return Err(Error::ChatApi(format!(
        "{method} failed ({status}): {}",
        envelope.description.unwrap_or_default()
      )));
    }
    envelope
      .result
      .ok_or_else(|| Error::ChatApi(format!("{method} returned no result")))
  }
}

#[async_trait]
impl ChatClient for TelegramClient {
  async fn get_updates(&self, offset: i64, limit: usize) -> Result<Vec<ChatUpdate>> {
    let request = GetUpdates { offset, limit, timeout: 0, allowed_updates: ["message"] };
    let raw: Vec<RawUpdate> = self.call("getUpdates", &request).await?;
    Ok(
      raw
        .into_iter()
        .map(|u| ChatUpdate {
          update_id: u.update_id,
          chat_id:   u.message.as_ref().map(|m| ChatId(m.chat.id)),
          text:      u.message.and_then(|m| m.text),
        })
        .collect(),
    )
  }

  async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<()> {
    let _: serde_json::Value = self
      .call("sendMessage", &SendMessage { chat_id: chat_id.0, text })
      .await?;
    Ok(())
  }

  async fn set_my_commands(&self, commands: &[BotCommand]) -> Result<()> {
    let _: bool = self.call("setMyCommands", &SetMyCommands { commands }).await?;
    Ok(())
  }
}

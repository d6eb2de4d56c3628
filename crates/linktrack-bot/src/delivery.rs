//! Fan a [`LinkUpdate`] out to its subscribers.

use linktrack_core::LinkUpdate;

use crate::chat::ChatClient;

pub fn render(update: &LinkUpdate) -> String {
  format!("{}\n{}", update.url, update.description)
}

/// Send `update` to every subscriber and return how many sends succeeded.
///
/// A failed send is logged and skipped; the remaining subscribers are
/// still notified.
pub async fn deliver<C: ChatClient + ?Sized>(chat: &C, update: &LinkUpdate) -> usize {
  let text = render(update);
  let mut sent = 0;
  for chat_id in &update.subscribers {
    match chat.send_message(*chat_id, &text).await {
      Ok(()) => sent += 1,
      Err(e) => {
        tracing::warn!(%chat_id, link_id = %update.id, error = %e, "failed to deliver update")
      }
    }
  }
  tracing::debug!(link_id = %update.id, sent, total = update.subscribers.len(), "update delivered");
  sent
}

#[cfg(test)]
pub(crate) mod testing {
  use std::sync::Mutex;

  use async_trait::async_trait;
  use linktrack_core::ChatId;

  use crate::{
    Error, Result,
    chat::{BotCommand, ChatClient, ChatUpdate},
  };

  /// Records outgoing messages and serves queued updates.
  #[derive(Default)]
  pub struct FakeChat {
    pub sent:    Mutex<Vec<(ChatId, String)>>,
    pub inbox:   Mutex<Vec<ChatUpdate>>,
    pub offsets: Mutex<Vec<i64>>,
    /// Sends to this chat fail.
    pub broken:  Option<ChatId>,
  }

  impl FakeChat {
    pub fn sent(&self) -> Vec<(ChatId, String)> { self.sent.lock().unwrap().clone() }
  }

  #[async_trait]
  impl ChatClient for FakeChat {
    async fn get_updates(&self, offset: i64, limit: usize) -> Result<Vec<ChatUpdate>> {
      self.offsets.lock().unwrap().push(offset);
      let mut inbox = self.inbox.lock().unwrap();
      inbox.retain(|u| u.update_id >= offset);
      Ok(inbox.iter().take(limit).cloned().collect())
    }

    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<()> {
      if self.broken == Some(chat_id) {
        return Err(Error::ChatApi("chat not found".into()));
      }
      self.sent.lock().unwrap().push((chat_id, text.to_owned()));
      Ok(())
    }

    async fn set_my_commands(&self, _commands: &[BotCommand]) -> Result<()> { Ok(()) }
  }
}

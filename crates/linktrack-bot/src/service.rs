//! The long-poll loop over the chat platform.
//!
//! Messages are handled one at a time, in the order the platform returns
//! them, so a chat's transitions follow its message order. Replies are sent
//! from spawned tasks and may arrive out of order.

use std::{sync::Arc, time::Duration};

use tokio::{
  sync::watch,
  time::{MissedTickBehavior, interval},
};

use crate::{
  Result,
  chat::ChatClient,
  handlers::Bot,
  subscriptions::SubscriptionClient,
};

pub struct Poller<C: ?Sized, Sub> {
  chat:   Arc<C>,
  bot:    Arc<Bot<Sub>>,
  limit:  usize,
  offset: i64,
}

impl<C, Sub> Poller<C, Sub>
where
  C: ChatClient + ?Sized + 'static,
  Sub: SubscriptionClient + 'static,
{
  pub fn new(chat: Arc<C>, bot: Arc<Bot<Sub>>, limit: usize) -> Self {
    Self { chat, bot, limit: limit.max(1), offset: 0 }
  }

  /// The next `update_id` to request.
  pub fn offset(&self) -> i64 { self.offset }

  /// Fetch one batch of updates and handle each. Returns how many were
  /// handled.
  pub async fn poll_once(&mut self) -> Result<usize> {
    let updates = self.chat.get_updates(self.offset, self.limit).await?;
    let count = updates.len();

    for update in updates {
      self.offset = self.offset.max(update.update_id + 1);
      let (Some(chat_id), Some(text)) = (update.chat_id, update.text) else {
        continue;
      };

      let replies = self.bot.handle(chat_id, &text).await;
      for reply in replies {
        let chat = self.chat.clone();
        tokio::spawn(async move {
          if let Err(e) = chat.send_message(chat_id, &reply).await {
            tracing::warn!(%chat_id, error = %e, "failed to send reply");
          }
        });
      }
    }
    Ok(count)
  }

  /// Poll every `period` until `shutdown` fires.
  pub async fn run(mut self, period: Duration, mut shutdown: watch::Receiver<()>) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::info!(period_secs = period.as_secs(), limit = self.limit, "poller started");

    loop {
      tokio::select! {
        _ = ticker.tick() => {
          match self.poll_once().await {
            Ok(0) => {}
            Ok(n) => tracing::debug!(updates = n, offset = self.offset, "updates handled"),
            Err(e) => tracing::warn!(error = %e, "failed to fetch updates"),
          }
        }
        _ = shutdown.changed() => {
          tracing::info!("poller shutting down");
          break;
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use async_trait::async_trait;
  use linktrack_core::{
    ChatId,
    api::{AddLinkRequest, LinkResponse, ListLinksResponse},
  };

  use super::*;
  use crate::{
    chat::ChatUpdate,
    delivery::testing::FakeChat,
    dialog::State,
    handlers::{ASK_URL, GREETING},
  };

  /// Accepts registration and nothing else.
  struct Registrar;

  #[async_trait]
  impl SubscriptionClient for Registrar {
    async fn register_chat(&self, _id: ChatId) -> Result<()> { Ok(()) }

    async fn delete_chat(&self, _id: ChatId) -> Result<()> { Ok(()) }

    async fn list_links(&self, _id: ChatId) -> Result<ListLinksResponse> {
      Ok(ListLinksResponse { links: Vec::new(), size: 0 })
    }

    async fn add_link(&self, _id: ChatId, request: &AddLinkRequest) -> Result<LinkResponse> {
      Err(linktrack_core::Error::UnsupportedLink(request.link.clone()).into())
    }

    async fn remove_link(&self, _id: ChatId, link: &str) -> Result<LinkResponse> {
      Err(linktrack_core::Error::LinkNotTracked(link.to_owned()).into())
    }
  }

  fn update(update_id: i64, chat: i64, text: Option<&str>) -> ChatUpdate {
    ChatUpdate { update_id, chat_id: Some(ChatId(chat)), text: text.map(str::to_owned) }
  }

  async fn wait_for_sends(chat: &FakeChat, n: usize) -> Vec<(ChatId, String)> {
    for _ in 0..100 {
      let sent = chat.sent();
      if sent.len() >= n {
        return sent;
      }
      tokio::time::sleep(Duration::from_millis(10)).await;
    }
    chat.sent()
  }

  #[tokio::test]
  async fn offset_advances_past_the_last_update() {
    let chat = Arc::new(FakeChat::default());
    chat.inbox.lock().unwrap().extend([
      update(10, 1, Some("/start")),
      update(11, 2, None),
      update(12, 1, Some("/track")),
    ]);
    let bot = Arc::new(Bot::new(Registrar, false));
    let mut poller = Poller::new(chat.clone(), bot.clone(), 100);

    assert_eq!(poller.poll_once().await.unwrap(), 3);
    assert_eq!(poller.offset(), 13);
    assert_eq!(bot.state(ChatId(1)), State::AwaitAddUrl);

    assert_eq!(poller.poll_once().await.unwrap(), 0);
    assert_eq!(*chat.offsets.lock().unwrap(), vec![0, 13]);

    let mut sent = wait_for_sends(&chat, 2).await;
    sent.sort();
    assert_eq!(
      sent,
      vec![(ChatId(1), ASK_URL.to_owned()), (ChatId(1), GREETING.to_owned())]
    );
  }

  #[tokio::test]
  async fn non_message_updates_still_advance_the_offset() {
    use axum::{Json, Router, routing::post};
    use serde_json::json;
    use tokio::net::TcpListener;

    use crate::chat::TelegramClient;

    let router = Router::new().route(
      "/botT/getUpdates",
      post(|| async {
        Json(json!({
          "ok": true,
          "result": [{ "update_id": 77, "edited_message": { "chat": { "id": 1 }, "text": "x" } }]
        }))
      }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

    let chat = Arc::new(TelegramClient::new(reqwest::Client::new(), &format!("http://{addr}"), "T"));
    let mut poller = Poller::new(chat, Arc::new(Bot::new(Registrar, false)), 100);

    assert_eq!(poller.poll_once().await.unwrap(), 1);
    assert_eq!(poller.offset(), 78);
    poller.poll_once().await.unwrap();
    assert_eq!(poller.offset(), 78);
  }

  #[tokio::test]
  async fn batch_of_only_non_messages_is_skipped_once() {
    let chat = Arc::new(FakeChat::default());
    chat.inbox.lock().unwrap().extend([
      ChatUpdate { update_id: 5, chat_id: None, text: None },
      ChatUpdate { update_id: 6, chat_id: None, text: None },
    ]);
    let mut poller = Poller::new(chat.clone(), Arc::new(Bot::new(Registrar, false)), 100);

    assert_eq!(poller.poll_once().await.unwrap(), 2);
    assert_eq!(poller.offset(), 7);
    assert_eq!(poller.poll_once().await.unwrap(), 0);
    assert!(chat.sent().is_empty());
  }

  #[tokio::test]
  async fn polls_through_a_shared_chat_client() {
    let fake = Arc::new(FakeChat::default());
    fake.inbox.lock().unwrap().push(update(3, 9, Some("/help")));
    let chat: Arc<dyn ChatClient> = fake.clone();
    let mut poller: Poller<dyn ChatClient, _> =
      Poller::new(chat, Arc::new(Bot::new(Registrar, false)), 100);

    assert_eq!(poller.poll_once().await.unwrap(), 1);
    assert_eq!(poller.offset(), 4);
    assert_eq!(wait_for_sends(&fake, 1).await.len(), 1);
  }

  #[tokio::test]
  async fn limit_caps_each_batch() {
    let chat = Arc::new(FakeChat::default());
    chat
      .inbox
      .lock()
      .unwrap()
      .extend((1..=3).map(|n| update(n, n, Some("/help"))));
    let mut poller = Poller::new(chat.clone(), Arc::new(Bot::new(Registrar, false)), 2);

    assert_eq!(poller.poll_once().await.unwrap(), 2);
    assert_eq!(poller.poll_once().await.unwrap(), 1);
    assert_eq!(poller.offset(), 4);
  }

  #[tokio::test]
  async fn run_stops_on_shutdown() {
    let chat = Arc::new(FakeChat::default());
    let poller = Poller::new(chat, Arc::new(Bot::new(Registrar, false)), 100);
    let (tx, rx) = watch::channel(());
    let task = tokio::spawn(poller.run(Duration::from_millis(10), rx));

    tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
  }
}

//! Link updates arriving over the message bus.
//!
//! Each record is decoded as a JSON [`LinkUpdate`] and fanned out to its
//! subscribers. Records that do not decode are republished verbatim to the
//! dead-letter topic and never retried.

use std::{sync::Arc, time::Duration};

use linktrack_bus::{Consumer, Message, Producer};
use linktrack_core::LinkUpdate;
use tokio::sync::watch;

use crate::{Result, chat::ChatClient, delivery};

/// Pause after a failed poll before asking the broker again.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// What became of one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
  /// Decoded; the count is the number of successful sends.
  Delivered(usize),
  DeadLettered,
}

pub struct UpdateConsumer<C, P> {
  consumer:    C,
  dead_letter: P,
  chat:        Arc<dyn ChatClient>,
}

impl<C: Consumer, P: Producer> UpdateConsumer<C, P> {
  pub fn new(consumer: C, dead_letter: P, chat: Arc<dyn ChatClient>) -> Self {
    Self { consumer, dead_letter, chat }
  }

  /// Consume until `shutdown` fires. The record batch in flight is finished
  /// first.
  pub async fn run(mut self, mut shutdown: watch::Receiver<()>) {
    tracing::info!("update consumer started");
    loop {
      tokio::select! {
        polled = self.consumer.poll() => match polled {
          Ok(messages) => {
            for message in messages {
              self.process(message).await;
            }
          }
          Err(e) => {
            tracing::warn!(error = %e, "failed to poll update topic");
            tokio::time::sleep(RETRY_DELAY).await;
          }
        },
        _ = shutdown.changed() => {
          tracing::info!("update consumer shutting down");
          break;
        }
      }
    }
  }

  /// Poll once and process whatever arrived.
  pub async fn poll_once(&mut self) -> Result<Vec<Outcome>> {
    let messages = self.consumer.poll().await?;
    let mut outcomes = Vec::with_capacity(messages.len());
    for message in messages {
      outcomes.push(self.process(message).await);
    }
    Ok(outcomes)
  }

  async fn process(&self, message: Message) -> Outcome {
    match serde_json::from_slice::<LinkUpdate>(&message.payload) {
      Ok(update) => Outcome::Delivered(delivery::deliver(self.chat.as_ref(), &update).await),
      Err(e) => {
        tracing::warn!(
          partition = message.partition,
          offset = message.offset,
          error = %e,
          "undecodable update; sending to dead-letter topic"
        );
        if let Err(e) = self.dead_letter.publish(message.payload).await {
          tracing::error!(error = %e, "failed to dead-letter update");
        }
        Outcome::DeadLettered
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use linktrack_bus::MemoryBus;
  use linktrack_core::{ChatId, LinkId};

  use super::*;
  use crate::delivery::testing::FakeChat;

  #[tokio::test]
  async fn good_records_are_delivered_and_bad_ones_dead_lettered() {
    let bus = MemoryBus::new();
    let producer = bus.producer("link-updates", 1);
    let chat = Arc::new(FakeChat::default());
    let mut consumer = UpdateConsumer::new(
      bus.consumer("link-updates"),
      bus.producer("link-updates.dlq", 1),
      chat.clone(),
    );

    let update = LinkUpdate {
      id:          LinkId(5),
      url:         "https://stackoverflow.com/questions/1".into(),
      description: "new answer".into(),
      subscribers: vec![ChatId(7)],
    };
    producer.publish(serde_json::to_vec(&update).unwrap()).await.unwrap();
    producer.publish(b"not json".to_vec()).await.unwrap();

    let outcomes = consumer.poll_once().await.unwrap();
    assert_eq!(outcomes, vec![Outcome::Delivered(1), Outcome::DeadLettered]);
    assert_eq!(
      chat.sent(),
      vec![(ChatId(7), "https://stackoverflow.com/questions/1\nnew answer".to_owned())]
    );
    assert_eq!(bus.messages("link-updates.dlq"), vec![b"not json".to_vec()]);
  }

  #[tokio::test]
  async fn run_stops_on_shutdown() {
    let bus = MemoryBus::new();
    let consumer = UpdateConsumer::new(
      bus.consumer("link-updates"),
      bus.producer("link-updates.dlq", 1),
      Arc::new(FakeChat::default()),
    );
    let (tx, rx) = watch::channel(());
    let task = tokio::spawn(consumer.run(rx));

    tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
  }
}

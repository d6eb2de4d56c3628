use async_trait::async_trait;
use linktrack_bus::Producer;
use linktrack_core::LinkUpdate;

use super::Transport;
use crate::error::TransportError;

/// Publishes each update as a JSON record on the update topic.
pub struct BusTransport<P> {
  producer: P,
}

impl<P: Producer> BusTransport<P> {
  pub fn new(producer: P) -> Self { Self { producer } }
}

#[async_trait]
impl<P: Producer> Transport for BusTransport<P> {
  async fn send(&self, update: &LinkUpdate) -> Result<(), TransportError> {
    let payload = serde_json::to_vec(update)?;
    self.producer.publish(payload).await?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use linktrack_bus::MemoryBus;
  use linktrack_core::{ChatId, LinkId};

  use super::*;

  #[tokio::test]
  async fn publishes_json_with_tg_chat_ids() {
    let bus = MemoryBus::new();
    let transport = BusTransport::new(bus.producer("link-updates", 1));

    let update = LinkUpdate {
      id:          LinkId(3),
      url:         "https://stackoverflow.com/questions/1".into(),
      description: "activity".into(),
      subscribers: vec![ChatId(1), ChatId(2)],
    };
    transport.send(&update).await.unwrap();

    let published = bus.messages("link-updates");
    assert_eq!(published.len(), 1);
    let json: serde_json::Value = serde_json::from_slice(&published[0]).unwrap();
    assert_eq!(json["tgChatIds"], serde_json::json!([1, 2]));
  }
}

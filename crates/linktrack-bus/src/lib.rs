//! Message-bus transport for link updates.
//!
//! [`Producer`] and [`Consumer`] hide the broker. [`kafka`] talks to a real
//! Kafka cluster; [`memory`] keeps topics in process and backs the tests.
//! Payloads are opaque bytes; callers own the encoding.

pub mod error;
pub mod kafka;
pub mod memory;

use async_trait::async_trait;

pub use error::{Error, Result};
pub use kafka::{KafkaConsumer, KafkaProducer, StartOffset};
pub use memory::MemoryBus;

/// One record read from a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
  pub partition: i32,
  pub offset:    i64,
  pub payload:   Vec<u8>,
}

/// Write side of a topic.
#[async_trait]
pub trait Producer: Send + Sync {
  /// Append `payload` to the topic. Partitions are chosen round-robin.
  async fn publish(&self, payload: Vec<u8>) -> Result<()>;
}

/// Read side of a topic.
///
/// A consumer tracks its own position; each record is returned once.
#[async_trait]
pub trait Consumer: Send {
  /// Wait briefly for new records and return those available, possibly
  /// none.
  async fn poll(&mut self) -> Result<Vec<Message>>;
}

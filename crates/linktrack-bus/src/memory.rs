//! In-process bus: topics are shared logs behind a mutex.

use std::{
  collections::HashMap,
  sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
  },
  time::Duration,
};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::{Consumer, Error, Message, Producer, Result};

const POLL_WAIT: Duration = Duration::from_millis(200);

#[derive(Default)]
struct Topic {
  partitions: Vec<Vec<Vec<u8>>>,
}

#[derive(Default)]
struct Inner {
  topics: Mutex<HashMap<String, Topic>>,
  notify: Notify,
}

/// A set of in-memory topics. Cloning shares the topics.
#[derive(Clone, Default)]
pub struct MemoryBus {
  inner: Arc<Inner>,
}

impl MemoryBus {
  pub fn new() -> Self { Self::default() }

  /// A producer for `topic`, creating it with `partitions` partitions if it
  /// does not exist yet.
  pub fn producer(&self, topic: &str, partitions: usize) -> MemoryProducer {
    self.ensure(topic, partitions);
    MemoryProducer {
      bus:   self.clone(),
      topic: topic.to_owned(),
      next:  AtomicUsize::new(0),
    }
  }

  /// A consumer reading `topic` from the beginning.
  pub fn consumer(&self, topic: &str) -> MemoryConsumer {
    self.ensure(topic, 1);
    MemoryConsumer { bus: self.clone(), topic: topic.to_owned(), offsets: Vec::new() }
  }

  /// Every payload in `topic`, partition by partition.
  pub fn messages(&self, topic: &str) -> Vec<Vec<u8>> {
    let Ok(topics) = self.inner.topics.lock() else {
      return Vec::new();
    };
    topics
      .get(topic)
      .map(|t| t.partitions.concat())
      .unwrap_or_default()
  }

  fn ensure(&self, topic: &str, partitions: usize) {
    if let Ok(mut topics) = self.inner.topics.lock() {
      let entry = topics.entry(topic.to_owned()).or_default();
      if entry.partitions.len() < partitions.max(1) {
        entry.partitions.resize_with(partitions.max(1), Vec::new);
      }
    }
  }
}

// ─── Producer ────────────────────────────────────────────────────────────────

pub struct MemoryProducer {
  bus:   MemoryBus,
  topic: String,
  next:  AtomicUsize,
}

#[async_trait]
impl Producer for MemoryProducer {
  async fn publish(&self, payload: Vec<u8>) -> Result<()> {
    {
      let mut topics = self.bus.inner.topics.lock().map_err(|_| Error::Closed)?;
      let topic = topics.entry(self.topic.clone()).or_default();
      if topic.partitions.is_empty() {
        topic.partitions.push(Vec::new());
      }
      let slot = self.next.fetch_add(1, Ordering::Relaxed) % topic.partitions.len();
      topic.partitions[slot].push(payload);
    }
    self.bus.inner.notify.notify_waiters();
    Ok(())
  }
}

// ─── Consumer ────────────────────────────────────────────────────────────────

pub struct MemoryConsumer {
  bus:     MemoryBus,
  topic:   String,
  offsets: Vec<usize>,
}

impl MemoryConsumer {
  fn drain(&mut self) -> Result<Vec<Message>> {
    let topics = self.bus.inner.topics.lock().map_err(|_| Error::Closed)?;
    let Some(topic) = topics.get(&self.topic) else {
      return Ok(Vec::new());
    };
    if self.offsets.len() < topic.partitions.len() {
      self.offsets.resize(topic.partitions.len(), 0);
    }

    let mut messages = Vec::new();
    for (partition, log) in topic.partitions.iter().enumerate() {
      let start = self.offsets[partition];
      for (offset, payload) in log.iter().enumerate().skip(start) {
        messages.push(Message {
          partition: partition as i32,
          offset:    offset as i64,
          payload:   payload.clone(),
        });
      }
      self.offsets[partition] = log.len();
    }
    Ok(messages)
  }
}

#[async_trait]
impl Consumer for MemoryConsumer {
  async fn poll(&mut self) -> Result<Vec<Message>> {
    let bus = self.bus.clone();
    let notified = bus.inner.notify.notified();
    let ready = self.drain()?;
    if !ready.is_empty() {
      return Ok(ready);
    }
    let _ = tokio::time::timeout(POLL_WAIT, notified).await;
    self.drain()
  }
}

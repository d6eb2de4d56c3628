//! Kafka-backed [`Producer`] and [`Consumer`] built on `rskafka`.

use std::{
  collections::BTreeMap,
  sync::atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::Utc;
use rskafka::{
  client::{
    Client, ClientBuilder,
    error::{Error as ClientError, ProtocolError},
    partition::{Compression, OffsetAt, PartitionClient, UnknownTopicHandling},
  },
  record::Record,
};

use crate::{Consumer, Error, Message, Producer, Result};

const CREATE_TIMEOUT_MS: i32 = 5_000;
const REPLICATION_FACTOR: i16 = 1;
const FETCH_MAX_BYTES: i32 = 1_000_000;
const FETCH_MAX_WAIT_MS: i32 = 500;

/// Connect to the cluster at `brokers` (`host:port`, comma separated).
pub async fn connect(brokers: &str) -> Result<Client> {
  let brokers = brokers
    .split(',')
    .map(str::trim)
    .filter(|b| !b.is_empty())
    .map(str::to_owned)
    .collect();
  Ok(ClientBuilder::new(brokers).build().await?)
}

/// Create `topic` with `partitions` partitions unless it already exists.
pub async fn ensure_topic(client: &Client, topic: &str, partitions: i32) -> Result<()> {
  let controller = client.controller_client()?;
  match controller
    .create_topic(topic, partitions, REPLICATION_FACTOR, CREATE_TIMEOUT_MS)
    .await
  {
    Ok(()) => {
      tracing::info!(topic, partitions, "created topic");
      Ok(())
    }
    Err(ClientError::ServerError { protocol_error: ProtocolError::TopicAlreadyExists, .. }) => {
      Ok(())
    }
    Err(e) => Err(e.into()),
  }
}

async fn partition_clients(
  client: &Client,
  topic: &str,
  partitions: i32,
) -> Result<Vec<PartitionClient>> {
  if partitions < 1 {
    return Err(Error::NoPartitions { topic: topic.to_owned() });
  }
  let mut clients = Vec::with_capacity(partitions as usize);
  for partition in 0..partitions {
    clients.push(
      client
        .partition_client(topic, partition, UnknownTopicHandling::Retry)
        .await?,
    );
  }
  Ok(clients)
}

// ─── Producer ────────────────────────────────────────────────────────────────

/// Publishes to one topic, spreading records round-robin over its
/// partitions.
pub struct KafkaProducer {
  topic:      String,
  partitions: Vec<PartitionClient>,
  next:       AtomicUsize,
}

impl KafkaProducer {
  /// Bootstrap `topic` and open a client for each of its partitions.
  pub async fn new(client: &Client, topic: &str, partitions: i32) -> Result<Self> {
    ensure_topic(client, topic, partitions).await?;
    Ok(Self {
      topic:      topic.to_owned(),
      partitions: partition_clients(client, topic, partitions).await?,
      next:       AtomicUsize::new(0),
    })
  }

  pub fn topic(&self) -> &str { &self.topic }
}

#[async_trait]
impl Producer for KafkaProducer {
  async fn publish(&self, payload: Vec<u8>) -> Result<()> {
    let slot = self.next.fetch_add(1, Ordering::Relaxed) % self.partitions.len();
    let record = Record {
      key:       None,
      value:     Some(payload),
      headers:   BTreeMap::new(),
      timestamp: Utc::now(),
    };
    self.partitions[slot]
      .produce(vec![record], Compression::NoCompression)
      .await?;
    Ok(())
  }
}

// ─── Consumer ────────────────────────────────────────────────────────────────

/// Where a fresh consumer starts reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StartOffset {
  Earliest,
  #[default]
  Latest,
}

struct Cursor {
  client: PartitionClient,
  offset: i64,
}

/// Reads every partition of one topic, keeping its position in memory.
pub struct KafkaConsumer {
  cursors:   Vec<Cursor>,
  max_batch: usize,
}

impl KafkaConsumer {
  /// Open `topic` and position each partition at `start`. At most
  /// `max_batch` records are returned per poll.
  pub async fn new(
    client: &Client,
    topic: &str,
    partitions: i32,
    start: StartOffset,
    max_batch: usize,
  ) -> Result<Self> {
    ensure_topic(client, topic, partitions).await?;
    let at = match start {
      StartOffset::Earliest => OffsetAt::Earliest,
      StartOffset::Latest => OffsetAt::Latest,
    };
    let mut cursors = Vec::new();
    for client in partition_clients(client, topic, partitions).await? {
      let offset = client.get_offset(at).await?;
      cursors.push(Cursor { client, offset });
    }
    Ok(Self { cursors, max_batch: max_batch.max(1) })
  }
}

/// Records at or past `from`, at most `room` of them, and the offset to
/// resume `partition` from afterwards.
fn take_batch(
  partition: i32,
  from: i64,
  room: usize,
  records: impl IntoIterator<Item = (i64, Option<Vec<u8>>)>,
) -> (Vec<Message>, i64) {
  let mut resume = from;
  let batch = records
    .into_iter()
    .filter(|(offset, _)| *offset >= from)
    .take(room)
    .map(|(offset, payload)| {
      resume = offset + 1;
      Message { partition, offset, payload: payload.unwrap_or_default() }
    })
    .collect();
  (batch, resume)
}

#[async_trait]
impl Consumer for KafkaConsumer {
  /// Cursors move only after every partition has been fetched, so a poll
  /// that fails or is dropped part way returns the same records next time.
  async fn poll(&mut self) -> Result<Vec<Message>> {
    let mut messages = Vec::new();
    let mut next: Vec<i64> = self.cursors.iter().map(|c| c.offset).collect();

    for (cursor, resume) in self.cursors.iter().zip(next.iter_mut()) {
      let room = self.max_batch.saturating_sub(messages.len());
      if room == 0 {
        break;
      }
      let (records, _high_watermark) = cursor
        .client
        .fetch_records(cursor.offset, 1..FETCH_MAX_BYTES, FETCH_MAX_WAIT_MS)
        .await?;

      let (batch, offset) = take_batch(
        cursor.client.partition(),
        cursor.offset,
        room,
        records.into_iter().map(|r| (r.offset, r.record.value)),
      );
      messages.extend(batch);
      *resume = offset;
    }

    for (cursor, offset) in self.cursors.iter_mut().zip(next) {
      cursor.offset = offset;
    }
    Ok(messages)
  }
}

//! Error type for `linktrack-bus`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("kafka error: {0}")]
  Kafka(#[from] rskafka::client::error::Error),

  #[error("topic {topic} has no partitions configured")]
  NoPartitions { topic: String },

  #[error("bus closed")]
  Closed,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

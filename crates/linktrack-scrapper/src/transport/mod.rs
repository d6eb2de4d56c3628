//! Delivery of [`LinkUpdate`]s from the scrapper to the bot.
//!
//! Both transports carry the same JSON payload; which one runs is chosen by
//! `updates_transport` in the configuration.

mod bus;
mod http;

use async_trait::async_trait;
use linktrack_core::LinkUpdate;

pub use bus::BusTransport;
pub use http::HttpTransport;

use crate::error::TransportError;

#[async_trait]
pub trait Transport: Send + Sync {
  async fn send(&self, update: &LinkUpdate) -> Result<(), TransportError>;
}

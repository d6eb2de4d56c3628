//! The chat bot: a per-chat dialog over the chat platform, a client for the
//! scrapper's subscription API, and the receiving end of link updates.
//!
//! # Wiring
//!
//! ```rust,ignore
//! let bot = Arc::new(Bot::new(ScrapperClient::new(client, url), true));
//! let poller = Poller::new(chat.clone(), bot, cfg.poll_limit);
//! tokio::spawn(poller.run(cfg.poll_interval(), shutdown));
//! axum::serve(listener, updates::router(chat)).await?;
//! ```

pub mod cache;
pub mod chat;
pub mod config;
pub mod consumer;
pub mod context;
pub mod delivery;
pub mod dialog;
pub mod error;
pub mod fsm;
pub mod handlers;
pub mod service;
pub mod subscriptions;
pub mod updates;

pub use chat::{ChatClient, TelegramClient};
pub use config::BotConfig;
pub use consumer::UpdateConsumer;
pub use error::{Error, Result};
pub use handlers::Bot;
pub use service::Poller;
pub use subscriptions::{ScrapperClient, SubscriptionClient};

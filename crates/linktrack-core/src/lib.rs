//! Core types and trait definitions for the link tracker.
//!
//! This crate has no HTTP or database dependencies.
//! The scrapper, the bot and every backend depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod api;
pub mod error;
pub mod link;
pub mod store;
pub mod update;

pub use error::{Error, Result};
pub use link::{ChatId, LinkId, LinkInfo};
pub use update::{LinkUpdate, UpdateKind, UpdateRecord};

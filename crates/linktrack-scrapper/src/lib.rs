//! The scrapper: subscription REST API, periodic link scan, and delivery of
//! link updates to the bot.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = linktrack_scrapper::router(AppState::new(store, sources));
//! ```

pub mod chats;
pub mod config;
pub mod error;
pub mod links;
pub mod notifier;
pub mod scheduler;
pub mod transport;

use std::sync::Arc;

use axum::{Router, routing::post};
use linktrack_core::store::SubscriptionStore;
use linktrack_sources::Source;
use tower_http::trace::TraceLayer;

pub use config::ScrapperConfig;
pub use error::{ApiError, TransportError};
pub use notifier::Notifier;
pub use scheduler::Scrapper;

/// Site adapters in the order they are consulted.
pub type Sources = Arc<[Arc<dyn Source>]>;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:   Arc<S>,
  pub sources: Sources,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), sources: self.sources.clone() }
  }
}

impl<S> AppState<S> {
  pub fn new(store: Arc<S>, sources: Sources) -> Self { Self { store, sources } }

  /// The first source able to track `url`, if any.
  pub async fn source_for(&self, url: &str) -> Option<&Arc<dyn Source>> {
    for source in self.sources.iter() {
      if source.can_track(url).await {
        return Some(source);
      }
    }
    None
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the subscription API router.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: SubscriptionStore + 'static,
{
  Router::new()
    .route("/tg-chat/{id}", post(chats::register::<S>).delete(chats::delete::<S>))
    .route(
      "/links",
      post(links::add::<S>)
        .get(links::list::<S>)
        .delete(links::remove::<S>),
    )
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

//! Rendered `/list` replies, keyed by chat.
//!
//! Entries never expire; they are invalidated whenever the chat adds or
//! removes a link. Running without the cache only costs an extra API call.

use std::{collections::HashMap, sync::Mutex};

use linktrack_core::ChatId;

#[derive(Default)]
pub struct LinkCache {
  entries: Mutex<HashMap<ChatId, String>>,
}

impl LinkCache {
  pub fn new() -> Self { Self::default() }

  pub fn get(&self, id: ChatId) -> Option<String> {
    self.entries.lock().ok()?.get(&id).cloned()
  }

  pub fn set(&self, id: ChatId, text: String) {
    if let Ok(mut entries) = self.entries.lock() {
      entries.insert(id, text);
    }
  }

  pub fn invalidate(&self, id: ChatId) {
    match self.entries.lock() {
      Ok(mut entries) => {
        entries.remove(&id);
      }
      Err(_) => tracing::warn!(chat_id = %id, "link cache poisoned; entry may be stale"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn set_get_invalidate() {
    let cache = LinkCache::new();
    assert_eq!(cache.get(ChatId(1)), None);

    cache.set(ChatId(1), "list".into());
    assert_eq!(cache.get(ChatId(1)).as_deref(), Some("list"));
    assert_eq!(cache.get(ChatId(2)), None);

    cache.invalidate(ChatId(1));
    assert_eq!(cache.get(ChatId(1)), None);
  }
}

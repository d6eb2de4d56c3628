//! Per-chat dialog scratchpad.
//!
//! Lives only as long as the process. A half-finished `/track` dialog is
//! lost on restart and the user starts over.

use std::{collections::HashMap, sync::Mutex};

use linktrack_core::ChatId;

use crate::{Error, Result};

/// What a chat has entered so far in the current `/track` dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialogContext {
  pub pending_url: Option<String>,
  pub tags:        Vec<String>,
  pub filters:     Vec<String>,
}

#[derive(Default)]
pub struct ContextStore {
  inner: Mutex<HashMap<ChatId, DialogContext>>,
}

impl ContextStore {
  pub fn new() -> Self { Self::default() }

  /// Create an empty context. Fails if `id` already has one.
  pub fn reg_user(&self, id: ChatId) -> Result<()> {
    self.with(|map| {
      if map.contains_key(&id) {
        return Err(Error::AlreadyRegistered(id));
      }
      map.insert(id, DialogContext::default());
      Ok(())
    })
  }

  pub fn set_url(&self, id: ChatId, url: impl Into<String>) -> Result<()> {
    let url = url.into();
    self.update(id, |ctx| ctx.pending_url = Some(url))
  }

  pub fn add_tags(&self, id: ChatId, tags: impl IntoIterator<Item = String>) -> Result<()> {
    self.update(id, |ctx| ctx.tags.extend(tags))
  }

  pub fn add_filters(&self, id: ChatId, filters: impl IntoIterator<Item = String>) -> Result<()> {
    self.update(id, |ctx| ctx.filters.extend(filters))
  }

  /// Clear the pending dialog, keeping the chat registered.
  pub fn reset(&self, id: ChatId) -> Result<()> {
    self.update(id, |ctx| *ctx = DialogContext::default())
  }

  pub fn get(&self, id: ChatId) -> Result<DialogContext> {
    self.with(|map| map.get(&id).cloned().ok_or(Error::DialogNotInitialized(id)))
  }

  fn update(&self, id: ChatId, f: impl FnOnce(&mut DialogContext)) -> Result<()> {
    self.with(|map| {
      let ctx = map.get_mut(&id).ok_or(Error::DialogNotInitialized(id))?;
      f(ctx);
      Ok(())
    })
  }

  fn with<T>(&self, f: impl FnOnce(&mut HashMap<ChatId, DialogContext>) -> Result<T>) -> Result<T> {
    // Entries are only ever replaced whole; a poisoned map is still consistent.
    let mut map = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    f(&mut map)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn second_registration_fails() {
    let store = ContextStore::new();
    store.reg_user(ChatId(1)).unwrap();
    assert!(matches!(store.reg_user(ChatId(1)), Err(Error::AlreadyRegistered(_))));
  }

  #[test]
  fn mutators_require_registration() {
    let store = ContextStore::new();
    assert!(matches!(store.set_url(ChatId(1), "u"), Err(Error::DialogNotInitialized(_))));
    assert!(matches!(store.add_tags(ChatId(1), vec![]), Err(Error::DialogNotInitialized(_))));
    assert!(matches!(store.reset(ChatId(1)), Err(Error::DialogNotInitialized(_))));
    assert!(matches!(store.get(ChatId(1)), Err(Error::DialogNotInitialized(_))));
  }

  #[test]
  fn dialog_accumulates_and_resets() {
    let store = ContextStore::new();
    store.reg_user(ChatId(1)).unwrap();
    store.set_url(ChatId(1), "https://github.com/o/r").unwrap();
    store.add_tags(ChatId(1), vec!["work".to_owned()]).unwrap();
    store.add_filters(ChatId(1), vec!["user:bob".to_owned()]).unwrap();

    let ctx = store.get(ChatId(1)).unwrap();
    assert_eq!(ctx.pending_url.as_deref(), Some("https://github.com/o/r"));
    assert_eq!(ctx.tags, vec!["work"]);
    assert_eq!(ctx.filters, vec!["user:bob"]);

    store.reset(ChatId(1)).unwrap();
    assert_eq!(store.get(ChatId(1)).unwrap(), DialogContext::default());
  }
}

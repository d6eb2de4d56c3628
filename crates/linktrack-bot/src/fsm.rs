//! A table-driven finite-state machine with one current state per chat.
//!
//! The table maps `(state, event)` to the next state. An optional wildcard
//! event is tried when the literal event has no entry, so named commands
//! keep priority over free text in every state.

use std::{
  collections::HashMap,
  fmt::Debug,
  hash::Hash,
  sync::Mutex,
};

use linktrack_core::ChatId;

use crate::{Error, Result};

pub struct StateMachine<S, E> {
  initial:  S,
  table:    HashMap<(S, E), S>,
  wildcard: Option<E>,
  current:  Mutex<HashMap<ChatId, S>>,
}

impl<S, E> StateMachine<S, E>
where
  S: Copy + Eq + Hash + Debug,
  E: Copy + Eq + Hash + Debug,
{
  pub fn builder(initial: S) -> Builder<S, E> {
    Builder { initial, table: HashMap::new(), wildcard: None }
  }

  /// The chat's current state; the initial state if it was never moved.
  pub fn state(&self, id: ChatId) -> S {
    self.lock().get(&id).copied().unwrap_or(self.initial)
  }

  /// Where `event` would lead from `state`, without moving anything.
  pub fn next(&self, state: S, event: E) -> Option<S> {
    self
      .table
      .get(&(state, event))
      .or_else(|| self.wildcard.and_then(|w| self.table.get(&(state, w))))
      .copied()
  }

  /// Apply `event` to the chat's current state.
  ///
  /// Fails with [`Error::EventDeclined`] when neither `event` nor the
  /// wildcard has an entry; the state is then left unchanged.
  pub fn transition(&self, id: ChatId, event: E) -> Result<S> {
    let mut current = self.lock();
    let state = current.get(&id).copied().unwrap_or(self.initial);
    let next = self.next(state, event).ok_or_else(|| Error::EventDeclined {
      state: format!("{state:?}"),
      event: format!("{event:?}"),
    })?;
    current.insert(id, next);
    Ok(next)
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ChatId, S>> {
    self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}

pub struct Builder<S, E> {
  initial:  S,
  table:    HashMap<(S, E), S>,
  wildcard: Option<E>,
}

impl<S, E> Builder<S, E>
where
  S: Copy + Eq + Hash + Debug,
  E: Copy + Eq + Hash + Debug,
{
  pub fn on(mut self, from: S, event: E, to: S) -> Self {
    self.table.insert((from, event), to);
    self
  }

  /// Add the same `event -> to` entry to every state in `from`.
  pub fn on_each(mut self, from: &[S], event: E, to: S) -> Self {
    for state in from {
      self.table.insert((*state, event), to);
    }
    self
  }

  /// The event tried when a literal event has no entry.
  pub fn wildcard(mut self, event: E) -> Self {
    self.wildcard = Some(event);
    self
  }

  pub fn build(self) -> StateMachine<S, E> {
    StateMachine {
      initial:  self.initial,
      table:    self.table,
      wildcard: self.wildcard,
      current:  Mutex::new(HashMap::new()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
  enum Light {
    Off,
    On,
  }

  #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
  enum Input {
    Press,
    Reset,
    Any,
  }

  fn machine() -> StateMachine<Light, Input> {
    StateMachine::builder(Light::Off)
      .on(Light::Off, Input::Press, Light::On)
      .on(Light::On, Input::Any, Light::Off)
      .on_each(&[Light::Off, Light::On], Input::Reset, Light::Off)
      .wildcard(Input::Any)
      .build()
  }

  #[test]
  fn unknown_chats_start_in_the_initial_state() {
    assert_eq!(machine().state(ChatId(1)), Light::Off);
  }

  #[test]
  fn literal_event_wins_over_wildcard() {
    let fsm = machine();
    fsm.transition(ChatId(1), Input::Press).unwrap();
    assert_eq!(fsm.transition(ChatId(1), Input::Reset).unwrap(), Light::Off);
  }

  #[test]
  fn wildcard_applies_when_nothing_else_does() {
    let fsm = machine();
    fsm.transition(ChatId(1), Input::Press).unwrap();
    assert_eq!(fsm.transition(ChatId(1), Input::Press).unwrap(), Light::Off);
  }

  #[test]
  fn declined_event_leaves_state_unchanged() {
    let fsm = machine();
    let err = fsm.transition(ChatId(1), Input::Any).unwrap_err();
    assert!(matches!(err, Error::EventDeclined { .. }), "{err:?}");
    assert_eq!(fsm.state(ChatId(1)), Light::Off);
  }

  #[test]
  fn chats_are_independent() {
    let fsm = machine();
    fsm.transition(ChatId(1), Input::Press).unwrap();
    assert_eq!(fsm.state(ChatId(1)), Light::On);
    assert_eq!(fsm.state(ChatId(2)), Light::Off);
  }
}

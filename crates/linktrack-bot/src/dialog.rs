//! The dialog alphabet and its transition table.
//!
//! ```text
//! Init           : /start -> Ready
//! Ready          : /start|/help|/list -> Ready ; /track -> AwaitAddUrl ; /untrack -> AwaitRemoveUrl
//! AwaitAddUrl    : (Ready commands) ; TEXT -> AwaitTag
//! AwaitTag       : (Ready commands) ; TEXT -> AwaitFilter
//! AwaitFilter    : (Ready commands) ; TEXT -> Ready
//! AwaitRemoveUrl : (Ready commands) ; TEXT -> Ready
//! ```

use crate::{Error, Result, chat::BotCommand, fsm::StateMachine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
  Init,
  Ready,
  AwaitRemoveUrl,
  AwaitAddUrl,
  AwaitTag,
  AwaitFilter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
  Start,
  Help,
  Track,
  Untrack,
  List,
  /// Any message that is not a command.
  Text,
}

/// Commands advertised to the chat platform at startup.
pub const COMMANDS: [BotCommand; 5] = [
  BotCommand { command: "start", description: "Начать работу с ботом" },
  BotCommand { command: "help", description: "Список команд" },
  BotCommand { command: "track", description: "Начать отслеживание ссылки" },
  BotCommand { command: "untrack", description: "Прекратить отслеживание ссылки" },
  BotCommand { command: "list", description: "Показать отслеживаемые ссылки" },
];

impl Event {
  /// Classify an incoming message.
  ///
  /// Text starting with `/` is a command; a `@botname` suffix is ignored.
  /// Commands outside the alphabet fail with [`Error::CommandNotFound`].
  pub fn classify(text: &str) -> Result<Event> {
    let text = text.trim();
    let Some(command) = text.strip_prefix('/') else {
      return Ok(Event::Text);
    };
    let word = command.split_whitespace().next().unwrap_or_default();
    let word = word.split('@').next().unwrap_or_default();
    match word {
      "start" => Ok(Event::Start),
      "help" => Ok(Event::Help),
      "track" => Ok(Event::Track),
      "untrack" => Ok(Event::Untrack),
      "list" => Ok(Event::List),
      _ => Err(Error::CommandNotFound(format!("/{word}"))),
    }
  }
}

const AFTER_START: [State; 5] = [
  State::Ready,
  State::AwaitAddUrl,
  State::AwaitTag,
  State::AwaitFilter,
  State::AwaitRemoveUrl,
];

/// Build the dialog state machine.
pub fn machine() -> StateMachine<State, Event> {
  StateMachine::builder(State::Init)
    .on(State::Init, Event::Start, State::Ready)
    .on_each(&AFTER_START, Event::Start, State::Ready)
    .on_each(&AFTER_START, Event::Help, State::Ready)
    .on_each(&AFTER_START, Event::List, State::Ready)
    .on_each(&AFTER_START, Event::Track, State::AwaitAddUrl)
    .on_each(&AFTER_START, Event::Untrack, State::AwaitRemoveUrl)
    .on(State::AwaitAddUrl, Event::Text, State::AwaitTag)
    .on(State::AwaitTag, Event::Text, State::AwaitFilter)
    .on(State::AwaitFilter, Event::Text, State::Ready)
    .on(State::AwaitRemoveUrl, Event::Text, State::Ready)
    .wildcard(Event::Text)
    .build()
}

// ─── Reply parsing ───────────────────────────────────────────────────────────

fn is_empty_marker(text: &str) -> bool {
  matches!(text.trim(), "" | "-" | "none")
}

/// Whitespace-separated tags; `none` or `-` means no tags.
pub fn parse_tags(text: &str) -> Vec<String> {
  if is_empty_marker(text) {
    return Vec::new();
  }
  text.split_whitespace().map(str::to_owned).collect()
}

/// Whitespace-separated `key:value` filters; `none` or `-` means none.
pub fn parse_filters(text: &str) -> Result<Vec<String>> {
  if is_empty_marker(text) {
    return Ok(Vec::new());
  }
  text
    .split_whitespace()
    .map(|token| match token.split_once(':') {
      Some((key, value)) if !key.is_empty() && !value.is_empty() => Ok(token.to_owned()),
      _ => Err(Error::InvalidFilter(token.to_owned())),
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use linktrack_core::ChatId;

  use super::*;

  #[test]
  fn classify_commands_and_text() {
    assert_eq!(Event::classify("/start").unwrap(), Event::Start);
    assert_eq!(Event::classify("  /list  ").unwrap(), Event::List);
    assert_eq!(Event::classify("/track@linkbot").unwrap(), Event::Track);
    assert_eq!(Event::classify("https://github.com/o/r").unwrap(), Event::Text);
    assert!(matches!(Event::classify("/frobnicate"), Err(Error::CommandNotFound(c)) if c == "/frobnicate"));
  }

  #[test]
  fn only_start_leaves_init() {
    let fsm = machine();
    for event in [Event::Help, Event::List, Event::Track, Event::Untrack, Event::Text] {
      assert!(fsm.transition(ChatId(1), event).is_err(), "{event:?}");
      assert_eq!(fsm.state(ChatId(1)), State::Init);
    }
    assert_eq!(fsm.transition(ChatId(1), Event::Start).unwrap(), State::Ready);
  }

  #[test]
  fn track_dialog_walks_every_await_state() {
    let fsm = machine();
    let id = ChatId(1);
    fsm.transition(id, Event::Start).unwrap();
    assert_eq!(fsm.transition(id, Event::Track).unwrap(), State::AwaitAddUrl);
    assert_eq!(fsm.transition(id, Event::Text).unwrap(), State::AwaitTag);
    assert_eq!(fsm.transition(id, Event::Text).unwrap(), State::AwaitFilter);
    assert_eq!(fsm.transition(id, Event::Text).unwrap(), State::Ready);
  }

  #[test]
  fn commands_short_circuit_a_pending_dialog() {
    let fsm = machine();
    let id = ChatId(1);
    fsm.transition(id, Event::Start).unwrap();
    fsm.transition(id, Event::Track).unwrap();
    fsm.transition(id, Event::Text).unwrap();
    assert_eq!(fsm.transition(id, Event::Untrack).unwrap(), State::AwaitRemoveUrl);
    assert_eq!(fsm.transition(id, Event::List).unwrap(), State::Ready);
  }

  #[test]
  fn text_in_ready_is_declined() {
    let fsm = machine();
    fsm.transition(ChatId(1), Event::Start).unwrap();
    assert!(matches!(fsm.transition(ChatId(1), Event::Text), Err(Error::EventDeclined { .. })));
    assert_eq!(fsm.state(ChatId(1)), State::Ready);
  }

  #[test]
  fn tags_and_filters() {
    assert_eq!(parse_tags("work  rust"), vec!["work", "rust"]);
    assert!(parse_tags("none").is_empty());
    assert!(parse_tags("-").is_empty());

    assert_eq!(parse_filters("user:bob lang:rust").unwrap(), vec!["user:bob", "lang:rust"]);
    assert!(parse_filters("none").unwrap().is_empty());
    assert!(matches!(parse_filters("user:bob oops"), Err(Error::InvalidFilter(t)) if t == "oops"));
  }
}

//! Per-state message handlers and the [`Bot`] that routes messages through
//! them and the dialog state machine.
//!
//! Handlers only produce reply texts. Sending them is the caller's job, so
//! a failed send can never leave a chat stuck in a state.

use linktrack_core::{ChatId, api::AddLinkRequest};

use crate::{
  Error, Result,
  cache::LinkCache,
  context::ContextStore,
  dialog::{self, Event, State},
  fsm::StateMachine,
  subscriptions::SubscriptionClient,
};

// ─── Canned replies ──────────────────────────────────────────────────────────

pub const GREETING: &str =
  "Привет! Я сообщаю об обновлениях репозиториев GitHub и вопросов Stack Overflow. Список команд: /help";
pub const NO_LINKS: &str = "У вас нет сохранённых ссылок.";
pub const LIST_HEADER: &str = "Отслеживаемые ссылки:";
pub const ASK_URL: &str = "Отправьте ссылку, которую нужно отслеживать.";
pub const ASK_TAGS: &str = "Отправьте теги через пробел или none, если теги не нужны.";
pub const ASK_FILTERS: &str =
  "Отправьте фильтры в формате key:value через пробел или none, если фильтры не нужны.";
pub const ASK_REMOVE_URL: &str = "Отправьте ссылку, которую нужно перестать отслеживать.";
pub const TRACKED: &str = "Ссылка добавлена:";
pub const UNTRACKED: &str = "Ссылка удалена:";
pub const NOT_SUPPORTED: &str =
  "Ссылка не поддерживается. Поддерживаются репозитории GitHub и вопросы Stack Overflow.";
pub const ALREADY_TRACKED: &str = "Вы уже отслеживаете эту ссылку.";
pub const NOT_TRACKED: &str = "Вы не отслеживаете эту ссылку.";
pub const BAD_FILTER: &str =
  "Фильтры должны иметь вид key:value. Начните заново с /track.";
pub const UNKNOWN_COMMAND: &str = "Неизвестная команда. Список команд: /help";
pub const START_FIRST: &str = "Сначала отправьте /start.";
pub const TRY_LATER: &str = "Не удалось выполнить запрос, попробуйте позже.";

pub fn help_text() -> String {
  let mut text = String::from("Доступные команды:");
  for command in dialog::COMMANDS {
    text.push_str(&format!("\n/{} - {}", command.command, command.description));
  }
  text
}

fn render_links(urls: &[String]) -> String {
  if urls.is_empty() {
    return NO_LINKS.to_owned();
  }
  let mut text = String::from(LIST_HEADER);
  for (n, url) in urls.iter().enumerate() {
    text.push_str(&format!("\n{}. {url}", n + 1));
  }
  text
}

// ─── Bot ─────────────────────────────────────────────────────────────────────

pub struct Bot<Sub> {
  subscriptions: Sub,
  contexts:      ContextStore,
  machine:       StateMachine<State, Event>,
  cache:         Option<LinkCache>,
}

impl<Sub: SubscriptionClient> Bot<Sub> {
  pub fn new(subscriptions: Sub, cache: bool) -> Self {
    Self {
      subscriptions,
      contexts: ContextStore::new(),
      machine: dialog::machine(),
      cache: cache.then(LinkCache::new),
    }
  }

  pub fn state(&self, id: ChatId) -> State { self.machine.state(id) }

  /// Process one incoming message and return the replies to send.
  ///
  /// The handler bound to the chat's current state runs first; the
  /// transition is taken afterwards even if the handler failed.
  pub async fn handle(&self, id: ChatId, text: &str) -> Vec<String> {
    let event = match Event::classify(text) {
      Ok(event) => event,
      Err(e) => {
        tracing::warn!(chat_id = %id, error = %e, "unknown command");
        return vec![UNKNOWN_COMMAND.to_owned()];
      }
    };

    let state = self.machine.state(id);
    let mut replies = Vec::new();
    if let Err(e) = self.dispatch(state, event, id, text.trim(), &mut replies).await {
      tracing::warn!(chat_id = %id, ?state, ?event, error = %e, "handler failed");
      if replies.is_empty() {
        replies.push(reply_for(&e).to_owned());
      }
    }

    match self.machine.transition(id, event) {
      Ok(next) => tracing::debug!(chat_id = %id, from = ?state, to = ?next, "transition"),
      Err(e) => tracing::warn!(chat_id = %id, error = %e, "event declined"),
    }
    replies
  }

  async fn dispatch(
    &self,
    state: State,
    event: Event,
    id: ChatId,
    text: &str,
    replies: &mut Vec<String>,
  ) -> Result<()> {
    match (state, event) {
      (_, Event::Start) => self.start(id, replies).await,
      (State::Init, _) => {
        replies.push(START_FIRST.to_owned());
        Ok(())
      }
      (_, Event::Help) => {
        replies.push(help_text());
        Ok(())
      }
      (_, Event::List) => self.list(id, replies).await,
      (_, Event::Track) => {
        self.contexts.reset(id)?;
        replies.push(ASK_URL.to_owned());
        Ok(())
      }
      (_, Event::Untrack) => {
        replies.push(ASK_REMOVE_URL.to_owned());
        Ok(())
      }
      (State::AwaitAddUrl, Event::Text) => {
        self.contexts.set_url(id, text)?;
        replies.push(ASK_TAGS.to_owned());
        Ok(())
      }
      (State::AwaitTag, Event::Text) => {
        self.contexts.add_tags(id, dialog::parse_tags(text))?;
        replies.push(ASK_FILTERS.to_owned());
        Ok(())
      }
      (State::AwaitFilter, Event::Text) => self.commit(id, text, replies).await,
      (State::AwaitRemoveUrl, Event::Text) => self.untrack(id, text, replies).await,
      (State::Ready, Event::Text) => {
        replies.push(UNKNOWN_COMMAND.to_owned());
        Ok(())
      }
    }
  }

  // ── Handlers ──────────────────────────────────────────────────────────────

  async fn start(&self, id: ChatId, replies: &mut Vec<String>) -> Result<()> {
    match self.contexts.reg_user(id) {
      Ok(()) | Err(Error::AlreadyRegistered(_)) => {}
      Err(e) => return Err(e),
    }
    match self.subscriptions.register_chat(id).await {
      Ok(()) | Err(Error::Subscription(linktrack_core::Error::UserAlreadyRegistered(_))) => {}
      Err(e) => return Err(e),
    }
    replies.push(GREETING.to_owned());
    Ok(())
  }

  async fn list(&self, id: ChatId, replies: &mut Vec<String>) -> Result<()> {
    if let Some(text) = self.cache.as_ref().and_then(|c| c.get(id)) {
      replies.push(text);
      return Ok(());
    }

    let response = self.subscriptions.list_links(id).await?;
    let urls: Vec<String> = response.links.into_iter().map(|l| l.url).collect();
    let text = render_links(&urls);
    if let Some(cache) = &self.cache {
      cache.set(id, text.clone());
    }
    replies.push(text);
    Ok(())
  }

  async fn commit(&self, id: ChatId, text: &str, replies: &mut Vec<String>) -> Result<()> {
    let filters = match dialog::parse_filters(text) {
      Ok(filters) => filters,
      Err(e) => {
        self.contexts.reset(id)?;
        replies.push(BAD_FILTER.to_owned());
        return Err(e);
      }
    };
    self.contexts.add_filters(id, filters)?;

    let ctx = self.contexts.get(id)?;
    self.contexts.reset(id)?;
    let Some(link) = ctx.pending_url else {
      replies.push(ASK_URL.to_owned());
      return Err(Error::DialogNotInitialized(id));
    };

    let request = AddLinkRequest {
      link,
      tags: Some(ctx.tags),
      filters: Some(ctx.filters),
    };
    let added = self.subscriptions.add_link(id, &request).await?;
    self.invalidate(id);
    tracing::info!(chat_id = %id, url = %added.url, "link tracked");
    replies.push(format!("{TRACKED} {}", added.url));
    Ok(())
  }

  async fn untrack(&self, id: ChatId, text: &str, replies: &mut Vec<String>) -> Result<()> {
    let removed = self.subscriptions.remove_link(id, text).await?;
    self.invalidate(id);
    tracing::info!(chat_id = %id, url = %removed.url, "link untracked");
    replies.push(format!("{UNTRACKED} {}", removed.url));
    Ok(())
  }

  fn invalidate(&self, id: ChatId) {
    if let Some(cache) = &self.cache {
      cache.invalidate(id);
    }
  }
}

/// The reply shown when a handler fails without answering itself.
fn reply_for(error: &Error) -> &'static str {
  use linktrack_core::Error as Api;
  match error {
    Error::Subscription(Api::UnsupportedLink(_)) => NOT_SUPPORTED,
    Error::Subscription(Api::LinkAlreadyTracked(_)) => ALREADY_TRACKED,
    Error::Subscription(Api::LinkNotTracked(_)) => NOT_TRACKED,
    Error::Subscription(Api::UserNotRegistered(_)) | Error::DialogNotInitialized(_) => START_FIRST,
    _ => TRY_LATER,
  }
}

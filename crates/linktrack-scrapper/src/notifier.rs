//! Fan-out of a changed link to its subscribers.

use std::sync::Arc;

use linktrack_core::{LinkInfo, LinkUpdate, UpdateRecord, store::SubscriptionStore};

use crate::transport::Transport;

pub struct Notifier<S> {
  store:     Arc<S>,
  transport: Arc<dyn Transport>,
}

impl<S> Clone for Notifier<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), transport: self.transport.clone() }
  }
}

impl<S: SubscriptionStore> Notifier<S> {
  pub fn new(store: Arc<S>, transport: Arc<dyn Transport>) -> Self { Self { store, transport } }

  /// Emit one [`LinkUpdate`] per record to every chat tracking `link`.
  ///
  /// Returns how many updates the transport accepted. Delivery failures are
  /// logged and do not stop the remaining records.
  pub async fn send(
    &self,
    link: &LinkInfo,
    records: &[UpdateRecord],
  ) -> Result<usize, linktrack_core::Error> {
    let subscribers = self.store.users_tracking(link.link_id).await.map_err(Into::into)?;
    if subscribers.is_empty() {
      tracing::debug!(url = %link.url, "no subscribers left; dropping updates");
      return Ok(0);
    }

    let mut delivered = 0;
    for record in records {
      let update = LinkUpdate {
        id:          link.link_id,
        url:         link.url.clone(),
        description: record.describe(),
        subscribers: subscribers.clone(),
      };
      match self.transport.send(&update).await {
        Ok(()) => delivered += 1,
        Err(e) => tracing::warn!(url = %link.url, error = %e, "failed to deliver update"),
      }
    }
    Ok(delivered)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use async_trait::async_trait;
  use chrono::{TimeZone, Utc};
  use linktrack_core::{ChatId, UpdateKind};
  use linktrack_store_sqlite::SqliteStore;

  use super::*;
  use crate::error::TransportError;

  const REPO: &str = "https://github.com/o/r";

  /// Records every update, refusing those whose description contains
  /// `refuse`.
  #[derive(Default)]
  struct Recorder {
    refuse: Option<&'static str>,
    sent:   Mutex<Vec<LinkUpdate>>,
  }

  #[async_trait]
  impl Transport for Recorder {
    async fn send(&self, update: &LinkUpdate) -> Result<(), TransportError> {
      if self.refuse.is_some_and(|r| update.description.contains(r)) {
        return Err(TransportError::TransportFailed(503));
      }
      self.sent.lock().unwrap().push(update.clone());
      Ok(())
    }
  }

  fn record(title: &str) -> UpdateRecord {
    UpdateRecord {
      kind:       UpdateKind::Issue,
      author:     "octocat".into(),
      created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
      title:      title.into(),
      preview:    String::new(),
    }
  }

  async fn tracked_by(chats: &[i64]) -> (Arc<SqliteStore>, LinkInfo) {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let now = Utc::now();
    let mut link_id = None;
    for chat in chats {
      link_id = Some(store.track_link(ChatId(*chat), REPO, now).await.unwrap());
    }
    let link = LinkInfo { link_id: link_id.unwrap(), url: REPO.into(), last_check: now };
    (store, link)
  }

  #[tokio::test]
  async fn every_record_reaches_every_subscriber() {
    let (store, link) = tracked_by(&[1, 2]).await;
    let recorder = Arc::new(Recorder::default());
    let notifier = Notifier::new(store, recorder.clone());

    let records = [record("first"), record("second"), record("third")];
    assert_eq!(notifier.send(&link, &records).await.unwrap(), 3);

    let sent = recorder.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 3);
    for (update, title) in sent.iter().zip(["first", "second", "third"]) {
      assert_eq!(update.id, link.link_id);
      assert_eq!(update.url, REPO);
      assert!(update.description.contains(title), "{}", update.description);
      let mut subscribers = update.subscribers.clone();
      subscribers.sort();
      assert_eq!(subscribers, vec![ChatId(1), ChatId(2)]);
    }
  }

  #[tokio::test]
  async fn refused_record_does_not_stop_the_rest() {
    let (store, link) = tracked_by(&[1, 2]).await;
    let recorder = Arc::new(Recorder { refuse: Some("second"), ..Default::default() });
    let notifier = Notifier::new(store, recorder.clone());

    let records = [record("first"), record("second"), record("third")];
    assert_eq!(notifier.send(&link, &records).await.unwrap(), 2);

    let sent = recorder.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].description.contains("first"));
    assert!(sent[1].description.contains("third"));
    assert!(sent.iter().all(|u| u.subscribers.len() == 2));
  }

  #[tokio::test]
  async fn nothing_is_sent_without_subscribers() {
    let (store, link) = tracked_by(&[1]).await;
    store.untrack_link(ChatId(1), REPO).await.unwrap();
    let recorder = Arc::new(Recorder::default());
    let notifier = Notifier::new(store, recorder.clone());

    assert_eq!(notifier.send(&link, &[record("first")]).await.unwrap(), 0);
    assert!(recorder.sent.lock().unwrap().is_empty());
  }
}

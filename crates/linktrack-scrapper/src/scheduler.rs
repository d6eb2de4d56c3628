//! The periodic scan over stale links.
//!
//! Each tick walks a fresh paginator, hands every link to the first source
//! that accepts it, records the check time, and forwards any new activity to
//! the [`Notifier`]. Ticks never overlap: the next one is admitted only after
//! the previous one returns.

use std::{sync::Arc, time::Duration};

use chrono::{SubsecRound, Utc};
use linktrack_core::{
  LinkInfo,
  store::{LinkPaginator, SubscriptionStore},
};
use tokio::{
  sync::watch,
  time::{MissedTickBehavior, interval},
};

use crate::{Sources, notifier::Notifier};

/// Counters reported at the end of a tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
  pub visited:  usize,
  pub skipped:  usize,
  pub changed:  usize,
  pub notified: usize,
  pub swept:    usize,
}

pub struct Scrapper<S> {
  store:    Arc<S>,
  sources:  Sources,
  notifier: Notifier<S>,
}

impl<S> Scrapper<S>
where
  S: SubscriptionStore + 'static,
{
  pub fn new(store: Arc<S>, sources: Sources, notifier: Notifier<S>) -> Self {
    Self { store, sources, notifier }
  }

  /// Run [`Self::tick`] every `period` until `shutdown` fires.
  pub async fn run(self, period: Duration, mut shutdown: watch::Receiver<()>) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tracing::info!(period_secs = period.as_secs(), "scheduler started");

    loop {
      tokio::select! {
        _ = ticker.tick() => {
          let report = self.tick().await;
          tracing::info!(
            visited = report.visited,
            skipped = report.skipped,
            changed = report.changed,
            notified = report.notified,
            swept = report.swept,
            "tick finished"
          );
        }
        _ = shutdown.changed() => {
          tracing::info!("scheduler shutting down");
          break;
        }
      }
    }
  }

  /// One scan over every stale link, followed by an orphan sweep.
  pub async fn tick(&self) -> TickReport {
    let mut report = TickReport::default();
    let mut paginator = self.store.new_paginator();

    loop {
      let batch = match paginator.next_batch().await {
        Ok(batch) => batch,
        Err(e) => {
          tracing::error!(error = %e, "failed to page links; abandoning tick");
          break;
        }
      };
      if batch.is_empty() {
        break;
      }
      for link in &batch {
        report.visited += 1;
        self.check(link, &mut report).await;
      }
    }

    match self.store.sweep_orphan_links().await {
      Ok(swept) => report.swept = swept,
      Err(e) => tracing::error!(error = %e, "orphan sweep failed"),
    }
    report
  }

  async fn check(&self, link: &LinkInfo, report: &mut TickReport) {
    for source in self.sources.iter() {
      if !source.can_track(&link.url).await {
        continue;
      }

      let now = Utc::now().trunc_subsecs(0);
      let records = match source.updates_since(&link.url, link.last_check).await {
        Ok(records) => records,
        Err(e) => {
          tracing::warn!(url = %link.url, source = source.name(), error = %e, "skipping link");
          report.skipped += 1;
          return;
        }
      };

      if let Err(e) = self.store.touch_last_check(&link.url, now).await {
        tracing::error!(url = %link.url, error = %e, "failed to record check time");
        report.skipped += 1;
        return;
      }
      if records.is_empty() {
        return;
      }

      report.changed += 1;
      match self.notifier.send(link, &records).await {
        Ok(sent) => report.notified += sent,
        Err(e) => tracing::error!(url = %link.url, error = %e, "failed to resolve subscribers"),
      }
      return;
    }

    tracing::warn!(url = %link.url, "no source accepts link");
    report.skipped += 1;
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use async_trait::async_trait;
  use chrono::{DateTime, Duration as ChronoDuration};
  use linktrack_core::{ChatId, LinkUpdate, UpdateKind, UpdateRecord};
  use linktrack_sources::Source;
  use linktrack_store_sqlite::SqliteStore;

  use super::*;
  use crate::{error::TransportError, transport::Transport};

  const SO: &str = "https://stackoverflow.com/questions/1";

  /// Accepts Stack Overflow URLs and reports one fixed record.
  struct FakeSource {
    fail:  bool,
    calls: Mutex<Vec<DateTime<Utc>>>,
  }

  #[async_trait]
  impl Source for FakeSource {
    fn name(&self) -> &'static str { "fake" }

    fn accepts(&self, url: &str) -> bool { url.starts_with("https://stackoverflow.com/") }

    async fn can_track(&self, url: &str) -> bool { self.accepts(url) }

    async fn updates_since(
      &self,
      _url: &str,
      since: DateTime<Utc>,
    ) -> linktrack_sources::Result<Vec<UpdateRecord>> {
      self.calls.lock().unwrap().push(since);
      if self.fail {
        return Err(linktrack_sources::Error::SourceUnavailable {
          source_name: "fake",
          reason:      "down".into(),
        });
      }
      Ok(vec![UpdateRecord {
        kind:       UpdateKind::QuestionActivity,
        author:     "bob".into(),
        created_at: Utc::now(),
        title:      "q".into(),
        preview:    "p".into(),
      }])
    }
  }

  #[derive(Default)]
  struct Recorder {
    sent: Mutex<Vec<LinkUpdate>>,
  }

  #[async_trait]
  impl Transport for Recorder {
    async fn send(&self, update: &LinkUpdate) -> Result<(), TransportError> {
      self.sent.lock().unwrap().push(update.clone());
      Ok(())
    }
  }

  type Fixture = (Scrapper<SqliteStore>, Arc<SqliteStore>, Arc<FakeSource>, Arc<Recorder>);

  async fn setup(fail: bool) -> Fixture {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let source = Arc::new(FakeSource { fail, calls: Mutex::default() });
    let recorder = Arc::new(Recorder::default());
    let sources: Sources = Arc::new([source.clone() as Arc<dyn Source>]);
    let notifier = Notifier::new(store.clone(), recorder.clone());
    (Scrapper::new(store.clone(), sources, notifier), store, source, recorder)
  }

  #[tokio::test]
  async fn stale_link_is_checked_touched_and_notified() {
    let (scrapper, store, source, recorder) = setup(false).await;
    let seeded = Utc::now().trunc_subsecs(0) - ChronoDuration::hours(1);
    store.track_link(ChatId(1), SO, seeded).await.unwrap();
    store.track_link(ChatId(2), SO, seeded).await.unwrap();

    let tick_start = Utc::now().trunc_subsecs(0);
    let report = scrapper.tick().await;

    assert_eq!(report.visited, 1);
    assert_eq!(report.changed, 1);
    assert_eq!(report.notified, 1);
    assert_eq!(*source.calls.lock().unwrap(), vec![seeded]);

    let sent = recorder.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].url, SO);
    let mut subscribers = sent[0].subscribers.clone();
    subscribers.sort();
    assert_eq!(subscribers, vec![ChatId(1), ChatId(2)]);

    let stored = store
      .transactor()
      .run(|conn| {
        Ok(conn.query_row(
          "SELECT last_update_check FROM links WHERE link_url = ?1",
          [SO],
          |row| row.get::<_, String>(0),
        )?)
      })
      .await
      .unwrap();
    let stored = DateTime::parse_from_rfc3339(&stored).unwrap();
    assert!(stored >= tick_start, "{stored} < {tick_start}");

    // Touched links are no longer stale.
    let mut paginator = store.new_paginator();
    assert!(paginator.next_batch().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn failing_source_skips_without_touching() {
    let (scrapper, store, _source, recorder) = setup(true).await;
    store
      .track_link(ChatId(1), SO, Utc::now() - ChronoDuration::hours(1))
      .await
      .unwrap();

    let report = scrapper.tick().await;

    assert_eq!(report.skipped, 1);
    assert!(recorder.sent.lock().unwrap().is_empty());
    let mut paginator = store.new_paginator();
    assert_eq!(paginator.next_batch().await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn unclaimed_link_is_skipped_and_orphans_swept() {
    let (scrapper, store, source, _recorder) = setup(false).await;
    let old = Utc::now() - ChronoDuration::hours(1);
    store.track_link(ChatId(1), "https://github.com/o/r", old).await.unwrap();
    store.track_link(ChatId(1), SO, old).await.unwrap();
    store.untrack_link(ChatId(1), SO).await.unwrap();

    let report = scrapper.tick().await;

    // The orphaned question is still visited once before the sweep.
    assert_eq!(report.visited, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.notified, 0);
    assert_eq!(report.swept, 1);
    assert_eq!(source.calls.lock().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn run_exits_on_shutdown() {
    let (scrapper, _store, _source, _recorder) = setup(false).await;
    let (tx, rx) = watch::channel(());
    let handle = tokio::spawn(scrapper.run(Duration::from_secs(3600), rx));
    tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
      .await
      .expect("scheduler should stop")
      .unwrap();
  }
}

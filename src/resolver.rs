//! Daily-quote resolver: decides on each access whether the cached quote of
//! the day is still valid for (today, active topic), and refreshes it
//! otherwise.

use chrono::{FixedOffset, NaiveDate, Utc};
use color_eyre::Result;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::cache::{QuoteCache, SharedCache};
use crate::record::{DailyQuote, Topic};
use crate::remote::{RemoteError, RemoteStore};
use crate::signal::RefreshSignal;
use crate::sync::SyncEngine;

/// Served when the generation job has not produced today's record (or the
/// record lacks the active topic's field).
pub const PLACEHOLDER_NOT_READY: &str = "Today's quote isn't ready yet. Check back soon.";
/// Served on transient fetch failure; the next access retries.
pub const PLACEHOLDER_LOADING: &str = "Still loading today's quote...";

/// Validity of the cached daily entry against (today, active topic).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
  NoCache,
  Fresh,
  Stale,
}

/// Classify the cached entry. Freshness requires both the fetch date to be
/// today and the topic to match; a topic switch alone makes the entry stale
/// even though the day has not changed.
pub fn classify(entry: Option<&DailyQuote>, today: NaiveDate, topic: Topic) -> CacheState {
  match entry {
    None => CacheState::NoCache,
    Some(e) if e.fetch_date == today && e.topic == topic => CacheState::Fresh,
    Some(_) => CacheState::Stale,
  }
}

/// Where a resolved quote came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteSource {
  /// Fresh cache hit, zero remote calls.
  Cache,
  /// Freshly fetched and committed.
  Network,
  /// A placeholder; the resolver is still stale and will retry.
  Pending,
}

#[derive(Debug)]
pub struct ResolvedQuote {
  pub text: String,
  pub source: QuoteSource,
}

struct PendingFetch {
  seq: u64,
  day: NaiveDate,
  topic: Topic,
  abort: AbortHandle,
}

pub struct DailyQuoteResolver<R, C: SharedCache, N> {
  remote: Arc<R>,
  cache: QuoteCache<C>,
  engine: Arc<SyncEngine<R, C>>,
  signal: Arc<N>,
  tz: FixedOffset,
  default_topic: Topic,
  pending: Mutex<Option<PendingFetch>>,
  next_seq: std::sync::atomic::AtomicU64,
}

impl<R, C, N> DailyQuoteResolver<R, C, N>
where
  R: RemoteStore + 'static,
  C: SharedCache,
  N: RefreshSignal,
{
  pub fn new(
    remote: Arc<R>,
    cache: QuoteCache<C>,
    engine: Arc<SyncEngine<R, C>>,
    signal: Arc<N>,
    tz: FixedOffset,
    default_topic: Topic,
  ) -> Self {
    Self {
      remote,
      cache,
      engine,
      signal,
      tz,
      default_topic,
      pending: Mutex::new(None),
      next_seq: std::sync::atomic::AtomicU64::new(0),
    }
  }

  /// Today's calendar day in the reference zone.
  pub fn today(&self) -> NaiveDate {
    Utc::now().with_timezone(&self.tz).date_naive()
  }

  /// The `goal` preference, falling back to the configured default topic.
  pub fn active_topic(&self) -> Result<Topic> {
    Ok(self.cache.goal()?.unwrap_or(self.default_topic))
  }

  /// The quote of the day for the active topic.
  ///
  /// A fresh cache entry is served without any remote call. Otherwise a
  /// fetch runs; on success the entry is fully replaced (never partially
  /// updated), today's record is eagerly upserted into the history, a
  /// best-effort full reconciliation runs, and peers are notified. On
  /// failure the entry is left as it was and a placeholder is served;
  /// yesterday's text is never served as if it were current.
  pub async fn resolve(&self) -> Result<ResolvedQuote> {
    let today = self.today();
    let topic = self.active_topic()?;
    let entry = self.cache.daily_quote()?;

    if let Some(entry) = &entry {
      if classify(Some(entry), today, topic) == CacheState::Fresh {
        debug!(%topic, "daily quote served from cache");
        return Ok(ResolvedQuote {
          text: entry.text.clone(),
          source: QuoteSource::Cache,
        });
      }
    }

    self.refresh(today, topic).await
  }

  async fn refresh(&self, day: NaiveDate, topic: Topic) -> Result<ResolvedQuote> {
    let seq = self
      .next_seq
      .fetch_add(1, std::sync::atomic::Ordering::SeqCst);

    let remote = Arc::clone(&self.remote);
    let handle = tokio::spawn(async move { remote.fetch_day(day, topic).await });

    {
      let mut pending = self.pending.lock().await;
      if let Some(prev) = pending.replace(PendingFetch {
        seq,
        day,
        topic,
        abort: handle.abort_handle(),
      }) {
        // The newer request wins; the superseded fetch is cancelled rather
        // than left to finish and be discarded on arrival.
        debug!(day = %prev.day, topic = %prev.topic, "aborting superseded fetch");
        prev.abort.abort();
      }
    }

    let outcome = handle.await;

    {
      let mut pending = self.pending.lock().await;
      if pending.as_ref().is_some_and(|p| p.seq == seq) {
        *pending = None;
      }
    }

    match outcome {
      Ok(Ok(text)) => {
        // Discard-on-arrival guard: the target may have moved while the
        // fetch ran (day rollover, topic switch).
        if self.today() != day || self.active_topic()? != topic {
          debug!(%day, %topic, "discarding fetch result for a moved target");
          return Ok(ResolvedQuote {
            text: PLACEHOLDER_LOADING.into(),
            source: QuoteSource::Pending,
          });
        }
        self.commit(text, day, topic).await
      }
      Ok(Err(err)) if err.is_missing_data() => {
        info!(%err, "remote has no text yet; serving placeholder");
        Ok(ResolvedQuote {
          text: PLACEHOLDER_NOT_READY.into(),
          source: QuoteSource::Pending,
        })
      }
      Ok(Err(err)) => {
        match err {
          RemoteError::Timeout => warn!("daily quote fetch timed out; staying stale"),
          _ => warn!(%err, "daily quote fetch failed; staying stale"),
        }
        Ok(ResolvedQuote {
          text: PLACEHOLDER_LOADING.into(),
          source: QuoteSource::Pending,
        })
      }
      // Aborted by a newer request; that request owns the real answer.
      Err(join_err) => {
        debug!(%join_err, "pending fetch aborted");
        Ok(ResolvedQuote {
          text: PLACEHOLDER_LOADING.into(),
          source: QuoteSource::Pending,
        })
      }
    }
  }

  /// Commit sequence for a successful fetch: replace the daily entry, upsert
  /// today's record, reconcile best-effort, notify peers.
  async fn commit(&self, text: String, day: NaiveDate, topic: Topic) -> Result<ResolvedQuote> {
    self.cache.set_daily_quote(&DailyQuote {
      text: text.clone(),
      fetch_date: day,
      topic,
    })?;
    self.engine.apply_today(&text, day, topic).await?;

    if let Err(err) = self.engine.sync_all(topic).await {
      warn!(%err, "full reconciliation failed; history catches up on the next sync");
    }

    self.signal.notify_peers();
    info!(%day, %topic, "daily quote refreshed");

    Ok(ResolvedQuote {
      text,
      source: QuoteSource::Network,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::MemoryCache;
  use crate::remote::api_types::ApiQuoteDoc;
  use crate::remote::memory::MemoryRemote;
  use crate::signal::NoopSignal;
  use chrono::Days;
  use std::sync::atomic::Ordering;
  use std::time::Duration;

  type TestResolver = DailyQuoteResolver<MemoryRemote, MemoryCache, NoopSignal>;

  fn resolver() -> Arc<TestResolver> {
    let remote = Arc::new(MemoryRemote::new());
    let cache = QuoteCache::new(MemoryCache::new());
    let engine = Arc::new(SyncEngine::new(Arc::clone(&remote), cache.clone()));
    Arc::new(DailyQuoteResolver::new(
      remote,
      cache,
      engine,
      Arc::new(NoopSignal),
      FixedOffset::east_opt(0).unwrap(),
      Topic::Employment,
    ))
  }

  fn doc(employment: &str, diet: &str) -> ApiQuoteDoc {
    ApiQuoteDoc {
      employment: Some(employment.into()),
      diet: Some(diet.into()),
      ..Default::default()
    }
  }

  fn seed_today(resolver: &TestResolver, doc_: ApiQuoteDoc) {
    resolver
      .remote
      .put(&crate::record::date_id(resolver.today()), doc_);
  }

  #[test]
  fn test_classify_states() {
    let today = chrono::NaiveDate::parse_from_str("2024-01-05", "%Y-%m-%d").unwrap();
    let entry = DailyQuote {
      text: "x".into(),
      fetch_date: today,
      topic: Topic::Employment,
    };

    assert_eq!(classify(None, today, Topic::Employment), CacheState::NoCache);
    assert_eq!(
      classify(Some(&entry), today, Topic::Employment),
      CacheState::Fresh
    );
    // Yesterday's fetch date is stale regardless of topic match.
    let tomorrow = today.succ_opt().unwrap();
    assert_eq!(
      classify(Some(&entry), tomorrow, Topic::Employment),
      CacheState::Stale
    );
    // Topic switch alone is stale even on the same day.
    assert_eq!(classify(Some(&entry), today, Topic::Diet), CacheState::Stale);
  }

  #[tokio::test]
  async fn test_fresh_cache_serves_without_remote_calls() {
    let r = resolver();
    r.cache
      .set_daily_quote(&DailyQuote {
        text: "x".into(),
        fetch_date: r.today(),
        topic: Topic::Employment,
      })
      .unwrap();

    let resolved = r.resolve().await.unwrap();
    assert_eq!(resolved.text, "x");
    assert_eq!(resolved.source, QuoteSource::Cache);
    assert_eq!(r.remote.fetch_day_calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_empty_cache_fetches_and_commits() {
    let r = resolver();
    seed_today(&r, doc("earned", "eaten"));

    let resolved = r.resolve().await.unwrap();
    assert_eq!(resolved.text, "earned");
    assert_eq!(resolved.source, QuoteSource::Network);

    // Entry, history and reconciliation all committed.
    let entry = r.cache.daily_quote().unwrap().unwrap();
    assert_eq!(entry.fetch_date, r.today());
    assert_eq!(entry.topic, Topic::Employment);
    let history = r.engine.history().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].text, "earned");
  }

  #[tokio::test]
  async fn test_yesterdays_entry_triggers_refresh() {
    let r = resolver();
    let yesterday = r.today().checked_sub_days(Days::new(1)).unwrap();
    r.cache
      .set_daily_quote(&DailyQuote {
        text: "old".into(),
        fetch_date: yesterday,
        topic: Topic::Employment,
      })
      .unwrap();
    seed_today(&r, doc("new", "d"));

    let resolved = r.resolve().await.unwrap();
    assert_eq!(resolved.text, "new");
    assert_eq!(resolved.source, QuoteSource::Network);
    assert_eq!(r.remote.fetch_day_calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_topic_switch_invalidates_a_fresh_entry() {
    let r = resolver();
    r.cache
      .set_daily_quote(&DailyQuote {
        text: "for employment".into(),
        fetch_date: r.today(),
        topic: Topic::Employment,
      })
      .unwrap();
    r.cache.set_goal(Topic::Diet).unwrap();
    seed_today(&r, doc("e", "for diet"));

    let resolved = r.resolve().await.unwrap();
    assert_eq!(resolved.text, "for diet");
    assert_eq!(resolved.source, QuoteSource::Network);
  }

  #[tokio::test]
  async fn test_missing_record_serves_not_ready_placeholder() {
    let r = resolver();

    let resolved = r.resolve().await.unwrap();
    assert_eq!(resolved.text, PLACEHOLDER_NOT_READY);
    assert_eq!(resolved.source, QuoteSource::Pending);
    // The placeholder is never cached; the resolver stays stale.
    assert_eq!(r.cache.daily_quote().unwrap(), None);
  }

  #[tokio::test]
  async fn test_missing_topic_field_serves_not_ready_placeholder() {
    let r = resolver();
    seed_today(
      &r,
      ApiQuoteDoc {
        diet: Some("only diet today".into()),
        ..Default::default()
      },
    );

    let resolved = r.resolve().await.unwrap();
    assert_eq!(resolved.text, PLACEHOLDER_NOT_READY);
    assert_eq!(resolved.source, QuoteSource::Pending);
  }

  #[tokio::test]
  async fn test_timeout_stays_stale_and_retries_on_next_access() {
    let r = resolver();
    seed_today(&r, doc("finally", "d"));
    r.remote.timeout_reads(true);

    let resolved = r.resolve().await.unwrap();
    assert_eq!(resolved.text, PLACEHOLDER_LOADING);
    assert_eq!(resolved.source, QuoteSource::Pending);
    assert_eq!(r.cache.daily_quote().unwrap(), None);

    // Next access retries and succeeds.
    r.remote.timeout_reads(false);
    let resolved = r.resolve().await.unwrap();
    assert_eq!(resolved.text, "finally");
    assert_eq!(resolved.source, QuoteSource::Network);
  }

  #[tokio::test]
  async fn test_fetch_error_never_overwrites_the_stale_entry() {
    let r = resolver();
    let yesterday = r.today().checked_sub_days(Days::new(1)).unwrap();
    let stale = DailyQuote {
      text: "yesterday".into(),
      fetch_date: yesterday,
      topic: Topic::Employment,
    };
    r.cache.set_daily_quote(&stale).unwrap();
    r.remote.timeout_reads(true);

    let resolved = r.resolve().await.unwrap();
    // Never serve yesterday's text as if it were current.
    assert_eq!(resolved.text, PLACEHOLDER_LOADING);
    assert_eq!(r.cache.daily_quote().unwrap(), Some(stale));
  }

  #[tokio::test]
  async fn test_topic_change_aborts_the_pending_fetch() {
    let r = resolver();
    seed_today(&r, doc("e", "d"));
    r.remote.delay_reads(Duration::from_millis(80));

    // First resolve targets the default topic and hangs in the delay.
    let first = {
      let r = Arc::clone(&r);
      tokio::spawn(async move { r.resolve().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    // Topic changes while the fetch is in flight; the new resolve supersedes
    // and aborts it.
    r.cache.set_goal(Topic::Diet).unwrap();
    let second = r.resolve().await.unwrap();
    assert_eq!(second.text, "d");
    assert_eq!(second.source, QuoteSource::Network);

    let first = first.await.unwrap().unwrap();
    assert_eq!(first.source, QuoteSource::Pending);
    // Only the second fetch ran to completion.
    assert_eq!(r.remote.completed_fetches.load(Ordering::SeqCst), 1);
  }
}

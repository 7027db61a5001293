//! Serialized front for every read-modify-write of the quote history.

use chrono::NaiveDate;
use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::reconcile::{reconcile, upsert_today};
use crate::cache::{QuoteCache, SharedCache};
use crate::record::{Emotion, QuoteRecord, Topic};
use crate::remote::RemoteStore;

/// Result of an annotation edit. The local write always succeeded when this
/// is returned; `mirrored` says whether the best-effort remote copy did too.
#[derive(Debug)]
pub struct AnnotateOutcome {
  pub mirrored: bool,
  /// Human-readable reason when `mirrored` is false, for the UI to warn
  /// that the edit may not have propagated to other devices.
  pub mirror_error: Option<String>,
}

/// Owns the history: all mutations of the persisted record list go through
/// here, behind one async mutex.
///
/// The persisted store has no optimistic-concurrency check, so concurrent
/// callers must not interleave read-modify-write cycles; the lock enforces
/// the single-writer discipline within the process.
pub struct SyncEngine<R, C: SharedCache> {
  remote: Arc<R>,
  cache: QuoteCache<C>,
  history_lock: Mutex<()>,
}

impl<R: RemoteStore, C: SharedCache> SyncEngine<R, C> {
  pub fn new(remote: Arc<R>, cache: QuoteCache<C>) -> Self {
    Self {
      remote,
      cache,
      history_lock: Mutex::new(()),
    }
  }

  /// Full reconciliation: fetch the whole remote snapshot and merge it into
  /// the local history. Returns the merged record count.
  pub async fn sync_all(&self, topic: Topic) -> Result<usize> {
    let remote_records = self.remote.fetch_all(topic).await?;

    let _guard = self.history_lock.lock().await;
    let local = self.cache.history()?;
    let merged = reconcile(remote_records, &local);
    self.cache.set_history(&merged)?;

    debug!(count = merged.len(), %topic, "history reconciled");
    Ok(merged.len())
  }

  /// Eager upsert of today's freshly fetched text, ahead of the next full
  /// reconciliation. Never touches annotation fields.
  pub async fn apply_today(&self, text: &str, day: NaiveDate, topic: Topic) -> Result<()> {
    let _guard = self.history_lock.lock().await;
    let mut history = self.cache.history()?;
    upsert_today(&mut history, text, day, topic);
    self.cache.set_history(&history)
  }

  /// Update a record's annotations locally, then mirror the edit to the
  /// remote store best-effort.
  ///
  /// The local copy is authoritative for these fields: a remote failure is
  /// reported in the outcome but the local edit is kept regardless.
  pub async fn annotate(
    &self,
    id: &str,
    memo: Option<&str>,
    emotion: Option<Emotion>,
  ) -> Result<AnnotateOutcome> {
    {
      let _guard = self.history_lock.lock().await;
      let mut history = self.cache.history()?;
      let record = history
        .iter_mut()
        .find(|record| record.id == id)
        .ok_or_else(|| eyre!("No quote record for {}", id))?;
      record.memo = memo.map(str::to_string);
      record.emotion = emotion;
      self.cache.set_history(&history)?;
    }

    match self.remote.update_annotations(id, memo, emotion).await {
      Ok(()) => Ok(AnnotateOutcome {
        mirrored: true,
        mirror_error: None,
      }),
      Err(err) => {
        warn!(%id, %err, "annotation kept locally but remote mirror failed");
        Ok(AnnotateOutcome {
          mirrored: false,
          mirror_error: Some(err.to_string()),
        })
      }
    }
  }

  /// Read-only snapshot of the history, newest first.
  pub async fn history(&self) -> Result<Vec<QuoteRecord>> {
    let _guard = self.history_lock.lock().await;
    self.cache.history()
  }
}

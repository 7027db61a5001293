//! In-memory remote store used by engine and resolver tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::api_types::ApiQuoteDoc;
use super::client::RemoteStore;
use super::error::RemoteError;
use crate::record::{date_id, parse_date_id, Emotion, QuoteRecord, Topic};

/// Remote store double: documents in a map, call counters, and switches for
/// timeout and write-failure injection.
#[derive(Default)]
pub struct MemoryRemote {
  docs: Mutex<BTreeMap<String, ApiQuoteDoc>>,
  pub fetch_day_calls: AtomicUsize,
  pub fetch_all_calls: AtomicUsize,
  pub update_calls: AtomicUsize,
  /// Day fetches that ran to completion (an aborted fetch never counts).
  pub completed_fetches: AtomicUsize,
  timeout_reads: AtomicBool,
  fail_writes: AtomicBool,
  read_delay: Mutex<Option<Duration>>,
}

impl MemoryRemote {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn put(&self, id: &str, doc: ApiQuoteDoc) {
    self.docs.lock().unwrap().insert(id.to_string(), doc);
  }

  pub fn doc(&self, id: &str) -> Option<ApiQuoteDoc> {
    self.docs.lock().unwrap().get(id).cloned()
  }

  /// Make every read fail with `Timeout`.
  pub fn timeout_reads(&self, on: bool) {
    self.timeout_reads.store(on, Ordering::SeqCst);
  }

  /// Make every annotation write fail with a 500.
  pub fn fail_writes(&self, on: bool) {
    self.fail_writes.store(on, Ordering::SeqCst);
  }

  /// Delay reads so a test can abort them mid-flight.
  pub fn delay_reads(&self, delay: Duration) {
    *self.read_delay.lock().unwrap() = Some(delay);
  }

  async fn before_read(&self) -> Result<(), RemoteError> {
    let delay = *self.read_delay.lock().unwrap();
    if let Some(delay) = delay {
      tokio::time::sleep(delay).await;
    }
    if self.timeout_reads.load(Ordering::SeqCst) {
      return Err(RemoteError::Timeout);
    }
    Ok(())
  }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
  async fn fetch_day(&self, day: NaiveDate, topic: Topic) -> Result<String, RemoteError> {
    self.fetch_day_calls.fetch_add(1, Ordering::SeqCst);
    self.before_read().await?;

    let id = date_id(day);
    let docs = self.docs.lock().unwrap();
    let doc = docs
      .get(&id)
      .ok_or_else(|| RemoteError::RecordMissing { day: id.clone() })?;
    let text = doc
      .text_for(topic)
      .map(str::to_string)
      .ok_or(RemoteError::FieldMissing { day: id, topic })?;

    self.completed_fetches.fetch_add(1, Ordering::SeqCst);
    Ok(text)
  }

  async fn fetch_all(&self, topic: Topic) -> Result<Vec<QuoteRecord>, RemoteError> {
    self.fetch_all_calls.fetch_add(1, Ordering::SeqCst);
    self.before_read().await?;

    let docs = self.docs.lock().unwrap();
    // BTreeMap iterates ascending by date-shaped key; reverse for the
    // descending contract.
    Ok(
      docs
        .iter()
        .rev()
        .filter_map(|(id, doc)| {
          let day = parse_date_id(id)?;
          Some(doc.clone().into_record(topic, day))
        })
        .collect(),
    )
  }

  async fn update_annotations(
    &self,
    id: &str,
    memo: Option<&str>,
    emotion: Option<Emotion>,
  ) -> Result<(), RemoteError> {
    self.update_calls.fetch_add(1, Ordering::SeqCst);
    if self.fail_writes.load(Ordering::SeqCst) {
      return Err(RemoteError::Status(500));
    }

    let mut docs = self.docs.lock().unwrap();
    let doc = docs.get_mut(id).ok_or_else(|| RemoteError::RecordMissing {
      day: id.to_string(),
    })?;
    doc.memo = memo.map(str::to_string);
    doc.emotion = emotion;
    Ok(())
  }
}

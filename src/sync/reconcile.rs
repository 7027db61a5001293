//! The merge algorithm: remote snapshot into local history, by record id.
//!
//! Remote wins on content fields and on existence; the local side wins on
//! `memo`/`emotion` unconditionally. Both functions are pure so the merge
//! properties can be tested without any I/O.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::record::{QuoteRecord, Topic};

/// Merge a freshly fetched remote snapshot into the existing local history.
///
/// - A remote record matching a local id adopts the local `memo`/`emotion`
///   (even when they are empty; a stale remote copy is never resurrected).
/// - A remote record with no local counterpart is inserted as-is.
/// - A local record with no remote counterpart is dropped when unannotated;
///   with annotations it is retained and marked `orphaned` so user-entered
///   data is never silently deleted.
///
/// The result is sorted by date descending and contains exactly one record
/// per id. Re-running with the same snapshot and the merged result yields an
/// identical history.
pub fn reconcile(remote: Vec<QuoteRecord>, local: &[QuoteRecord]) -> Vec<QuoteRecord> {
  let by_id: HashMap<&str, &QuoteRecord> =
    local.iter().map(|record| (record.id.as_str(), record)).collect();

  let mut merged: Vec<QuoteRecord> = Vec::with_capacity(remote.len());
  let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();

  for mut record in remote {
    // The remote store does not enforce id uniqueness; the merge does.
    if !seen.insert(record.id.clone()) {
      continue;
    }
    record.orphaned = false;
    if let Some(existing) = by_id.get(record.id.as_str()) {
      record.memo = existing.memo.clone();
      record.emotion = existing.emotion;
    }
    merged.push(record);
  }

  for record in local {
    if seen.contains(&record.id) {
      continue;
    }
    if record.has_annotations() {
      let mut kept = record.clone();
      kept.orphaned = true;
      merged.push(kept);
    }
  }

  merged.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
  merged
}

/// Eagerly reflect today's fetched text in the history before the next full
/// reconciliation.
///
/// Finds the record for the same calendar day and updates only the content
/// fields it knows (`text`, `goal`), or inserts a new record keyed by the
/// date-derived id. Annotation fields are never touched. Keeps the list
/// sorted descending.
pub fn upsert_today(history: &mut Vec<QuoteRecord>, text: &str, day: NaiveDate, topic: Topic) {
  if let Some(existing) = history.iter_mut().find(|record| record.date == day) {
    existing.text = text.to_string();
    existing.goal = Some(topic);
    existing.orphaned = false;
    return;
  }

  history.push(QuoteRecord::remote_origin(day, text.to_string(), topic));
  history.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
}

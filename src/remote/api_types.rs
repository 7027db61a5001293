//! Serde-deserializable types matching the remote store's wire format.
//!
//! Wire documents are separate from domain records: the document holds one
//! text field per topic and an exact timestamp, while a `QuoteRecord` holds
//! the text resolved for one topic and a day-granularity date. Conversion
//! also drops the remote's annotation copies, which are never trusted for
//! merging.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{parse_date_id, Emotion, QuoteRecord, Topic};

/// One remote document: a calendar day's quote data.
///
/// The generation job writes every field except `memo`/`emotion`; the
/// application writes only those two, via partial update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiQuoteDoc {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub employment: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub diet: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub selfdev: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub study: Option<String>,
  /// Timestamp written by the generation job; collapsed to day granularity
  /// on conversion.
  #[serde(default)]
  pub date: Option<DateTime<Utc>>,
  #[serde(rename = "generatedBy", default, skip_serializing_if = "Option::is_none")]
  pub generated_by: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub style: Option<String>,
  /// Mirrored annotation; ignored on read, the local copy is authoritative.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub memo: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub emotion: Option<Emotion>,
}

impl ApiQuoteDoc {
  /// Text for one topic, if the generation job produced it.
  pub fn text_for(&self, topic: Topic) -> Option<&str> {
    match topic {
      Topic::Employment => self.employment.as_deref(),
      Topic::Diet => self.diet.as_deref(),
      Topic::Selfdev => self.selfdev.as_deref(),
      Topic::Study => self.study.as_deref(),
    }
  }

  /// Convert to a domain record for `topic` and `day`.
  ///
  /// Annotation fields are dropped here so a remote-sourced record can never
  /// overwrite local annotations during a merge.
  pub fn into_record(self, topic: Topic, day: NaiveDate) -> QuoteRecord {
    let text = self.text_for(topic).unwrap_or_default().to_string();
    let mut record = QuoteRecord::remote_origin(day, text, topic);
    record.generated_by = self.generated_by;
    record.style = self.style;
    record
  }
}

/// List-endpoint item: the date-derived document key plus the document.
#[derive(Debug, Deserialize)]
pub struct ApiQuoteEntry {
  pub id: String,
  #[serde(flatten)]
  pub doc: ApiQuoteDoc,
}

impl ApiQuoteEntry {
  /// Calendar day for this entry. The key is authoritative; the document
  /// timestamp is the fallback for malformed keys. `None` means the entry
  /// cannot be placed on the calendar at all.
  pub fn day(&self, tz: FixedOffset) -> Option<NaiveDate> {
    parse_date_id(&self.id).or_else(|| self.doc.date.map(|ts| day_of(ts, tz)))
  }
}

/// Collapse a timestamp to its calendar day in the reference zone. Two
/// timestamps on the same day compare equal regardless of time-of-day.
pub fn day_of(ts: DateTime<Utc>, tz: FixedOffset) -> NaiveDate {
  ts.with_timezone(&tz).date_naive()
}

/// PATCH body for the annotation partial update. Exactly these two fields,
/// never a full-document overwrite; `null` clears a field remotely.
#[derive(Debug, Serialize)]
pub struct AnnotationPatch<'a> {
  pub memo: Option<&'a str>,
  pub emotion: Option<Emotion>,
}

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Quote topics, matching the per-topic text fields of the remote document.
/// The user's `goal` preference selects one of these.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
  #[default]
  Employment,
  Diet,
  Selfdev,
  Study,
}

impl Topic {
  /// Field name of this topic in the remote document.
  pub fn as_str(&self) -> &'static str {
    match self {
      Topic::Employment => "employment",
      Topic::Diet => "diet",
      Topic::Selfdev => "selfdev",
      Topic::Study => "study",
    }
  }
}

impl fmt::Display for Topic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl std::str::FromStr for Topic {
  type Err = String;

  /// Parses the plain-text form stored under the `goal` preference key.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "employment" => Ok(Topic::Employment),
      "diet" => Ok(Topic::Diet),
      "selfdev" => Ok(Topic::Selfdev),
      "study" => Ok(Topic::Study),
      other => Err(format!("unknown topic {other:?}")),
    }
  }
}

/// Emotion tag vocabulary for annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
  Joy,
  Sadness,
  Anger,
  Anxiety,
  Calm,
}

impl Emotion {
  pub fn as_str(&self) -> &'static str {
    match self {
      Emotion::Joy => "joy",
      Emotion::Sadness => "sadness",
      Emotion::Anger => "anger",
      Emotion::Anxiety => "anxiety",
      Emotion::Calm => "calm",
    }
  }
}

impl fmt::Display for Emotion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// One calendar day's quote plus optional local annotations.
///
/// Content fields (`text`, `generated_by`, `style`, `goal`) are
/// remote-authoritative; `memo` and `emotion` are owned by the local cache
/// and survive every merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRecord {
  /// Merge key, derived from the calendar date as `YYYY-MM-DD`.
  pub id: String,
  /// Display text resolved for the topic the record was fetched under.
  pub text: String,
  /// Calendar day in the reference zone; comparisons ignore time-of-day.
  pub date: NaiveDate,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub memo: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub emotion: Option<Emotion>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub generated_by: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub style: Option<String>,
  /// Topic whose field produced `text`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub goal: Option<Topic>,
  /// Set when the day vanished from the remote store but local annotations
  /// forced retention.
  #[serde(default, skip_serializing_if = "is_false")]
  pub orphaned: bool,
}

fn is_false(b: &bool) -> bool {
  !*b
}

impl QuoteRecord {
  /// A record as the remote store describes it: no annotations yet.
  pub fn remote_origin(day: NaiveDate, text: String, topic: Topic) -> Self {
    QuoteRecord {
      id: date_id(day),
      text,
      date: day,
      memo: None,
      emotion: None,
      generated_by: None,
      style: None,
      goal: Some(topic),
      orphaned: false,
    }
  }

  /// Whether the user attached anything to this record.
  pub fn has_annotations(&self) -> bool {
    self.memo.is_some() || self.emotion.is_some()
  }
}

/// The singleton "quote of the day" cache entry. Stale once `fetch_date` is
/// no longer today or `topic` no longer matches the active topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyQuote {
  pub text: String,
  pub fetch_date: NaiveDate,
  pub topic: Topic,
}

/// Format a calendar day as the record id used by the remote store.
pub fn date_id(day: NaiveDate) -> String {
  day.format("%Y-%m-%d").to_string()
}

/// Parse a record id back into its calendar day.
pub fn parse_date_id(id: &str) -> Option<NaiveDate> {
  NaiveDate::parse_from_str(id, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
  }

  #[test]
  fn test_date_id_matches_remote_key_format() {
    assert_eq!(date_id(day("2024-01-05")), "2024-01-05");
    assert_eq!(parse_date_id("2024-01-05"), Some(day("2024-01-05")));
    assert_eq!(parse_date_id("20240105"), None);
  }

  #[test]
  fn test_topic_wire_names() {
    assert_eq!(Topic::Employment.as_str(), "employment");
    assert_eq!(Topic::Selfdev.to_string(), "selfdev");
  }

  #[test]
  fn test_record_serde_skips_empty_annotations() {
    let record = QuoteRecord::remote_origin(day("2024-01-05"), "text".into(), Topic::Study);
    let json = serde_json::to_value(&record).unwrap();
    assert!(json.get("memo").is_none());
    assert!(json.get("emotion").is_none());
    assert!(json.get("orphaned").is_none());

    let back: QuoteRecord = serde_json::from_value(json).unwrap();
    assert_eq!(back, record);
  }

  #[test]
  fn test_has_annotations() {
    let mut record = QuoteRecord::remote_origin(day("2024-01-05"), "text".into(), Topic::Diet);
    assert!(!record.has_annotations());
    record.emotion = Some(Emotion::Calm);
    assert!(record.has_annotations());
  }
}

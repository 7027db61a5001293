use thiserror::Error;

use crate::record::Topic;

/// Failures surfaced by the remote record store.
///
/// `RecordMissing` and `FieldMissing` mean the store answered but has no
/// text to give; the resolver turns them into placeholder strings instead of
/// hard failures. Everything else is transient and retried on the next
/// access trigger.
#[derive(Debug, Error)]
pub enum RemoteError {
  /// No record exists for the requested day; the generation job has not
  /// run yet.
  #[error("no quote record for {day}")]
  RecordMissing { day: String },

  /// The record exists but carries no text for the requested topic.
  #[error("record {day} has no {topic} text")]
  FieldMissing { day: String, topic: Topic },

  #[error("remote request timed out")]
  Timeout,

  #[error("remote request failed: {0}")]
  Transport(String),

  #[error("remote returned status {0}")]
  Status(u16),

  #[error("undecodable remote document: {0}")]
  Decode(String),
}

impl RemoteError {
  /// True when the store simply has no data yet, as opposed to an I/O or
  /// protocol failure.
  pub fn is_missing_data(&self) -> bool {
    matches!(
      self,
      RemoteError::RecordMissing { .. } | RemoteError::FieldMissing { .. }
    )
  }

  pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
    if err.is_timeout() {
      RemoteError::Timeout
    } else {
      RemoteError::Transport(err.to_string())
    }
  }
}

//! Typed layer over the shared cache: well-known keys and blob codecs.

use color_eyre::Result;
use std::sync::Arc;
use tracing::warn;

use super::store::SharedCache;
use crate::record::{DailyQuote, QuoteRecord, Topic};

/// Key holding the serialized singleton [`DailyQuote`] entry.
pub const KEY_TODAY_QUOTE: &str = "todayQuote";
/// Key holding the serialized, descending-ordered quote history.
pub const KEY_ALL_QUOTES: &str = "allQuotesData";
/// Key holding the active topic preference, written by the settings role.
pub const KEY_GOAL: &str = "goal";

/// Typed access to the quote data in a [`SharedCache`].
///
/// A corrupt or schema-mismatched blob is never a crash: the affected key is
/// reset to its empty default and the next fetch repopulates it.
pub struct QuoteCache<S: SharedCache> {
  store: Arc<S>,
}

impl<S: SharedCache> QuoteCache<S> {
  pub fn new(store: S) -> Self {
    Self {
      store: Arc::new(store),
    }
  }

  /// The cached quote-of-the-day entry, if one has been written.
  pub fn daily_quote(&self) -> Result<Option<DailyQuote>> {
    let Some(bytes) = self.store.get(KEY_TODAY_QUOTE)? else {
      return Ok(None);
    };

    match serde_json::from_slice(&bytes) {
      Ok(entry) => Ok(Some(entry)),
      Err(err) => {
        warn!(key = KEY_TODAY_QUOTE, %err, "undecodable cache blob; resetting key");
        self.store.remove(KEY_TODAY_QUOTE)?;
        Ok(None)
      }
    }
  }

  /// Overwrite the daily entry. Always a full replacement of the struct,
  /// never a partial field update.
  pub fn set_daily_quote(&self, entry: &DailyQuote) -> Result<()> {
    let bytes = serde_json::to_vec(entry)?;
    self.store.set(KEY_TODAY_QUOTE, &bytes)
  }

  /// The full annotated history, newest first. An absent or corrupt blob
  /// loads as empty.
  pub fn history(&self) -> Result<Vec<QuoteRecord>> {
    let Some(bytes) = self.store.get(KEY_ALL_QUOTES)? else {
      return Ok(Vec::new());
    };

    match serde_json::from_slice(&bytes) {
      Ok(records) => Ok(records),
      Err(err) => {
        warn!(key = KEY_ALL_QUOTES, %err, "undecodable history blob; resetting key");
        self.set_history(&[])?;
        Ok(Vec::new())
      }
    }
  }

  /// Persist the history as one blob; single-key writes are atomic in the
  /// underlying store.
  pub fn set_history(&self, records: &[QuoteRecord]) -> Result<()> {
    let bytes = serde_json::to_vec(records)?;
    self.store.set(KEY_ALL_QUOTES, &bytes)
  }

  /// The active topic preference, if the settings role has written one.
  pub fn goal(&self) -> Result<Option<Topic>> {
    let Some(bytes) = self.store.get(KEY_GOAL)? else {
      return Ok(None);
    };

    let text = String::from_utf8_lossy(&bytes);
    match text.parse() {
      Ok(topic) => Ok(Some(topic)),
      Err(err) => {
        warn!(key = KEY_GOAL, %err, "unreadable goal preference; resetting key");
        self.store.remove(KEY_GOAL)?;
        Ok(None)
      }
    }
  }

  pub fn set_goal(&self, topic: Topic) -> Result<()> {
    self.store.set(KEY_GOAL, topic.as_str().as_bytes())
  }
}

impl<S: SharedCache> Clone for QuoteCache<S> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
    }
  }
}

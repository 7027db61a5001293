//! The widget-rendering process: a read-only peer of the shared cache.
//!
//! It never writes. Each tick it polls the refresh epoch; when the epoch
//! moves (the app process committed a refresh) it discards its snapshot,
//! re-reads the cache, and re-renders. A signal that was never delivered is
//! harmless: the first tick always reads current state.

use chrono::{FixedOffset, NaiveDate, Utc};
use color_eyre::Result;
use std::time::Duration;
use tracing::{debug, info};

use crate::cache::{QuoteCache, SharedCache};
use crate::record::{DailyQuote, Topic};
use crate::resolver::{classify, CacheState};
use crate::signal::EpochFile;

pub struct Widget<C: SharedCache> {
  cache: QuoteCache<C>,
  epoch: EpochFile,
  tz: FixedOffset,
  default_topic: Topic,
  refresh: Duration,
}

impl<C: SharedCache> Widget<C> {
  pub fn new(
    cache: QuoteCache<C>,
    epoch: EpochFile,
    tz: FixedOffset,
    default_topic: Topic,
    refresh: Duration,
  ) -> Self {
    Self {
      cache,
      epoch,
      tz,
      default_topic,
      refresh,
    }
  }

  /// Render loop. Runs until the process is killed.
  pub async fn run(&self) -> Result<()> {
    info!(every = ?self.refresh, "widget renderer started");
    let mut interval = tokio::time::interval(self.refresh);
    let mut last_frame: Option<(u64, NaiveDate)> = None;

    loop {
      interval.tick().await;
      let epoch = self.epoch.current_epoch();
      let today = Utc::now().with_timezone(&self.tz).date_naive();
      // The frame goes stale when the epoch moves (the app process wrote)
      // or the day rolls over with no write at all; either way the cached
      // entry must be re-classified against the new day.
      if frame_current(last_frame, epoch, today) {
        continue;
      }
      debug!(epoch, %today, "frame outdated; re-reading shared cache");
      last_frame = Some((epoch, today));
      println!("{}", self.render()?);
    }
  }

  /// One render pass from a fresh cache snapshot.
  pub fn render(&self) -> Result<String> {
    let today = Utc::now().with_timezone(&self.tz).date_naive();
    let topic = self.cache.goal()?.unwrap_or(self.default_topic);
    let entry = self.cache.daily_quote()?;
    Ok(render_snapshot(entry.as_ref(), today, topic))
  }
}

/// Whether the last rendered frame is still valid for the current refresh
/// epoch and calendar day.
fn frame_current(last: Option<(u64, NaiveDate)>, epoch: u64, today: NaiveDate) -> bool {
  last == Some((epoch, today))
}

/// Pure formatting of one widget frame.
///
/// A stale or absent entry renders a waiting line instead of passing off an
/// old quote as today's.
pub fn render_snapshot(entry: Option<&DailyQuote>, today: NaiveDate, topic: Topic) -> String {
  match classify(entry, today, topic) {
    CacheState::Fresh => {
      // Classified fresh, so the entry is present.
      let text = entry.map(|e| e.text.as_str()).unwrap_or_default();
      format!("[{} | {}] {}", today.format("%Y-%m-%d"), topic, text)
    }
    CacheState::NoCache | CacheState::Stale => {
      format!(
        "[{} | {}] waiting for today's quote",
        today.format("%Y-%m-%d"),
        topic
      )
    }
  }
}

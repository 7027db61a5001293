//! Wires the components together and implements one method per subcommand.

use color_eyre::Result;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{QuoteCache, SqliteCache};
use crate::config::Config;
use crate::record::{Emotion, Topic};
use crate::remote::HttpRemoteStore;
use crate::resolver::{DailyQuoteResolver, QuoteSource};
use crate::signal::EpochFile;
use crate::sync::SyncEngine;
use crate::widget::Widget;

pub struct App {
  config: Config,
  cache: QuoteCache<SqliteCache>,
  engine: Arc<SyncEngine<HttpRemoteStore, SqliteCache>>,
  resolver: DailyQuoteResolver<HttpRemoteStore, SqliteCache, EpochFile>,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let db_path = config.cache_db_path()?;
    let cache = QuoteCache::new(SqliteCache::open(&db_path)?);
    let remote = Arc::new(HttpRemoteStore::new(&config)?);
    let engine = Arc::new(SyncEngine::new(Arc::clone(&remote), cache.clone()));
    let resolver = DailyQuoteResolver::new(
      remote,
      cache.clone(),
      Arc::clone(&engine),
      Arc::new(EpochFile::beside(&db_path)),
      config.reference_zone()?,
      config.default_topic,
    );

    Ok(Self {
      config,
      cache,
      engine,
      resolver,
    })
  }

  /// Quote of the day for the active topic.
  pub async fn today(&self) -> Result<()> {
    let resolved = self.resolver.resolve().await?;
    println!("{}", resolved.text);
    if resolved.source == QuoteSource::Pending {
      eprintln!("(not refreshed yet; run again in a moment)");
    }
    Ok(())
  }

  /// The annotated history, newest first.
  pub async fn history(&self, limit: Option<usize>) -> Result<()> {
    let history = self.engine.history().await?;
    let shown = limit.unwrap_or(history.len());

    for record in history.iter().take(shown) {
      let mut line = format!("{}  {}", record.id, record.text);
      if let Some(emotion) = record.emotion {
        line.push_str(&format!("  [{}]", emotion));
      }
      if let Some(memo) = &record.memo {
        line.push_str(&format!("  # {}", memo));
      }
      if record.orphaned {
        line.push_str("  (no longer on the remote)");
      }
      println!("{}", line);
    }
    Ok(())
  }

  /// Attach (or clear) a memo and emotion tag on one day's record.
  pub async fn annotate(
    &self,
    id: &str,
    memo: Option<&str>,
    emotion: Option<Emotion>,
  ) -> Result<()> {
    let outcome = self.engine.annotate(id, memo, emotion).await?;
    if outcome.mirrored {
      println!("Annotated {}", id);
    } else {
      // The local edit is kept either way; only the cross-device mirror
      // is in doubt.
      println!("Annotated {} locally", id);
      if let Some(reason) = outcome.mirror_error {
        eprintln!("Warning: could not sync to remote ({})", reason);
      }
    }
    Ok(())
  }

  /// Full reconciliation against the remote store.
  pub async fn sync(&self) -> Result<()> {
    let topic = self.resolver.active_topic()?;
    let count = self.engine.sync_all(topic).await?;
    println!("Synced {} records", count);
    self.notify_peers();
    Ok(())
  }

  /// Show or set the active topic preference.
  ///
  /// Setting it stands in for the settings screen: the engine itself only
  /// ever reads this key.
  pub async fn goal(&self, topic: Option<Topic>) -> Result<()> {
    match topic {
      Some(topic) => {
        self.cache.set_goal(topic)?;
        println!("Goal set to {}", topic);
        // A fresh-looking entry for the old topic is now stale; peers
        // should re-read.
        self.notify_peers();
      }
      None => println!("{}", self.resolver.active_topic()?),
    }
    Ok(())
  }

  /// The widget-renderer process loop. Reads the same cache file, never
  /// writes.
  pub async fn widget(&self) -> Result<()> {
    let db_path = self.config.cache_db_path()?;
    let widget = Widget::new(
      self.cache.clone(),
      EpochFile::beside(&db_path),
      self.config.reference_zone()?,
      self.config.default_topic,
      Duration::from_secs(self.config.widget_refresh_secs),
    );
    widget.run().await
  }

  fn notify_peers(&self) {
    use crate::signal::RefreshSignal;
    if let Ok(db_path) = self.config.cache_db_path() {
      EpochFile::beside(&db_path).notify_peers();
    }
  }
}

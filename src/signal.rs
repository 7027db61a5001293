//! Cross-process refresh signal.
//!
//! Fire-and-forget: a notification carries no payload, readers always
//! re-read full state from the shared cache. Failure to deliver is not an
//! error; a reader that starts later sees current state on its first read
//! anyway.

use std::path::{Path, PathBuf};
use tracing::warn;

pub trait RefreshSignal: Send + Sync {
  /// Ask any other reader process to discard its in-memory snapshot and
  /// re-read the shared cache on its next render pass.
  fn notify_peers(&self);
}

/// Epoch-counter transport: a sidecar file next to the cache database
/// holding a monotonically increasing integer. The widget process polls it
/// each render tick and re-reads the cache when it moves.
pub struct EpochFile {
  path: PathBuf,
}

impl EpochFile {
  pub fn new(path: PathBuf) -> Self {
    Self { path }
  }

  /// The conventional location: `refresh.epoch` beside the cache database.
  pub fn beside(db_path: &Path) -> Self {
    Self::new(db_path.with_file_name("refresh.epoch"))
  }

  /// Current epoch; a missing or unreadable file reads as 0.
  pub fn current_epoch(&self) -> u64 {
    std::fs::read_to_string(&self.path)
      .ok()
      .and_then(|s| s.trim().parse().ok())
      .unwrap_or(0)
  }
}

impl RefreshSignal for EpochFile {
  fn notify_peers(&self) {
    let next = self.current_epoch() + 1;
    if let Err(err) = std::fs::write(&self.path, next.to_string()) {
      // Peers that miss this signal still read current state on their next
      // start; nothing to propagate.
      warn!(path = %self.path.display(), %err, "refresh signal not delivered");
    }
  }
}

/// Signal that goes nowhere. Tests and single-process use.
pub struct NoopSignal;

impl RefreshSignal for NoopSignal {
  fn notify_peers(&self) {}
}

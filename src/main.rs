mod app;
mod cache;
mod config;
mod record;
mod remote;
mod resolver;
mod signal;
mod sync;
mod widget;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use record::{Emotion, Topic};

#[derive(Parser, Debug)]
#[command(name = "quotd")]
#[command(about = "Daily-quote sync engine with an annotation-preserving shared cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/quotd/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Show the quote of the day for the active topic
  Today,
  /// List the quote history, newest first
  History {
    /// Show at most this many records
    #[arg(short, long)]
    limit: Option<usize>,
  },
  /// Attach a memo and emotion tag to one day's record.
  /// Omitted fields are cleared.
  Annotate {
    /// Record id, e.g. 2024-01-05
    id: String,
    #[arg(short, long)]
    memo: Option<String>,
    #[arg(short, long, value_enum)]
    emotion: Option<Emotion>,
  },
  /// Reconcile the full remote snapshot into the local history
  Sync,
  /// Show or set the active topic preference
  Goal {
    #[arg(value_enum)]
    topic: Option<Topic>,
  },
  /// Run the widget-renderer process (reads the shared cache, never writes)
  Widget,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let config = config::Config::load(args.config.as_deref())?;

  // The widget's stdout is its render surface, so its logs go to a rolling
  // file beside the cache database instead of the terminal.
  let _log_guard = match args.command {
    Command::Widget => {
      let log_dir = config
        .cache_db_path()?
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
      let appender = tracing_appender::rolling::daily(log_dir, "quotd-widget.log");
      let (writer, guard) = tracing_appender::non_blocking(appender);
      tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .init();
      Some(guard)
    }
    _ => {
      tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
      None
    }
  };

  let app = app::App::new(config)?;

  match args.command {
    Command::Today => app.today().await,
    Command::History { limit } => app.history(limit).await,
    Command::Annotate { id, memo, emotion } => app.annotate(&id, memo.as_deref(), emotion).await,
    Command::Sync => app.sync().await,
    Command::Goal { topic } => app.goal(topic).await,
    Command::Widget => app.widget().await,
  }
}

fn env_filter() -> EnvFilter {
  EnvFilter::try_from_env("QUOTD_LOG").unwrap_or_else(|_| EnvFilter::new("info"))
}

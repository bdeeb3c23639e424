use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use daemon::{Daemon, Stores};
use driftnet_core::Config;
use notifier::LogSink;
use std::path::PathBuf;
use std::sync::Arc;
use transmission::{AddOptions, Client, classify, eta, magnet_display_name};

mod logging;

#[derive(Parser)]
#[command(name = "driftnet")]
#[command(about = "Feed-driven download automation for a Transmission-compatible daemon")]
struct Cli {
  /// Path to the configuration file
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run the daemon
  Run {
    /// Log to the console instead of the rolling log file
    #[arg(long)]
    foreground: bool,
  },
  /// Submit a magnet link to the download daemon
  Add {
    /// Torrent magnet link
    uri: String,
    /// Sub-directory under the configured download directory
    #[arg(long)]
    dir: Option<String>,
  },
  /// List unfinished downloads
  List,
  /// Show daemon session statistics
  Status,
  /// Load and validate the configuration, then exit
  CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  let config = Config::load_or_default(cli.config.as_deref()).context("failed to load config")?;

  match cli.command {
    Commands::Run { foreground } => {
      let _guard = logging::init_daemon_logging(&config.log, foreground);
      let daemon = Daemon::new(config, Stores::in_memory(), Arc::new(LogSink));
      daemon.run().await.context("daemon exited with error")?;
    }
    Commands::Add { uri, dir } => {
      logging::init_cli_logging();
      let name = magnet_display_name(&uri).context("not a usable magnet link")?;
      let client = Client::connect(&config.transmission)
        .await
        .context("failed to connect to download daemon")?;
      let id = client
        .add_link(&uri, AddOptions { subdirectory: dir })
        .await
        .context("failed to add link")?;
      println!("Added {name} as torrent {id}");
    }
    Commands::List => {
      logging::init_cli_logging();
      let client = Client::connect(&config.transmission)
        .await
        .context("failed to connect to download daemon")?;
      let torrents = client.list_torrents(&[]).await.context("failed to list torrents")?;
      let classified = classify(torrents);

      if classified.active.is_empty() {
        println!("No active downloads");
      }
      for torrent in &classified.active {
        let remaining = match eta(torrent) {
          Some(left) => format!("{}s left", left.as_secs()),
          None => "stalled".to_string(),
        };
        println!("{torrent} - {remaining}");
      }
      println!("{} completed", classified.completed.len());
    }
    Commands::Status => {
      logging::init_cli_logging();
      let client = Client::connect(&config.transmission)
        .await
        .context("failed to connect to download daemon")?;
      let stats = client.session_stats().await.context("failed to get session stats")?;
      println!("{stats}");
    }
    Commands::CheckConfig => {
      println!("config ok");
      println!(
        "  transmission endpoint: {}\n  agents: {}\n  subjects: {}",
        config.transmission.endpoint,
        config.agents.len(),
        config.subjects.len()
      );
    }
  }

  Ok(())
}

//! Daemon assembly: builds every component and runs the long-lived tasks.

use driftnet_core::{Config, resolve_subjects};
use feed::{History, HttpFeedSource, Scanner, SerialDownloader};
use notifier::{ChatSink, Dispatcher, PrivateMessenger, SubscriptionSet};
use std::sync::Arc;
use store::{MemoryStore, NotificationStore, PrivateChannelStore, TorrentStore};
use thiserror::Error;
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use transmission::Client;

use crate::scrape::Scraper;

#[derive(Error, Debug)]
pub enum LifecycleError {
  #[error("Config: {0}")]
  Config(#[from] driftnet_core::Error),

  #[error("Transmission: {0}")]
  Transmission(#[from] transmission::TransmissionError),

  #[error("Feed: {0}")]
  Feed(#[from] feed::FeedError),
}

/// The persisted-store interfaces the daemon writes through. A deployment
/// plugs its own backend in here; [`Stores::in_memory`] backs all three with
/// the reference implementation.
pub struct Stores {
  pub torrents: Arc<dyn TorrentStore>,
  pub channels: Arc<dyn PrivateChannelStore>,
  pub recipients: Arc<dyn NotificationStore>,
}

impl Stores {
  pub fn in_memory() -> Self {
    let store = Arc::new(MemoryStore::new());
    Self {
      torrents: store.clone(),
      channels: store.clone(),
      recipients: store,
    }
  }
}

pub struct Daemon {
  config: Config,
  stores: Stores,
  sink: Arc<dyn ChatSink>,
  subscriptions: Arc<SubscriptionSet>,
}

impl Daemon {
  pub fn new(config: Config, stores: Stores, sink: Arc<dyn ChatSink>) -> Self {
    Self {
      config,
      stores,
      sink,
      subscriptions: Arc::new(SubscriptionSet::new()),
    }
  }

  /// The toggleable subscription set, shared with the command layer
  pub fn subscriptions(&self) -> Arc<SubscriptionSet> {
    Arc::clone(&self.subscriptions)
  }

  /// Run until ctrl-c. Bootstrap failures (bad config, unreachable daemon)
  /// are fatal; once the loops are up, their failures are handled inside
  /// each loop and never propagate here.
  pub async fn run(self) -> Result<(), LifecycleError> {
    info!("Starting driftnet daemon");
    info!(endpoint = %self.config.transmission.endpoint, "Connecting to download daemon");
    let client = Arc::new(Client::connect(&self.config.transmission).await?);

    let subjects = resolve_subjects(&self.config.subjects, &self.config.agents)?;
    info!(subjects = subjects.len(), "Resolved subjects");

    let cancel = CancellationToken::new();

    // Scanner feeds the serial downloader over a bounded channel
    let (links_tx, links_rx) = mpsc::channel(10);
    let downloader = SerialDownloader::new(self.config.scan.download_dir.clone());
    let downloader_handle = tokio::spawn(downloader.wait(cancel.clone(), links_rx));

    let source = HttpFeedSource::new(self.config.scan.fetch_timeout())?;
    let scanner = Scanner::new(source, History::new(self.config.scan.history_len));
    let scanner_handle = tokio::spawn(scanner.run(
      cancel.clone(),
      self.config.scan.period(),
      Arc::new(subjects),
      links_tx,
    ));

    // Scraper feeds the dispatcher over a bounded channel
    let (events_tx, events_rx) = mpsc::channel(self.config.notify.event_buffer);
    let scraper = Scraper::new(client.clone(), Arc::clone(&self.stores.torrents), events_tx);
    let scraper_handle = tokio::spawn(scraper.run(
      cancel.clone(),
      self.config.scrape.min_period(),
      self.config.scrape.max_period(),
    ));

    let private = Arc::new(PrivateMessenger::new(
      Arc::clone(&self.sink),
      Arc::clone(&self.stores.channels),
      self.config.notify.private_channel_ttl(),
    ));
    let gc_handle = tokio::spawn(Arc::clone(&private).run_gc(cancel.clone(), self.config.notify.gc_interval()));

    let dispatcher = Dispatcher::new(
      Arc::clone(&self.stores.recipients),
      Arc::clone(&self.sink),
      private,
      Arc::clone(&self.subscriptions),
    );
    let dispatcher_handle = tokio::spawn(dispatcher.run(cancel.clone(), events_rx));

    // Ctrl-c flips the shared token; every loop observes it
    let shutdown = cancel.clone();
    tokio::spawn(async move {
      if let Err(e) = signal::ctrl_c().await {
        warn!(err = %e, "Failed to listen for ctrl-c");
        return;
      }
      info!("Received ctrl-c, shutting down");
      shutdown.cancel();
    });

    let _ = tokio::join!(
      scanner_handle,
      downloader_handle,
      scraper_handle,
      dispatcher_handle,
      gc_handle
    );
    info!("Daemon shutdown complete");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use driftnet_core::TransmissionConfig;
  use notifier::LogSink;

  #[test]
  fn test_in_memory_stores_share_one_backend() {
    let stores = Stores::in_memory();
    // All three interfaces are live
    let _ = &stores.torrents;
    let _ = &stores.channels;
    let _ = &stores.recipients;
  }

  #[tokio::test]
  async fn test_unreachable_daemon_is_a_fatal_bootstrap_error() {
    let config = Config {
      transmission: TransmissionConfig {
        // Nothing listens here
        endpoint: "http://127.0.0.1:1".to_string(),
        request_timeout_secs: 1,
        ..Default::default()
      },
      ..Default::default()
    };

    let daemon = Daemon::new(config, Stores::in_memory(), Arc::new(LogSink));
    let err = daemon.run().await.unwrap_err();
    assert!(matches!(err, LifecycleError::Transmission(_)));
  }
}

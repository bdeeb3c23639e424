//! Reconciliation between daemon-reported state and the persisted store.

use chrono::{DateTime, TimeZone, Utc};
use driftnet_core::Torrent;
use std::sync::Arc;
use std::time::Duration;
use store::TorrentStore;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use transmission::{DownloadDaemon, RpcTorrent};

/// Adaptive polling period: halved on success (floored at min), doubled on
/// failure (capped at max), starting at min.
#[derive(Debug, Clone)]
pub struct Backoff {
  current: Duration,
  min: Duration,
  max: Duration,
}

impl Backoff {
  pub fn new(min: Duration, max: Duration) -> Self {
    Self { current: min, min, max }
  }

  pub fn current(&self) -> Duration {
    self.current
  }

  pub fn success(&mut self) {
    self.current = (self.current / 2).max(self.min);
  }

  pub fn failure(&mut self) {
    self.current = (self.current * 2).min(self.max);
  }
}

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
  #[error("Daemon: {0}")]
  Daemon(#[from] transmission::TransmissionError),

  #[error("Store: {0}")]
  Store(#[from] store::StoreError),
}

fn timestamp(epoch_secs: i64) -> Option<DateTime<Utc>> {
  if epoch_secs <= 0 {
    return None;
  }
  Utc.timestamp_opt(epoch_secs, 0).single()
}

/// Map a daemon record onto the persisted model.
///
/// The completion timestamp comes from the daemon's done date; when the
/// daemon reports the payload fully downloaded without one, it is stamped
/// now. The store keeps whichever value was written first.
pub fn map_torrent(rpc: &RpcTorrent) -> Torrent {
  let completed_at = timestamp(rpc.done_date).or_else(|| {
    if rpc.total_size > 0 && rpc.downloaded_ever >= rpc.total_size {
      Some(Utc::now())
    } else {
      None
    }
  });

  Torrent {
    id: rpc.id.to_string(),
    name: rpc.name.clone(),
    created_at: timestamp(rpc.added_date).unwrap_or_else(Utc::now),
    started_at: timestamp(rpc.start_date),
    completed_at,
    status: rpc.status.code(),
    source_uri: rpc.magnet_link.clone(),
    total_size: rpc.total_size,
    downloaded: rpc.downloaded_ever,
    uploaded: rpc.uploaded_ever,
    metadata: None,
  }
}

pub struct Scraper {
  daemon: Arc<dyn DownloadDaemon>,
  store: Arc<dyn TorrentStore>,
  events: mpsc::Sender<Torrent>,
}

impl Scraper {
  pub fn new(daemon: Arc<dyn DownloadDaemon>, store: Arc<dyn TorrentStore>, events: mpsc::Sender<Torrent>) -> Self {
    Self { daemon, store, events }
  }

  /// One reconciliation pass over every torrent the daemon reports, in the
  /// order the daemon returns them.
  pub async fn scrape(&self) -> Result<(), ScrapeError> {
    let torrents = self.daemon.list_torrents(&[]).await?;
    debug!(count = torrents.len(), "Scraped torrents from daemon");

    for rpc in &torrents {
      let torrent = map_torrent(rpc);
      let outcome = self.store.upsert_torrent(&torrent).await?;
      if outcome.newly_completed {
        // Non-blocking hand-off: a stalled dispatcher must not stall
        // reconciliation
        if let Err(e) = self.events.try_send(torrent) {
          warn!(err = %e, "Dropped completion event");
        }
      }
    }
    Ok(())
  }

  /// Poll until cancelled. Failures are logged and widen the period; they
  /// never terminate the loop.
  pub async fn run(self, cancel: CancellationToken, min_period: Duration, max_period: Duration) {
    info!(
      min_secs = min_period.as_secs(),
      max_secs = max_period.as_secs(),
      "Starting scrape loop"
    );
    let mut backoff = Backoff::new(min_period, max_period);

    loop {
      if cancel.is_cancelled() {
        debug!("Scrape loop cancelled");
        return;
      }

      match self.scrape().await {
        Ok(()) => backoff.success(),
        Err(e) => {
          error!(err = %e, "Scrape failed");
          backoff.failure();
        }
      }

      tokio::select! {
        _ = cancel.cancelled() => {
          debug!("Scrape loop cancelled");
          return;
        }
        _ = tokio::time::sleep(backoff.current()) => {}
      }
    }
  }
}

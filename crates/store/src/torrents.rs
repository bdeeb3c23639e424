//! Torrent upsert store.

use async_trait::async_trait;
use driftnet_core::Torrent;

use crate::Result;

/// What a single upsert did to the stored record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpsertOutcome {
  /// False when the incoming record matched the stored one and the write was skipped
  pub changed: bool,

  /// True exactly when the stored record had no completion timestamp and the
  /// written record has one. The scrape loop turns this into a notification.
  pub newly_completed: bool,
}

/// Transactional key-addressed upsert store for torrent records.
///
/// Implementations must compare the incoming record to the stored one, skip
/// the write when nothing changed, and never clear an existing completion
/// timestamp: once `completed_at` is set it is carried forward even if the
/// incoming record lacks it.
#[async_trait]
pub trait TorrentStore: Send + Sync {
  async fn upsert_torrent(&self, torrent: &Torrent) -> Result<UpsertOutcome>;

  async fn get_torrent(&self, id: &str) -> Result<Option<Torrent>>;

  async fn list_torrents(&self) -> Result<Vec<Torrent>>;
}

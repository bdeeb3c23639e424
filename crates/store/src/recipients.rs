//! Per-torrent notification recipients.

use async_trait::async_trait;
use driftnet_core::NotificationTarget;

use crate::Result;

/// Opt-in notification registrations, keyed by torrent id. Distinct from the
/// process-lifetime channel-subscription toggle: these are persisted and
/// per-torrent.
#[async_trait]
pub trait NotificationStore: Send + Sync {
  async fn add_recipient(&self, torrent_id: &str, target: NotificationTarget) -> Result<()>;

  async fn recipients_for(&self, torrent_id: &str) -> Result<Vec<NotificationTarget>>;

  /// Drop all registrations for a torrent
  async fn clear_recipients(&self, torrent_id: &str) -> Result<()>;
}

//! Private-channel directory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use driftnet_core::PrivateChannel;

use crate::Result;

/// Persisted directory of lazily-created direct channels
#[async_trait]
pub trait PrivateChannelStore: Send + Sync {
  async fn get_channel_for(&self, recipient_id: &str) -> Result<Option<PrivateChannel>>;

  async fn upsert_channel(&self, channel: &PrivateChannel) -> Result<()>;

  /// Update `last_message_at` for an existing channel
  async fn bump_channel(&self, id: &str, at: DateTime<Utc>) -> Result<()>;

  async fn delete_channel(&self, id: &str) -> Result<()>;

  async fn list_channels(&self) -> Result<Vec<PrivateChannel>>;
}

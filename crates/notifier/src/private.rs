//! Private messaging with lazily-created channels and TTL garbage collection.

use chrono::{Duration as ChronoDuration, Utc};
use driftnet_core::PrivateChannel;
use std::sync::Arc;
use std::time::Duration;
use store::PrivateChannelStore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{ChatSink, NotifyError};

pub struct PrivateMessenger {
  sink: Arc<dyn ChatSink>,
  store: Arc<dyn PrivateChannelStore>,
  ttl: ChronoDuration,
}

impl PrivateMessenger {
  pub fn new(sink: Arc<dyn ChatSink>, store: Arc<dyn PrivateChannelStore>, ttl: Duration) -> Self {
    Self {
      sink,
      store,
      ttl: ChronoDuration::from_std(ttl).unwrap_or(ChronoDuration::MAX),
    }
  }

  /// Send text to a recipient, creating and persisting the direct channel on
  /// first use. Every send bumps `last_message_at`. Returns the channel id.
  pub async fn send(&self, recipient_id: &str, text: &str) -> Result<String, NotifyError> {
    let channel = match self.store.get_channel_for(recipient_id).await? {
      Some(channel) => channel,
      None => {
        let id = self.sink.create_direct_channel(recipient_id).await?;
        debug!(recipient = recipient_id, channel = %id, "Created private channel");
        let now = Utc::now();
        let channel = PrivateChannel {
          id,
          recipient_id: recipient_id.to_string(),
          created_at: now,
          last_message_at: now,
        };
        self.store.upsert_channel(&channel).await?;
        channel
      }
    };

    self.sink.send_channel_message(&channel.id, text).await?;
    self.store.bump_channel(&channel.id, Utc::now()).await?;
    Ok(channel.id)
  }

  /// One garbage-collection pass. Channels idle past the TTL are deleted at
  /// the platform first, then from the store; per-channel failures are logged
  /// and the sweep continues.
  pub async fn collect_expired(&self) -> Result<usize, NotifyError> {
    let now = Utc::now();
    let mut deleted = 0;

    for channel in self.store.list_channels().await? {
      if !channel.expired(self.ttl, now) {
        continue;
      }
      info!(channel = %channel.id, recipient = %channel.recipient_id, "Deleting idle private channel");
      if let Err(e) = self.sink.delete_channel(&channel.id).await {
        error!(channel = %channel.id, err = %e, "Failed deleting channel at platform");
        continue;
      }
      if let Err(e) = self.store.delete_channel(&channel.id).await {
        error!(channel = %channel.id, err = %e, "Failed deleting channel from store");
        continue;
      }
      deleted += 1;
    }

    Ok(deleted)
  }

  /// Periodic GC task, independent of the send path
  pub async fn run_gc(self: Arc<Self>, cancel: CancellationToken, interval: Duration) {
    info!(interval_secs = interval.as_secs(), "Starting private channel GC");
    let mut ticker = tokio::time::interval(interval);
    // Skip the immediate tick
    ticker.tick().await;

    loop {
      tokio::select! {
        _ = cancel.cancelled() => {
          debug!("Private channel GC cancelled");
          return;
        }
        _ = ticker.tick() => {}
      }

      match self.collect_expired().await {
        Ok(0) => {}
        Ok(deleted) => info!(deleted, "Private channel GC pass complete"),
        Err(e) => error!(err = %e, "Private channel GC pass failed"),
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use async_trait::async_trait;
  use std::sync::Mutex;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use store::MemoryStore;

  #[derive(Default)]
  struct RecordingSink {
    sent: Mutex<Vec<(String, String)>>,
    created: AtomicUsize,
    deleted: Mutex<Vec<String>>,
    fail_deletes: bool,
  }

  #[async_trait]
  impl ChatSink for RecordingSink {
    async fn send_channel_message(&self, channel_id: &str, text: &str) -> Result<(), NotifyError> {
      self
        .sent
        .lock()
        .unwrap()
        .push((channel_id.to_string(), text.to_string()));
      Ok(())
    }

    async fn create_direct_channel(&self, recipient_id: &str) -> Result<String, NotifyError> {
      self.created.fetch_add(1, Ordering::SeqCst);
      Ok(format!("dm-{recipient_id}"))
    }

    async fn delete_channel(&self, channel_id: &str) -> Result<(), NotifyError> {
      if self.fail_deletes {
        return Err(NotifyError::Platform("delete refused".to_string()));
      }
      self.deleted.lock().unwrap().push(channel_id.to_string());
      Ok(())
    }
  }

  fn channel(id: &str, recipient: &str, idle: ChronoDuration) -> PrivateChannel {
    let now = Utc::now();
    PrivateChannel {
      id: id.to_string(),
      recipient_id: recipient.to_string(),
      created_at: now - idle,
      last_message_at: now - idle,
    }
  }

  #[tokio::test]
  async fn test_channel_created_once_and_reused() {
    let sink = Arc::new(RecordingSink::default());
    let store = Arc::new(MemoryStore::new());
    let messenger = PrivateMessenger::new(sink.clone(), store.clone(), Duration::from_secs(3600));

    let first = messenger.send("u1", "hello").await.unwrap();
    let second = messenger.send("u1", "again").await.unwrap();

    assert_eq!(first, "dm-u1");
    assert_eq!(first, second);
    assert_eq!(sink.created.load(Ordering::SeqCst), 1);
    assert_eq!(sink.sent.lock().unwrap().len(), 2);
  }

  #[tokio::test]
  async fn test_send_bumps_last_message_at() {
    let sink = Arc::new(RecordingSink::default());
    let store = Arc::new(MemoryStore::new());
    let messenger = PrivateMessenger::new(sink, store.clone(), Duration::from_secs(3600));

    let stale = channel("dm-u1", "u1", ChronoDuration::hours(10));
    let before = stale.last_message_at;
    store.upsert_channel(&stale).await.unwrap();

    messenger.send("u1", "ping").await.unwrap();

    let bumped = store.get_channel_for("u1").await.unwrap().unwrap();
    assert!(bumped.last_message_at > before);
  }

  #[tokio::test]
  async fn test_gc_deletes_only_expired() {
    let sink = Arc::new(RecordingSink::default());
    let store = Arc::new(MemoryStore::new());
    let ttl = Duration::from_secs(3600);
    let messenger = PrivateMessenger::new(sink.clone(), store.clone(), ttl);

    store
      .upsert_channel(&channel("old", "u1", ChronoDuration::seconds(3601)))
      .await
      .unwrap();
    store
      .upsert_channel(&channel("fresh", "u2", ChronoDuration::seconds(3599)))
      .await
      .unwrap();

    let deleted = messenger.collect_expired().await.unwrap();
    assert_eq!(deleted, 1);
    assert_eq!(sink.deleted.lock().unwrap().as_slice(), ["old".to_string()]);

    let remaining = store.list_channels().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, "fresh");
  }

  #[tokio::test]
  async fn test_gc_keeps_store_row_when_platform_delete_fails() {
    let sink = Arc::new(RecordingSink {
      fail_deletes: true,
      ..Default::default()
    });
    let store = Arc::new(MemoryStore::new());
    let messenger = PrivateMessenger::new(sink, store.clone(), Duration::from_secs(3600));

    store
      .upsert_channel(&channel("old", "u1", ChronoDuration::hours(2)))
      .await
      .unwrap();

    let deleted = messenger.collect_expired().await.unwrap();
    assert_eq!(deleted, 0);
    assert_eq!(store.list_channels().await.unwrap().len(), 1);
  }
}

//! In-memory reference implementation of the store traits.
//!
//! Backs the daemon when no external store is wired in, and every test that
//! needs store semantics without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use driftnet_core::{NotificationTarget, PrivateChannel, Torrent};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::channels::PrivateChannelStore;
use crate::recipients::NotificationStore;
use crate::torrents::{TorrentStore, UpsertOutcome};
use crate::{Result, StoreError};

#[derive(Default)]
pub struct MemoryStore {
  torrents: RwLock<HashMap<String, Torrent>>,
  channels: RwLock<HashMap<String, PrivateChannel>>,
  recipients: RwLock<HashMap<String, Vec<NotificationTarget>>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl TorrentStore for MemoryStore {
  async fn upsert_torrent(&self, torrent: &Torrent) -> Result<UpsertOutcome> {
    let mut torrents = self.torrents.write().await;
    let mut incoming = torrent.clone();

    match torrents.get(&incoming.id) {
      Some(existing) => {
        // Carry forward what the incoming record does not know
        if incoming.metadata.is_none() {
          incoming.metadata = existing.metadata.clone();
        }
        // A completion timestamp is written once; the stored value wins over
        // any later-reported one and is never cleared
        if existing.completed_at.is_some() {
          incoming.completed_at = existing.completed_at;
        }

        if &incoming == existing {
          return Ok(UpsertOutcome::default());
        }

        let newly_completed = existing.completed_at.is_none() && incoming.completed_at.is_some();
        torrents.insert(incoming.id.clone(), incoming);
        Ok(UpsertOutcome {
          changed: true,
          newly_completed,
        })
      }
      None => {
        let newly_completed = incoming.completed_at.is_some();
        torrents.insert(incoming.id.clone(), incoming);
        Ok(UpsertOutcome {
          changed: true,
          newly_completed,
        })
      }
    }
  }

  async fn get_torrent(&self, id: &str) -> Result<Option<Torrent>> {
    Ok(self.torrents.read().await.get(id).cloned())
  }

  async fn list_torrents(&self) -> Result<Vec<Torrent>> {
    let torrents = self.torrents.read().await;
    let mut all: Vec<Torrent> = torrents.values().cloned().collect();
    all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Ok(all)
  }
}

#[async_trait]
impl PrivateChannelStore for MemoryStore {
  async fn get_channel_for(&self, recipient_id: &str) -> Result<Option<PrivateChannel>> {
    let channels = self.channels.read().await;
    Ok(channels.values().find(|c| c.recipient_id == recipient_id).cloned())
  }

  async fn upsert_channel(&self, channel: &PrivateChannel) -> Result<()> {
    self.channels.write().await.insert(channel.id.clone(), channel.clone());
    Ok(())
  }

  async fn bump_channel(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
    let mut channels = self.channels.write().await;
    let channel = channels.get_mut(id).ok_or(StoreError::NotFound {
      entity: "private_channel",
      id: id.to_string(),
    })?;
    channel.last_message_at = at;
    Ok(())
  }

  async fn delete_channel(&self, id: &str) -> Result<()> {
    self.channels.write().await.remove(id);
    Ok(())
  }

  async fn list_channels(&self) -> Result<Vec<PrivateChannel>> {
    Ok(self.channels.read().await.values().cloned().collect())
  }
}

#[async_trait]
impl NotificationStore for MemoryStore {
  async fn add_recipient(&self, torrent_id: &str, target: NotificationTarget) -> Result<()> {
    let mut recipients = self.recipients.write().await;
    recipients.entry(torrent_id.to_string()).or_default().push(target);
    Ok(())
  }

  async fn recipients_for(&self, torrent_id: &str) -> Result<Vec<NotificationTarget>> {
    let recipients = self.recipients.read().await;
    Ok(recipients.get(torrent_id).cloned().unwrap_or_default())
  }

  async fn clear_recipients(&self, torrent_id: &str) -> Result<()> {
    self.recipients.write().await.remove(torrent_id);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;

  fn torrent(id: &str) -> Torrent {
    Torrent {
      id: id.to_string(),
      name: format!("{id}.mkv"),
      created_at: Utc::now(),
      started_at: None,
      completed_at: None,
      status: 4,
      source_uri: String::new(),
      total_size: 100,
      downloaded: 10,
      uploaded: 0,
      metadata: None,
    }
  }

  #[tokio::test]
  async fn test_upsert_inserts_then_skips_unchanged() {
    let store = MemoryStore::new();
    let t = torrent("1");

    let first = store.upsert_torrent(&t).await.unwrap();
    assert!(first.changed);
    assert!(!first.newly_completed);

    let second = store.upsert_torrent(&t).await.unwrap();
    assert!(!second.changed);
    assert!(!second.newly_completed);
  }

  #[tokio::test]
  async fn test_completion_transition_signaled_once() {
    let store = MemoryStore::new();
    let mut t = torrent("1");
    store.upsert_torrent(&t).await.unwrap();

    t.downloaded = t.total_size;
    t.completed_at = Some(Utc::now());
    let outcome = store.upsert_torrent(&t).await.unwrap();
    assert!(outcome.newly_completed);

    // Same completed record again: no write, no signal
    let outcome = store.upsert_torrent(&t).await.unwrap();
    assert!(!outcome.changed);
    assert!(!outcome.newly_completed);

    // Changed but still completed: write, no second signal
    t.uploaded = 50;
    let outcome = store.upsert_torrent(&t).await.unwrap();
    assert!(outcome.changed);
    assert!(!outcome.newly_completed);
  }

  #[tokio::test]
  async fn test_completed_at_never_cleared() {
    let store = MemoryStore::new();
    let mut t = torrent("1");
    let done = Utc::now();
    t.completed_at = Some(done);
    store.upsert_torrent(&t).await.unwrap();

    // Incoming record without the timestamp must not erase it
    t.completed_at = None;
    t.uploaded = 5;
    store.upsert_torrent(&t).await.unwrap();

    let stored = store.get_torrent("1").await.unwrap().unwrap();
    assert_eq!(stored.completed_at, Some(done));
  }

  #[tokio::test]
  async fn test_completed_at_not_overwritten_by_later_timestamp() {
    let store = MemoryStore::new();
    let mut t = torrent("1");
    let first = Utc::now();
    t.completed_at = Some(first);
    store.upsert_torrent(&t).await.unwrap();

    t.completed_at = Some(first + Duration::minutes(5));
    let outcome = store.upsert_torrent(&t).await.unwrap();
    assert!(!outcome.changed);

    let stored = store.get_torrent("1").await.unwrap().unwrap();
    assert_eq!(stored.completed_at, Some(first));
  }

  #[tokio::test]
  async fn test_first_sight_already_complete_counts() {
    let store = MemoryStore::new();
    let mut t = torrent("1");
    t.completed_at = Some(Utc::now());

    let outcome = store.upsert_torrent(&t).await.unwrap();
    assert!(outcome.newly_completed);
  }

  #[tokio::test]
  async fn test_metadata_survives_metadata_less_upsert() {
    let store = MemoryStore::new();
    let mut t = torrent("1");
    t.metadata = Some(driftnet_core::TorrentMetadata {
      friendly_name: "My Show".to_string(),
      ..Default::default()
    });
    store.upsert_torrent(&t).await.unwrap();

    t.metadata = None;
    t.downloaded = 20;
    store.upsert_torrent(&t).await.unwrap();

    let stored = store.get_torrent("1").await.unwrap().unwrap();
    assert_eq!(stored.metadata.unwrap().friendly_name, "My Show");
  }

  #[tokio::test]
  async fn test_list_orders_by_created_at() {
    let store = MemoryStore::new();
    let mut older = torrent("old");
    older.created_at = Utc::now() - Duration::hours(1);
    let newer = torrent("new");

    store.upsert_torrent(&newer).await.unwrap();
    store.upsert_torrent(&older).await.unwrap();

    let all = store.list_torrents().await.unwrap();
    assert_eq!(all[0].id, "old");
    assert_eq!(all[1].id, "new");
  }

  #[tokio::test]
  async fn test_channel_lifecycle() {
    let store = MemoryStore::new();
    let now = Utc::now();
    let channel = PrivateChannel {
      id: "c1".to_string(),
      recipient_id: "u1".to_string(),
      created_at: now,
      last_message_at: now,
    };

    store.upsert_channel(&channel).await.unwrap();
    assert!(store.get_channel_for("u1").await.unwrap().is_some());
    assert!(store.get_channel_for("u2").await.unwrap().is_none());

    let later = now + Duration::minutes(5);
    store.bump_channel("c1", later).await.unwrap();
    let bumped = store.get_channel_for("u1").await.unwrap().unwrap();
    assert_eq!(bumped.last_message_at, later);

    store.delete_channel("c1").await.unwrap();
    assert!(store.list_channels().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_bump_missing_channel_is_not_found() {
    let store = MemoryStore::new();
    let err = store.bump_channel("ghost", Utc::now()).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
  }

  #[tokio::test]
  async fn test_recipients_roundtrip() {
    let store = MemoryStore::new();
    store
      .add_recipient("42", NotificationTarget::private("u1"))
      .await
      .unwrap();
    store
      .add_recipient("42", NotificationTarget::channel("c1"))
      .await
      .unwrap();

    let targets = store.recipients_for("42").await.unwrap();
    assert_eq!(targets.len(), 2);
    assert!(store.recipients_for("7").await.unwrap().is_empty());

    store.clear_recipients("42").await.unwrap();
    assert!(store.recipients_for("42").await.unwrap().is_empty());
  }
}

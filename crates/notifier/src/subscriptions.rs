//! Process-lifetime channel subscription set.

use std::collections::HashSet;
use std::sync::RwLock;

/// Toggleable set of channel ids. Reads happen on every dispatch and writes
/// only on toggle, hence the reader/writer lock. Deliberately not persisted:
/// a restart clears all subscriptions.
#[derive(Debug, Default)]
pub struct SubscriptionSet {
  channels: RwLock<HashSet<String>>,
}

impl SubscriptionSet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Flip membership; returns true when the channel is subscribed afterwards
  pub fn toggle(&self, channel_id: &str) -> bool {
    let mut channels = self.channels.write().expect("subscription lock poisoned");
    if channels.remove(channel_id) {
      false
    } else {
      channels.insert(channel_id.to_string());
      true
    }
  }

  pub fn contains(&self, channel_id: &str) -> bool {
    self
      .channels
      .read()
      .expect("subscription lock poisoned")
      .contains(channel_id)
  }

  /// Copy of the current membership, taken under the read lock
  pub fn snapshot(&self) -> Vec<String> {
    self
      .channels
      .read()
      .expect("subscription lock poisoned")
      .iter()
      .cloned()
      .collect()
  }

  pub fn len(&self) -> usize {
    self.channels.read().expect("subscription lock poisoned").len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

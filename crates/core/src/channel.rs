//! Private-channel bookkeeping and per-torrent notification targets.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A direct channel created lazily on first private send.
///
/// `last_message_at` is bumped on every send; the GC pass deletes channels
/// whose last message is older than the configured TTL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivateChannel {
  /// Platform-assigned channel id
  pub id: String,
  pub recipient_id: String,
  pub created_at: DateTime<Utc>,
  pub last_message_at: DateTime<Utc>,
}

impl PrivateChannel {
  pub fn expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
    self
      .last_message_at
      .checked_add_signed(ttl)
      .is_some_and(|deadline| deadline < now)
  }
}

/// An opt-in, per-torrent notification recipient: either a user to message
/// privately or a channel to post into.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NotificationTarget {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub recipient_id: Option<String>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub channel_id: Option<String>,
}

impl NotificationTarget {
  pub fn private(recipient_id: impl Into<String>) -> Self {
    Self {
      recipient_id: Some(recipient_id.into()),
      channel_id: None,
    }
  }

  pub fn channel(channel_id: impl Into<String>) -> Self {
    Self {
      recipient_id: None,
      channel_id: Some(channel_id.into()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_expired_boundary() {
    let now = Utc::now();
    let ttl = Duration::hours(1);

    let mut channel = PrivateChannel {
      id: "c1".to_string(),
      recipient_id: "u1".to_string(),
      created_at: now - Duration::hours(10),
      last_message_at: now - ttl - Duration::seconds(1),
    };
    assert!(channel.expired(ttl, now));

    channel.last_message_at = now - ttl + Duration::seconds(1);
    assert!(!channel.expired(ttl, now));
  }
}

//! Torrent records as reconciled from the download daemon.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Optional side record carrying user-facing metadata for a torrent
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TorrentMetadata {
  pub friendly_name: String,
  pub categories: Vec<String>,
  pub labels: HashMap<String, String>,
}

/// A torrent as tracked across scrape iterations.
///
/// `completed_at` is set the first time the daemon reports the download as
/// complete and is never cleared afterwards; the store's upsert enforces this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Torrent {
  /// Daemon-assigned id, string-encoded
  pub id: String,
  pub name: String,
  pub created_at: DateTime<Utc>,
  pub started_at: Option<DateTime<Utc>>,
  pub completed_at: Option<DateTime<Utc>>,
  /// Raw status code as reported by the daemon
  pub status: i64,
  pub source_uri: String,
  pub total_size: u64,
  pub downloaded: u64,
  pub uploaded: u64,
  pub metadata: Option<TorrentMetadata>,
}

impl Torrent {
  pub fn percent_done(&self) -> f64 {
    if self.total_size == 0 {
      return 0.0;
    }
    self.downloaded as f64 / self.total_size as f64
  }

  pub fn is_complete(&self) -> bool {
    self.total_size > 0 && self.downloaded >= self.total_size
  }

  /// Metadata friendly name when present, otherwise the daemon-reported name
  pub fn display_name(&self) -> &str {
    if let Some(meta) = &self.metadata
      && !meta.friendly_name.is_empty()
    {
      return &meta.friendly_name;
    }
    &self.name
  }
}

impl fmt::Display for Torrent {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.is_complete() {
      write!(f, "{}: downloaded", self.display_name())
    } else {
      write!(f, "{}: {}% downloaded", self.display_name(), (self.percent_done() * 100.0) as u64)
    }
  }
}

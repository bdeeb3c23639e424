//! Wire types for the daemon's JSON request/response envelope.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const RPC_PATH: &str = "/transmission/rpc";
pub const SESSION_HEADER: &str = "X-Transmission-Session-Id";

/// Field set requested on every torrent-get call
pub const TORRENT_FIELDS: &[&str] = &[
  "id",
  "name",
  "addedDate",
  "startDate",
  "doneDate",
  "status",
  "percentDone",
  "totalSize",
  "downloadedEver",
  "uploadedEver",
  "rateDownload",
  "magnetLink",
  "isStalled",
];

#[derive(Debug, Serialize)]
pub struct RpcRequest<'a, T: Serialize> {
  pub method: &'a str,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub arguments: Option<T>,
  pub tag: String,
}

#[derive(Debug, Deserialize)]
pub struct RpcResponse<T> {
  pub result: String,
  pub arguments: T,
}

// ============================================================================
// torrent-add
// ============================================================================

#[derive(Debug, Serialize)]
pub struct AddTorrentArgs<'a> {
  pub filename: &'a str,
  #[serde(rename = "download-dir")]
  pub download_dir: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct AddTorrentResponse {
  #[serde(rename = "torrent-added")]
  pub torrent_added: Option<AddedTorrent>,
  #[serde(rename = "torrent-duplicate")]
  pub torrent_duplicate: Option<AddedTorrent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddedTorrent {
  pub id: i64,
  pub name: String,
  #[serde(rename = "hashString", default)]
  pub hash_string: String,
}

// ============================================================================
// torrent-get
// ============================================================================

#[derive(Debug, Serialize)]
pub struct TorrentGetArgs<'a> {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub ids: Option<Vec<i64>>,
  pub fields: &'a [&'a str],
}

#[derive(Debug, Default, Deserialize)]
pub struct TorrentListResponse {
  #[serde(default)]
  pub torrents: Vec<RpcTorrent>,
}

/// Daemon status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum TorrentStatus {
  Stopped,
  CheckWait,
  Check,
  DownloadWait,
  Download,
  SeedWait,
  Seed,
  Unknown(i64),
}

impl From<i64> for TorrentStatus {
  fn from(code: i64) -> Self {
    match code {
      0 => Self::Stopped,
      1 => Self::CheckWait,
      2 => Self::Check,
      3 => Self::DownloadWait,
      4 => Self::Download,
      5 => Self::SeedWait,
      6 => Self::Seed,
      other => Self::Unknown(other),
    }
  }
}

impl From<TorrentStatus> for i64 {
  fn from(status: TorrentStatus) -> Self {
    match status {
      TorrentStatus::Stopped => 0,
      TorrentStatus::CheckWait => 1,
      TorrentStatus::Check => 2,
      TorrentStatus::DownloadWait => 3,
      TorrentStatus::Download => 4,
      TorrentStatus::SeedWait => 5,
      TorrentStatus::Seed => 6,
      TorrentStatus::Unknown(other) => other,
    }
  }
}

impl Default for TorrentStatus {
  fn default() -> Self {
    Self::Stopped
  }
}

impl TorrentStatus {
  pub fn code(self) -> i64 {
    self.into()
  }
}

/// A torrent as reported by the daemon (fields from [`TORRENT_FIELDS`])
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RpcTorrent {
  pub id: i64,
  pub name: String,
  /// Epoch seconds; 0 means unset
  pub added_date: i64,
  pub start_date: i64,
  pub done_date: i64,
  pub status: TorrentStatus,
  pub percent_done: f64,
  pub total_size: u64,
  pub downloaded_ever: u64,
  pub uploaded_ever: u64,
  /// Bytes per second
  pub rate_download: i64,
  pub magnet_link: String,
  pub is_stalled: bool,
}

impl fmt::Display for RpcTorrent {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{}: {}({:.0}%)",
      self.name,
      format_bytes(self.total_size),
      self.percent_done * 100.0
    )
  }
}

/// Active/completed partition of a torrent list
#[derive(Debug, Default)]
pub struct Classified {
  /// Not stopped and not yet fully downloaded
  pub active: Vec<RpcTorrent>,
  /// Fully downloaded
  pub completed: Vec<RpcTorrent>,
}

pub fn classify(torrents: Vec<RpcTorrent>) -> Classified {
  let mut classified = Classified::default();
  for torrent in torrents {
    if torrent.percent_done >= 1.0 {
      classified.completed.push(torrent);
    } else if torrent.status != TorrentStatus::Stopped {
      classified.active.push(torrent);
    }
  }
  classified
}

/// Estimated time remaining. `None` means indeterminate: the torrent is
/// incomplete but nothing is being downloaded, so no estimate is computed.
pub fn eta(torrent: &RpcTorrent) -> Option<Duration> {
  if torrent.percent_done >= 1.0 {
    return Some(Duration::ZERO);
  }
  if torrent.rate_download <= 0 {
    return None;
  }
  let remaining = torrent.total_size.saturating_sub(torrent.downloaded_ever);
  Some(Duration::from_secs(remaining / torrent.rate_download as u64))
}

// ============================================================================
// session-stats
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionStats {
  pub active_torrent_count: i64,
  pub paused_torrent_count: i64,
  pub torrent_count: i64,
  pub download_speed: u64,
  pub upload_speed: u64,
  #[serde(rename = "cumulative-stats")]
  pub cumulative_stats: DetailedStats,
  #[serde(rename = "current-stats")]
  pub current_stats: DetailedStats,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetailedStats {
  pub uploaded_bytes: u64,
  pub downloaded_bytes: u64,
  pub files_added: i64,
  pub session_count: i64,
  pub seconds_active: i64,
}

impl fmt::Display for SessionStats {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "Active Torrent Count: {}", self.active_torrent_count)?;
    writeln!(f, "Paused Torrent Count: {}", self.paused_torrent_count)?;
    writeln!(f, "Total Torrent Count:  {}", self.torrent_count)?;
    writeln!(f, "Download Speed:       {}", format_rate(self.download_speed))?;
    writeln!(f, "Upload Speed:         {}", format_rate(self.upload_speed))?;
    writeln!(
      f,
      "Session: {} down / {} up across {} files",
      format_bytes(self.current_stats.downloaded_bytes),
      format_bytes(self.current_stats.uploaded_bytes),
      self.current_stats.files_added
    )?;
    write!(
      f,
      "All time: {} down / {} up across {} files",
      format_bytes(self.cumulative_stats.downloaded_bytes),
      format_bytes(self.cumulative_stats.uploaded_bytes),
      self.cumulative_stats.files_added
    )
  }
}

// ============================================================================
// Human-readable sizes
// ============================================================================

const SCALES: &[(u64, &str)] = &[
  (1_000_000_000_000, "T"),
  (1_000_000_000, "G"),
  (1_000_000, "M"),
  (1_000, "K"),
];

pub fn format_bytes(n: u64) -> String {
  for (scale, suffix) in SCALES {
    if n >= *scale {
      return format!("{:.1}{}", n as f64 / *scale as f64, suffix);
    }
  }
  n.to_string()
}

pub fn format_rate(n: u64) -> String {
  for (scale, suffix) in SCALES {
    if n >= *scale {
      return format!("{:.1}{}bps", n as f64 / *scale as f64, suffix);
    }
  }
  format!("{n}bps")
}

#[cfg(test)]
mod tests {
  use super::*;

  fn rpc_torrent(id: i64, percent: f64, status: TorrentStatus) -> RpcTorrent {
    RpcTorrent {
      id,
      name: format!("t{id}"),
      percent_done: percent,
      status,
      total_size: 1000,
      downloaded_ever: (1000.0 * percent) as u64,
      ..Default::default()
    }
  }

  #[test]
  fn test_status_from_code() {
    assert_eq!(TorrentStatus::from(0), TorrentStatus::Stopped);
    assert_eq!(TorrentStatus::from(4), TorrentStatus::Download);
    assert_eq!(TorrentStatus::from(6), TorrentStatus::Seed);
    assert_eq!(TorrentStatus::from(99), TorrentStatus::Unknown(99));
    assert_eq!(TorrentStatus::Unknown(99).code(), 99);
  }

  #[test]
  fn test_classify_partitions() {
    let torrents = vec![
      rpc_torrent(1, 0.5, TorrentStatus::Download),
      rpc_torrent(2, 1.0, TorrentStatus::Seed),
      rpc_torrent(3, 0.2, TorrentStatus::Stopped),
    ];
    let classified = classify(torrents);
    assert_eq!(classified.active.len(), 1);
    assert_eq!(classified.active[0].id, 1);
    assert_eq!(classified.completed.len(), 1);
    assert_eq!(classified.completed[0].id, 2);
    // Stopped and incomplete belongs to neither set
  }

  #[test]
  fn test_eta_indeterminate_when_stalled() {
    let mut torrent = rpc_torrent(1, 0.5, TorrentStatus::Download);
    torrent.rate_download = 0;
    assert_eq!(eta(&torrent), None);
  }

  #[test]
  fn test_eta_computed_from_rate() {
    let mut torrent = rpc_torrent(1, 0.5, TorrentStatus::Download);
    torrent.rate_download = 100;
    assert_eq!(eta(&torrent), Some(Duration::from_secs(5)));
  }

  #[test]
  fn test_eta_zero_when_complete() {
    let torrent = rpc_torrent(1, 1.0, TorrentStatus::Seed);
    assert_eq!(eta(&torrent), Some(Duration::ZERO));
  }

  #[test]
  fn test_format_bytes() {
    assert_eq!(format_bytes(512), "512");
    assert_eq!(format_bytes(1_500), "1.5K");
    assert_eq!(format_bytes(2_000_000), "2.0M");
    assert_eq!(format_bytes(3_500_000_000), "3.5G");
    assert_eq!(format_bytes(1_200_000_000_000), "1.2T");
  }

  #[test]
  fn test_format_rate() {
    assert_eq!(format_rate(0), "0bps");
    assert_eq!(format_rate(1_500_000), "1.5Mbps");
  }

  #[test]
  fn test_rpc_torrent_decodes_daemon_fields() {
    let body = r#"{
      "id": 42,
      "name": "show.mkv",
      "addedDate": 1700000000,
      "doneDate": 0,
      "status": 4,
      "percentDone": 0.25,
      "totalSize": 1000,
      "downloadedEver": 250,
      "uploadedEver": 10,
      "rateDownload": 100,
      "magnetLink": "magnet:?xt=urn:btih:aaa",
      "isStalled": false
    }"#;
    let torrent: RpcTorrent = serde_json::from_str(body).unwrap();
    assert_eq!(torrent.id, 42);
    assert_eq!(torrent.status, TorrentStatus::Download);
    assert_eq!(torrent.added_date, 1_700_000_000);
    assert_eq!(torrent.percent_done, 0.25);
    // Fields absent from the response fall back to defaults
    assert_eq!(torrent.start_date, 0);
  }

  #[test]
  fn test_request_envelope_shape() {
    let request = RpcRequest {
      method: "torrent-add",
      arguments: Some(AddTorrentArgs {
        filename: "magnet:?xt=urn:btih:aaa",
        download_dir: "/downloads/complete".to_string(),
      }),
      tag: "7".to_string(),
    };
    let encoded = serde_json::to_value(&request).unwrap();
    assert_eq!(encoded["method"], "torrent-add");
    assert_eq!(encoded["tag"], "7");
    assert_eq!(encoded["arguments"]["download-dir"], "/downloads/complete");
  }

  #[test]
  fn test_add_response_duplicate_variant() {
    let body = r#"{"torrent-duplicate": {"id": 42, "name": "show.mkv", "hashString": "aaa"}}"#;
    let response: AddTorrentResponse = serde_json::from_str(body).unwrap();
    assert!(response.torrent_added.is_none());
    assert_eq!(response.torrent_duplicate.unwrap().id, 42);
  }
}

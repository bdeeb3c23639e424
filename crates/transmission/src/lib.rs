//! RPC client for a Transmission-compatible download daemon.
//!
//! The daemon issues a rotating session token via a response header on a GET
//! to the RPC path; every POST carries it and an HTTP 409 means the token has
//! rotated and must be re-acquired before retrying (bounded).

pub mod client;
pub mod magnet;
pub mod types;

use async_trait::async_trait;

pub use client::{AddOptions, Client, SESSION_RETRY_LIMIT};
pub use magnet::magnet_display_name;
pub use types::{
  AddedTorrent, Classified, RpcTorrent, SessionStats, TorrentStatus, classify, eta, format_bytes, format_rate,
};

#[derive(Debug, thiserror::Error)]
pub enum TransmissionError {
  #[error("Session header missing from daemon response")]
  Session,

  #[error("Session conflicts exhausted after {0} attempts")]
  SessionExhausted(u32),

  #[error("Unexpected status code: {0}")]
  Rpc(reqwest::StatusCode),

  #[error("RPC result: {0}")]
  Protocol(String),

  #[error("Request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("Encode: {0}")]
  Encode(#[from] serde_json::Error),

  #[error("Magnet: {0}")]
  Magnet(String),
}

/// The daemon operations the rest of the system consumes. Abstracted so the
/// scrape loop and the command layer can be exercised against a scripted
/// daemon in tests.
#[async_trait]
pub trait DownloadDaemon: Send + Sync {
  /// Submit a source URI; returns the daemon-assigned id of the added or
  /// pre-existing (duplicate) torrent, string-encoded.
  async fn add_link(&self, uri: &str, options: AddOptions) -> Result<String, TransmissionError>;

  /// List all torrents, or only those matching `ids` when non-empty.
  async fn list_torrents(&self, ids: &[i64]) -> Result<Vec<RpcTorrent>, TransmissionError>;
}

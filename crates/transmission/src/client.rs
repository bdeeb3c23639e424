//! Session handling and the request/response protocol core.

use async_trait::async_trait;
use driftnet_core::TransmissionConfig;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::types::{
  AddTorrentArgs, AddTorrentResponse, RPC_PATH, RpcRequest, RpcResponse, RpcTorrent, SESSION_HEADER, SessionStats,
  TORRENT_FIELDS, TorrentGetArgs, TorrentListResponse,
};
use crate::{DownloadDaemon, TransmissionError};

/// How many times a single call may hit a 409 session conflict before the
/// call fails with [`TransmissionError::SessionExhausted`].
pub const SESSION_RETRY_LIMIT: u32 = 3;

/// Per-call options for submitting a link
#[derive(Debug, Clone, Default)]
pub struct AddOptions {
  /// Sub-directory under the configured download directory
  pub subdirectory: Option<String>,
}

/// RPC client. Cheap to share behind an `Arc`; the session token is internal
/// mutable state guarded by a mutex so a 409-triggered refresh cannot race a
/// concurrent call's use of a stale token.
pub struct Client {
  http: reqwest::Client,
  rpc_url: String,
  download_dir: String,
  session: Mutex<String>,
  tag: AtomicU64,
}

impl Client {
  pub fn new(config: &TransmissionConfig) -> Result<Self, TransmissionError> {
    let http = reqwest::Client::builder().timeout(config.request_timeout()).build()?;

    Ok(Self {
      http,
      rpc_url: format!("{}{}", config.endpoint.trim_end_matches('/'), RPC_PATH),
      download_dir: config.download_dir.clone(),
      session: Mutex::new(String::new()),
      tag: AtomicU64::new(1),
    })
  }

  /// Construct and verify connectivity by acquiring an initial session.
  /// Failure here is a bootstrap error and should be treated as fatal.
  pub async fn connect(config: &TransmissionConfig) -> Result<Self, TransmissionError> {
    let client = Self::new(config)?;
    {
      let mut session = client.session.lock().await;
      *session = client.fetch_session().await?;
    }
    Ok(client)
  }

  async fn fetch_session(&self) -> Result<String, TransmissionError> {
    debug!("Acquiring session");
    let response = self.http.get(&self.rpc_url).send().await?;
    let session = response
      .headers()
      .get(SESSION_HEADER)
      .and_then(|value| value.to_str().ok())
      .unwrap_or_default()
      .to_string();
    if session.is_empty() {
      return Err(TransmissionError::Session);
    }
    Ok(session)
  }

  async fn call_rpc<A: Serialize, R: DeserializeOwned>(
    &self,
    method: &str,
    arguments: Option<A>,
  ) -> Result<R, TransmissionError> {
    let tag = self.tag.fetch_add(1, Ordering::Relaxed).to_string();
    let body = serde_json::to_vec(&RpcRequest { method, arguments, tag })?;

    // The lock spans the whole call so a refresh is visible to every waiter
    // and nobody retries with a token already known stale.
    let mut session = self.session.lock().await;
    if session.is_empty() {
      *session = self.fetch_session().await?;
    }

    for attempt in 0..SESSION_RETRY_LIMIT {
      debug!(method, attempt, "Calling RPC");
      let response = self
        .http
        .post(&self.rpc_url)
        .header(SESSION_HEADER, session.as_str())
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body(body.clone())
        .send()
        .await?;

      let status = response.status();
      if status == reqwest::StatusCode::CONFLICT {
        warn!(method, "Session rotated by daemon, refreshing");
        *session = self.fetch_session().await?;
        continue;
      }
      if !status.is_success() {
        return Err(TransmissionError::Rpc(status));
      }

      let decoded: RpcResponse<R> = response.json().await?;
      if decoded.result != "success" {
        return Err(TransmissionError::Protocol(decoded.result));
      }
      return Ok(decoded.arguments);
    }

    Err(TransmissionError::SessionExhausted(SESSION_RETRY_LIMIT))
  }

  pub async fn add_link(&self, uri: &str, options: AddOptions) -> Result<String, TransmissionError> {
    let download_dir = match &options.subdirectory {
      Some(sub) => format!("{}/{}", self.download_dir.trim_end_matches('/'), sub),
      None => self.download_dir.clone(),
    };

    let args = AddTorrentArgs {
      filename: uri,
      download_dir,
    };
    let response: AddTorrentResponse = self.call_rpc("torrent-add", Some(args)).await?;

    let added = response
      .torrent_added
      .or(response.torrent_duplicate)
      .ok_or_else(|| TransmissionError::Protocol("torrent-add returned no torrent".to_string()))?;
    Ok(added.id.to_string())
  }

  pub async fn list_torrents(&self, ids: &[i64]) -> Result<Vec<RpcTorrent>, TransmissionError> {
    let args = TorrentGetArgs {
      ids: if ids.is_empty() { None } else { Some(ids.to_vec()) },
      fields: TORRENT_FIELDS,
    };
    let response: TorrentListResponse = self.call_rpc("torrent-get", Some(args)).await?;
    Ok(response.torrents)
  }

  pub async fn session_stats(&self) -> Result<SessionStats, TransmissionError> {
    self.call_rpc::<(), SessionStats>("session-stats", None).await
  }
}

#[async_trait]
impl DownloadDaemon for Client {
  async fn add_link(&self, uri: &str, options: AddOptions) -> Result<String, TransmissionError> {
    Client::add_link(self, uri, options).await
  }

  async fn list_torrents(&self, ids: &[i64]) -> Result<Vec<RpcTorrent>, TransmissionError> {
    Client::list_torrents(self, ids).await
  }
}

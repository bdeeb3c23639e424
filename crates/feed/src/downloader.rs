//! Serial download sink for plain (non-daemon) links.

use futures::StreamExt;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::FeedError;
use crate::scanner::DiscoveredLink;

/// Single sequential worker: one link at a time, errors logged and skipped,
/// never retried. The daemon-submission path does not go through here.
pub struct SerialDownloader {
  client: reqwest::Client,
  base_dir: PathBuf,
}

impl SerialDownloader {
  pub fn new(base_dir: impl Into<PathBuf>) -> Self {
    Self {
      client: reqwest::Client::new(),
      base_dir: base_dir.into(),
    }
  }

  /// Drain the channel until it closes or the token fires
  pub async fn wait(self, cancel: CancellationToken, mut links: mpsc::Receiver<DiscoveredLink>) {
    loop {
      tokio::select! {
        _ = cancel.cancelled() => {
          debug!("Downloader cancelled");
          return;
        }
        received = links.recv() => {
          let Some(request) = received else {
            debug!("Link channel closed");
            return;
          };
          if let Err(e) = self.download(&request).await {
            error!(name = %request.name, link = %request.link, err = %e, "Download failed");
          }
        }
      }
    }
  }

  async fn download(&self, request: &DiscoveredLink) -> Result<(), FeedError> {
    info!(name = %request.name, link = %request.link, "Downloading link");

    let response = self.client.get(&request.link).send().await?.error_for_status()?;
    let path = self.base_dir.join(sanitize_name(&request.name));

    let mut file = tokio::fs::File::create(&path).await?;
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
      file.write_all(&chunk?).await?;
    }
    file.flush().await?;
    Ok(())
  }
}

/// Item titles become file names; keep them inside the base directory
fn sanitize_name(name: &str) -> String {
  name
    .chars()
    .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_sanitize_strips_separators() {
    assert_eq!(sanitize_name("plain name.mkv"), "plain name.mkv");
    assert_eq!(sanitize_name("../escape"), ".._escape");
    assert_eq!(sanitize_name("a/b\\c"), "a_b_c");
  }

  #[test]
  fn test_target_path_stays_in_base_dir() {
    let downloader = SerialDownloader::new("/downloads/links");
    let path = downloader.base_dir.join(sanitize_name("../../etc/passwd"));
    assert!(path.starts_with("/downloads/links"));
  }
}

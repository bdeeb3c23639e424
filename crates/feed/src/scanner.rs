//! Feed scanner: fetch each subject's feed, apply match + dedup, emit
//! discovered links downstream.

use async_trait::async_trait;
use driftnet_core::Subject;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{FeedError, History};

/// One feed entry, reduced to what discovery needs
#[derive(Debug, Clone)]
pub struct FeedItem {
  pub title: String,
  pub link: String,
}

/// A discovered download, produced and consumed within one scan cycle
#[derive(Debug, Clone)]
pub struct DiscoveredLink {
  pub name: String,
  pub link: String,
}

/// Where feeds come from. The HTTP implementation is the real one; tests
/// script their own.
#[async_trait]
pub trait FeedSource: Send + Sync {
  async fn fetch(&self, url: &str) -> Result<Vec<FeedItem>, FeedError>;
}

pub struct HttpFeedSource {
  client: reqwest::Client,
}

impl HttpFeedSource {
  /// The fetch timeout is per feed, distinct from the scan loop's cancellation
  pub fn new(fetch_timeout: Duration) -> Result<Self, FeedError> {
    let client = reqwest::Client::builder().timeout(fetch_timeout).build()?;
    Ok(Self { client })
  }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
  async fn fetch(&self, url: &str) -> Result<Vec<FeedItem>, FeedError> {
    let bytes = self.client.get(url).send().await?.error_for_status()?.bytes().await?;
    let parsed = feed_rs::parser::parse(bytes.as_ref()).map_err(|e| FeedError::Parse(e.to_string()))?;

    Ok(
      parsed
        .entries
        .into_iter()
        .filter_map(|entry| {
          let title = entry.title.map(|t| t.content)?;
          let link = entry.links.first().map(|l| l.href.clone())?;
          Some(FeedItem { title, link })
        })
        .collect(),
    )
  }
}

/// Supplies the subject list at the top of every scan tick
pub trait SubjectProvider: Send + Sync {
  fn subjects(&self) -> Vec<Subject>;
}

/// Static list, re-read per tick by clone
impl SubjectProvider for Vec<Subject> {
  fn subjects(&self) -> Vec<Subject> {
    self.clone()
  }
}

pub struct Scanner<S> {
  source: S,
  history: History,
}

impl<S: FeedSource> Scanner<S> {
  pub fn new(source: S, history: History) -> Self {
    Self { source, history }
  }

  /// Scan every subject in list order. A fetch/parse failure aborts the
  /// remaining subjects of this pass and is returned; history cleanup runs
  /// exactly once either way.
  pub async fn process_subjects(
    &mut self,
    subjects: &[Subject],
    tx: &mpsc::Sender<DiscoveredLink>,
  ) -> Result<(), FeedError> {
    info!(subjects = subjects.len(), "Processing subjects");
    let result = self.scan_all(subjects, tx).await;
    self.history.cleanup();
    result
  }

  async fn scan_all(&mut self, subjects: &[Subject], tx: &mpsc::Sender<DiscoveredLink>) -> Result<(), FeedError> {
    for subject in subjects {
      let items = self.source.fetch(&subject.url).await?;
      for item in items {
        if subject.matches(&item.title) && self.history.add(&item.title) {
          debug!(subject = %subject.name, title = %item.title, "Discovered item");
          let link = DiscoveredLink {
            name: item.title,
            link: item.link,
          };
          tx.send(link).await.map_err(|_| FeedError::Closed)?;
        }
      }
    }
    Ok(())
  }

  /// Tick forever until cancelled. Scan failures are logged; the loop always
  /// proceeds to the next tick.
  pub async fn run(
    mut self,
    cancel: CancellationToken,
    period: Duration,
    provider: Arc<dyn SubjectProvider>,
    tx: mpsc::Sender<DiscoveredLink>,
  ) {
    info!(period_secs = period.as_secs(), "Starting feed scanner");
    let mut ticker = tokio::time::interval(period);
    // Skip the immediate tick
    ticker.tick().await;

    loop {
      tokio::select! {
        _ = cancel.cancelled() => {
          debug!("Scanner cancelled");
          return;
        }
        _ = ticker.tick() => {}
      }

      let subjects = provider.subjects();
      tokio::select! {
        _ = cancel.cancelled() => {
          debug!("Scanner cancelled mid-scan");
          return;
        }
        result = self.process_subjects(&subjects, &tx) => {
          if let Err(e) = result {
            error!(err = %e, "Feed scan failed");
          }
        }
      }
    }
  }
}

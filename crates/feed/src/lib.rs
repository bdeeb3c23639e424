//! Feed discovery: periodic scanning with dedup, and the plain-link download
//! sink fed by it.

pub mod downloader;
pub mod history;
pub mod scanner;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
  #[error("Fetch failed: {0}")]
  Fetch(#[from] reqwest::Error),

  #[error("Parse failed: {0}")]
  Parse(String),

  #[error("Downstream closed")]
  Closed,

  #[error("IO: {0}")]
  Io(#[from] std::io::Error),
}

pub use downloader::SerialDownloader;
pub use history::History;
pub use scanner::{DiscoveredLink, FeedItem, FeedSource, HttpFeedSource, Scanner, SubjectProvider};

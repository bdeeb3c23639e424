pub mod channel;
pub mod config;
pub mod error;
pub mod subject;
pub mod torrent;

pub use channel::{NotificationTarget, PrivateChannel};
pub use config::{
  AgentConfig, Config, LogConfig, NotifyConfig, ScanConfig, ScrapeConfig, SubjectConfig, TransmissionConfig,
};
pub use error::{Error, Result};
pub use subject::{Subject, resolve_subjects};
pub use torrent::{Torrent, TorrentMetadata};

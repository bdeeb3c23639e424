//! Persisted-store interfaces consumed by the scrape loop and notification
//! fan-out, plus the in-memory reference implementation used for wiring and
//! tests. A deployment substitutes its own backend behind the same traits.

pub mod channels;
pub mod memory;
pub mod recipients;
pub mod torrents;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
  #[error("Not found: {entity} {id}")]
  NotFound { entity: &'static str, id: String },

  #[error("Backend: {0}")]
  Backend(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

pub use channels::PrivateChannelStore;
pub use memory::MemoryStore;
pub use recipients::NotificationStore;
pub use torrents::{TorrentStore, UpsertOutcome};

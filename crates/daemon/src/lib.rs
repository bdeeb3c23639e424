pub mod lifecycle;
pub mod scrape;

pub use lifecycle::{Daemon, LifecycleError, Stores};
pub use scrape::{Backoff, ScrapeError, Scraper, map_torrent};

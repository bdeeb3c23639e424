//! Configuration for the driftnet daemon.
//!
//! Config priority: explicit path > user (~/.config/driftnet/config.toml) > defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

// ============================================================================
// Transmission (download daemon)
// ============================================================================

/// Connection settings for the download daemon's RPC endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransmissionConfig {
  /// Base URL of the daemon (the RPC path is appended)
  pub endpoint: String,

  /// Directory the daemon writes completed downloads into
  pub download_dir: String,

  /// Per-call request timeout in seconds
  pub request_timeout_secs: u64,
}

impl Default for TransmissionConfig {
  fn default() -> Self {
    Self {
      endpoint: "http://localhost:9091".to_string(),
      download_dir: "/downloads/complete".to_string(),
      request_timeout_secs: 10,
    }
  }
}

impl TransmissionConfig {
  pub fn request_timeout(&self) -> Duration {
    Duration::from_secs(self.request_timeout_secs)
  }
}

// ============================================================================
// Feed scanning
// ============================================================================

/// Feed scanner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
  /// How often to scan all subject feeds in seconds (default: 900)
  pub period_secs: u64,

  /// Maximum number of item titles retained for dedup (default: 1000)
  pub history_len: usize,

  /// Per-feed fetch timeout in seconds, distinct from loop cancellation (default: 30)
  pub fetch_timeout_secs: u64,

  /// Directory plain (non-daemon) links are downloaded into
  pub download_dir: String,
}

impl Default for ScanConfig {
  fn default() -> Self {
    Self {
      period_secs: 900,
      history_len: 1000,
      fetch_timeout_secs: 30,
      download_dir: "/downloads/links".to_string(),
    }
  }
}

impl ScanConfig {
  pub fn period(&self) -> Duration {
    Duration::from_secs(self.period_secs)
  }

  pub fn fetch_timeout(&self) -> Duration {
    Duration::from_secs(self.fetch_timeout_secs)
  }
}

// ============================================================================
// Scrape loop
// ============================================================================

/// Reconciliation loop bounds. The loop halves its period on success and
/// doubles it on failure, clamped to [min, max].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
  /// Fastest polling period in seconds (default: 2)
  pub min_period_secs: u64,

  /// Slowest polling period in seconds (default: 300)
  pub max_period_secs: u64,
}

impl Default for ScrapeConfig {
  fn default() -> Self {
    Self {
      min_period_secs: 2,
      max_period_secs: 300,
    }
  }
}

impl ScrapeConfig {
  pub fn min_period(&self) -> Duration {
    Duration::from_secs(self.min_period_secs)
  }

  pub fn max_period(&self) -> Duration {
    Duration::from_secs(self.max_period_secs)
  }
}

// ============================================================================
// Notifications
// ============================================================================

/// Notification fan-out settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
  /// Hours a private channel may sit idle before garbage collection (default: 168)
  pub private_channel_ttl_hours: u64,

  /// How often the private-channel GC pass runs in seconds (default: 300)
  pub gc_interval_secs: u64,

  /// Completion event channel capacity (default: 16)
  pub event_buffer: usize,
}

impl Default for NotifyConfig {
  fn default() -> Self {
    Self {
      private_channel_ttl_hours: 168,
      gc_interval_secs: 300,
      event_buffer: 16,
    }
  }
}

impl NotifyConfig {
  pub fn private_channel_ttl(&self) -> Duration {
    Duration::from_secs(self.private_channel_ttl_hours * 3600)
  }

  pub fn gc_interval(&self) -> Duration {
    Duration::from_secs(self.gc_interval_secs)
  }
}

// ============================================================================
// Logging
// ============================================================================

/// Logging settings consumed by the binary's subscriber setup
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
  /// Log level: off, error, warn, info, debug, trace (default: info)
  pub log_level: String,

  /// Log rotation for background mode: daily, hourly, never (default: daily)
  pub log_rotation: String,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      log_level: "info".to_string(),
      log_rotation: "daily".to_string(),
    }
  }
}

// ============================================================================
// Agents and subjects
// ============================================================================

/// A named feed endpoint template that subjects are resolved against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
  pub name: String,

  /// Base URL substituted for `{base}` in the query format
  pub base_url: String,

  /// URL template with `{base}` and `{query}` placeholders
  pub query_format: String,
}

/// A named feed query plus optional title filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectConfig {
  pub name: String,

  /// Name of the agent this subject resolves against
  pub agent: String,

  /// Search term substituted (query-escaped) for `{query}`
  pub search: String,

  /// Optional regex applied to item titles; absent matches everything
  #[serde(skip_serializing_if = "Option::is_none")]
  pub pattern: Option<String>,
}

// ============================================================================
// Main Configuration
// ============================================================================

/// driftnet configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  #[serde(default)]
  pub transmission: TransmissionConfig,

  #[serde(default)]
  pub scan: ScanConfig,

  #[serde(default)]
  pub scrape: ScrapeConfig,

  #[serde(default)]
  pub notify: NotifyConfig,

  #[serde(default)]
  pub log: LogConfig,

  #[serde(default)]
  pub agents: Vec<AgentConfig>,

  #[serde(default)]
  pub subjects: Vec<SubjectConfig>,
}

impl Config {
  /// Load config from an explicit path
  pub fn load(path: &Path) -> Result<Self> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    config.validate()?;
    Ok(config)
  }

  /// Load from an explicit path if given, else the user config path, else defaults
  pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
    if let Some(path) = path {
      return Self::load(path);
    }

    if let Some(user_path) = Self::user_config_path()
      && user_path.exists()
    {
      return Self::load(&user_path);
    }

    Ok(Self::default())
  }

  /// Get the user-level config path
  pub fn user_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("DRIFTNET_CONFIG_DIR") {
      return Some(PathBuf::from(path).join("config.toml"));
    }

    if let Ok(path) = std::env::var("XDG_CONFIG_HOME") {
      return Some(PathBuf::from(path).join("driftnet").join("config.toml"));
    }

    dirs::config_dir().map(|p: PathBuf| p.join("driftnet").join("config.toml"))
  }

  /// Validate cross-field constraints that serde cannot express
  pub fn validate(&self) -> Result<()> {
    url::Url::parse(&self.transmission.endpoint).map_err(|e| Error::Config(format!("transmission.endpoint: {e}")))?;

    if self.transmission.download_dir.is_empty() {
      return Err(Error::Config("transmission.download_dir is required".to_string()));
    }

    if self.scrape.min_period_secs == 0 {
      return Err(Error::Config("scrape.min_period_secs must be above 0".to_string()));
    }

    if self.scrape.min_period_secs > self.scrape.max_period_secs {
      return Err(Error::Config(
        "scrape.min_period_secs must not exceed scrape.max_period_secs".to_string(),
      ));
    }

    if self.scan.history_len == 0 {
      return Err(Error::Config("scan.history_len must be above 0".to_string()));
    }

    for subject in &self.subjects {
      if !self.agents.iter().any(|a| a.name == subject.agent) {
        return Err(Error::Config(format!(
          "subject {} references unknown agent {}",
          subject.name, subject.agent
        )));
      }
    }

    Ok(())
  }
}

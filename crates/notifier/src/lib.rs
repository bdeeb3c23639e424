//! Notification fan-out: channel subscriptions, private messaging with TTL
//! garbage collection, and completion dispatch.

pub mod dispatch;
pub mod private;
pub mod subscriptions;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
  #[error("Platform: {0}")]
  Platform(String),

  #[error("Store: {0}")]
  Store(#[from] store::StoreError),
}

/// The surface of the chat platform this crate consumes. Command parsing and
/// reply rendering live outside; deliveries arrive here as plain text.
#[async_trait]
pub trait ChatSink: Send + Sync {
  async fn send_channel_message(&self, channel_id: &str, text: &str) -> Result<(), NotifyError>;

  /// Create a direct channel for a recipient, returning its id
  async fn create_direct_channel(&self, recipient_id: &str) -> Result<String, NotifyError>;

  async fn delete_channel(&self, channel_id: &str) -> Result<(), NotifyError>;
}

/// Stand-in sink that logs deliveries. Wired by the binary when no chat
/// integration is configured.
pub struct LogSink;

#[async_trait]
impl ChatSink for LogSink {
  async fn send_channel_message(&self, channel_id: &str, text: &str) -> Result<(), NotifyError> {
    tracing::info!(channel_id, text, "Channel message");
    Ok(())
  }

  async fn create_direct_channel(&self, recipient_id: &str) -> Result<String, NotifyError> {
    Ok(format!("dm-{recipient_id}"))
  }

  async fn delete_channel(&self, channel_id: &str) -> Result<(), NotifyError> {
    tracing::info!(channel_id, "Channel deleted");
    Ok(())
  }
}

pub use dispatch::Dispatcher;
pub use private::PrivateMessenger;
pub use subscriptions::SubscriptionSet;

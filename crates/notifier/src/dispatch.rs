//! Completion fan-out to registered recipients and subscribed channels.

use driftnet_core::Torrent;
use std::sync::Arc;
use store::NotificationStore;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::ChatSink;
use crate::private::PrivateMessenger;
use crate::subscriptions::SubscriptionSet;

pub struct Dispatcher {
  store: Arc<dyn NotificationStore>,
  sink: Arc<dyn ChatSink>,
  private: Arc<PrivateMessenger>,
  subscriptions: Arc<SubscriptionSet>,
}

impl Dispatcher {
  pub fn new(
    store: Arc<dyn NotificationStore>,
    sink: Arc<dyn ChatSink>,
    private: Arc<PrivateMessenger>,
    subscriptions: Arc<SubscriptionSet>,
  ) -> Self {
    Self {
      store,
      sink,
      private,
      subscriptions,
    }
  }

  /// Deliver one completion to its registered recipients and to every
  /// subscribed channel. Per-recipient failures are logged; the rest of the
  /// batch still goes out.
  pub async fn notify(&self, torrent: &Torrent) {
    let text = format!("Completed download: {}", torrent.display_name());
    info!(id = %torrent.id, name = %torrent.display_name(), "Completed torrent");

    match self.store.recipients_for(&torrent.id).await {
      Ok(targets) => {
        for target in targets {
          if let Some(recipient_id) = &target.recipient_id
            && let Err(e) = self.private.send(recipient_id, &text).await
          {
            error!(recipient = %recipient_id, err = %e, "Failed to send notification");
          }
          if let Some(channel_id) = &target.channel_id
            && let Err(e) = self.sink.send_channel_message(channel_id, &text).await
          {
            error!(channel = %channel_id, err = %e, "Failed to send notification");
          }
        }
      }
      Err(e) => error!(id = %torrent.id, err = %e, "Failed to get notification recipients"),
    }

    for channel_id in self.subscriptions.snapshot() {
      if let Err(e) = self.sink.send_channel_message(&channel_id, &text).await {
        error!(channel = %channel_id, err = %e, "Failed to send subscription notification");
      }
    }
  }

  /// Drain completion events until the channel closes or the token fires
  pub async fn run(self, cancel: CancellationToken, mut events: mpsc::Receiver<Torrent>) {
    loop {
      tokio::select! {
        _ = cancel.cancelled() => {
          debug!("Dispatcher cancelled");
          return;
        }
        received = events.recv() => {
          let Some(torrent) = received else {
            debug!("Completion channel closed");
            return;
          };
          self.notify(&torrent).await;
        }
      }
    }
  }
}

use std::time::Duration;

use async_trait::async_trait;
use futures_util::SinkExt;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::error::NotifyError;
use crate::hub::HubEvent;

/// Tells the relay hub a new selfie exists. Best-effort: callers log failures and move on.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: &str) -> Result<(), NotifyError>;
}

/// Opens a short-lived WebSocket to the hub and sends one `imagesent` frame.
pub struct WsNotifier {
    url: String,
    timeout: Duration,
}

impl WsNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(5),
        }
    }
}

#[async_trait]
impl Notifier for WsNotifier {
    async fn notify(&self, user_id: &str) -> Result<(), NotifyError> {
        let (mut ws, _) = tokio::time::timeout(self.timeout, connect_async(self.url.as_str()))
            .await
            .map_err(|_| NotifyError::Connect(format!("timed out connecting to {}", self.url)))?
            .map_err(|e| NotifyError::Connect(e.to_string()))?;

        let text = serde_json::to_string(&HubEvent::image_sent(user_id))?;

        ws.send(Message::text(text))
            .await
            .map_err(|e| NotifyError::Send(e.to_string()))?;

        let _ = ws.close(None).await;

        tracing::debug!("Notified hub of user {user_id}");
        Ok(())
    }
}

/// For kiosks running without a hub.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, user_id: &str) -> Result<(), NotifyError> {
        tracing::info!("No hub configured, skipping imagesent for user {user_id}");
        Ok(())
    }
}

use configuration::TelegramConfig;
use reqwest::Client;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

pub mod error;
pub use error::AlerterError;

/// Messages queued beyond this are dropped rather than ever stalling a
/// trading cycle.
pub const CHANNEL_CAPACITY: usize = 256;

/// Builds the notification channel: the cloneable producer handle the engine
/// uses and the receiver the alerter service consumes.
pub fn channel() -> (Notifier, mpsc::Receiver<String>) {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    (Notifier { tx }, rx)
}

/// Fire-and-forget producer side of the notification channel.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<String>,
}

impl Notifier {
    /// Queues a message without ever blocking. A full or closed channel
    /// drops the message with a warning; trading continues regardless.
    pub fn enqueue(&self, message: impl Into<String>) {
        match self.tx.try_send(message.into()) {
            Ok(()) => {}
            Err(TrySendError::Full(msg)) => {
                tracing::warn!(dropped = %msg, "Notification channel full; message dropped.");
            }
            Err(TrySendError::Closed(msg)) => {
                tracing::warn!(dropped = %msg, "Notification channel closed; message dropped.");
            }
        }
    }
}

/// The JSON payload for the Telegram `sendMessage` endpoint.
#[derive(Debug, Serialize)]
struct SendMessagePayload<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// A client for sending messages to the Telegram Bot API.
pub struct TelegramAlerter {
    client: Client,
    token: String,
    chat_id: String,
}

impl TelegramAlerter {
    /// Creates a new `TelegramAlerter`.
    ///
    /// Returns `None` if the token or chat_id is missing from the
    /// configuration, allowing the system to gracefully disable alerting.
    pub fn new(config: &TelegramConfig) -> Option<Self> {
        if config.token.is_empty() || config.chat_id.is_empty() {
            tracing::warn!("Telegram alerter is not configured (missing token or chat_id).");
            return None;
        }
        Some(Self {
            client: Client::new(),
            token: config.token.clone(),
            chat_id: config.chat_id.clone(),
        })
    }

    /// Sends a text message to the configured Telegram chat.
    pub async fn send_message(&self, message: &str) -> Result<(), AlerterError> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.token);

        let payload = SendMessagePayload {
            chat_id: &self.chat_id,
            text: message,
        };

        let response = self.client.post(&url).json(&payload).send().await?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to decode error response".to_string());
            return Err(AlerterError::Api(error_text));
        }

        Ok(())
    }
}

/// A long-running service that drains the notification channel into Telegram.
///
/// Send failures are logged and swallowed; the channel keeps draining so one
/// Telegram outage cannot back anything up.
pub async fn run_alerter_service(alerter: TelegramAlerter, mut rx: mpsc::Receiver<String>) {
    tracing::info!("Alerter service started.");

    let _ = alerter.send_message("🤖 Trading engine started.").await;

    while let Some(message) = rx.recv().await {
        if let Err(e) = alerter.send_message(&message).await {
            tracing::error!(error = ?e, "Failed to send Telegram alert.");
        }
    }

    tracing::info!("Notification channel closed; alerter service shutting down.");
}

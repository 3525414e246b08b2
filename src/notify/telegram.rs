//! Telegram alert delivery.
//!
//! [`TelegramSink`] queues detections on an unbounded channel and ships them
//! from a background worker, so a slow Bot API call never blocks a detector
//! tick. Credentials come from `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHAT_ID`,
//! never from the config file.
//!
//! Requires the `telegram` feature to be enabled.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::format::alert_message;
use super::AlertSink;
use crate::domain::DetectionResult;
use crate::error::{Error, Result};

/// Telegram bot credentials.
#[derive(Debug, Clone)]
pub struct TelegramCreds {
    /// Bot API token obtained from BotFather.
    pub bot_token: String,
    /// Target chat ID for alerts.
    pub chat_id: i64,
}

impl TelegramCreds {
    /// Read credentials from `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHAT_ID`.
    ///
    /// Returns `None` if either variable is missing or the chat ID is not
    /// numeric.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN").ok()?;
        let chat_id = std::env::var("TELEGRAM_CHAT_ID")
            .ok()
            .and_then(|s| s.parse().ok())?;

        Some(Self { bot_token, chat_id })
    }
}

/// Sink that delivers alerts to a Telegram chat.
pub struct TelegramSink {
    /// Channel sender for queuing outbound alerts.
    sender: mpsc::UnboundedSender<DetectionResult>,
}

impl TelegramSink {
    /// Create the sink and spawn its background worker.
    #[must_use]
    pub fn new(creds: TelegramCreds) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(telegram_worker(creds, receiver));
        Self { sender }
    }
}

#[async_trait]
impl AlertSink for TelegramSink {
    async fn deliver(&self, detection: &DetectionResult) -> Result<()> {
        self.sender
            .send(detection.clone())
            .map_err(|_| Error::Delivery("telegram worker channel closed".into()))
    }

    fn sink_name(&self) -> &'static str {
        "telegram"
    }
}

/// Background worker that sends Telegram messages.
async fn telegram_worker(
    creds: TelegramCreds,
    mut receiver: mpsc::UnboundedReceiver<DetectionResult>,
) {
    let bot = Bot::new(&creds.bot_token);
    let chat_id = ChatId(creds.chat_id);

    info!(chat_id = creds.chat_id, "Telegram alert worker started");

    while let Some(detection) = receiver.recv().await {
        let text = alert_message(&detection);

        if let Err(e) = bot
            .send_message(chat_id, &text)
            .parse_mode(ParseMode::MarkdownV2)
            .await
        {
            error!(error = %e, instrument = %detection.instrument, "Failed to send Telegram alert");
        }
    }

    warn!("Telegram alert worker shutting down");
}

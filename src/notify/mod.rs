//! Alert delivery sinks.
//!
//! Detections are dispatched to a single [`AlertSink`]. Delivery is best
//! effort: a failed delivery is logged and the detection dropped, never
//! retried, so a broken sink cannot stall the detectors. [`LogSink`] writes
//! alerts to the application log; [`TelegramSink`] pushes them to a chat
//! (behind the `telegram` feature).

use async_trait::async_trait;
use tracing::info;

use crate::domain::{DetectionResult, DetectorKind};
use crate::error::Result;

#[cfg(feature = "telegram")]
mod format;
#[cfg(feature = "telegram")]
mod telegram;

#[cfg(feature = "telegram")]
pub use telegram::{TelegramCreds, TelegramSink};

/// Destination for detection alerts.
///
/// Implementations must return quickly: slow transports should enqueue and
/// deliver from a background task.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Deliver one detection.
    async fn deliver(&self, detection: &DetectionResult) -> Result<()>;

    /// Sink name for log context.
    fn sink_name(&self) -> &'static str;
}

/// Sink that writes alerts to the application log.
///
/// The default sink, and the fallback when Telegram is enabled but its
/// credentials are missing.
pub struct LogSink;

#[async_trait]
impl AlertSink for LogSink {
    async fn deliver(&self, detection: &DetectionResult) -> Result<()> {
        let message = match detection.kind {
            DetectorKind::WhaleCluster => "Whale cluster detected",
            DetectorKind::LiquidationStorm => "Liquidation storm detected",
        };
        info!(
            instrument = %detection.instrument,
            group = %detection.group,
            side = %detection.dominant_side,
            total_volume_usd = %detection.total_volume_usd,
            dominance_ratio = %detection.dominance_ratio,
            event_count = detection.event_count,
            window_secs = detection.window_secs,
            "{message}"
        );
        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        "log"
    }
}

//! Periodic threshold evaluation over aggregated windows.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::app::PipelineStats;
use crate::config::SymbolGroupTable;
use crate::domain::{DetectionResult, DetectorKind, EventAggregator};
use crate::notify::AlertSink;

use super::cooldown::CooldownTracker;

/// One detector loop. Evaluates every active window of its event class on a
/// fixed cadence and dispatches detections that clear their group thresholds.
///
/// The whale and liquidation detectors are two instances of this type with
/// different [`DetectorKind`]s. Each owns its cooldown state, so the two never
/// suppress each other.
pub struct Detector {
    kind: DetectorKind,
    tick_secs: u64,
    aggregator: Arc<EventAggregator>,
    table: SymbolGroupTable,
    sink: Arc<dyn AlertSink>,
    stats: Arc<PipelineStats>,
    cooldowns: CooldownTracker,
}

impl Detector {
    #[must_use]
    pub fn new(
        kind: DetectorKind,
        tick_secs: u64,
        aggregator: Arc<EventAggregator>,
        table: SymbolGroupTable,
        sink: Arc<dyn AlertSink>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            kind,
            tick_secs,
            aggregator,
            table,
            sink,
            stats,
            cooldowns: CooldownTracker::new(),
        }
    }

    /// Evaluate all active windows of this detector's class as of `now` and
    /// dispatch qualifying detections to the sink. Returns what was
    /// dispatched.
    ///
    /// A detection enters cooldown as soon as it fires. Delivery failures are
    /// logged and counted but never retried; the window that produced the
    /// alert is already aging out.
    pub async fn evaluate_tick(&mut self, now: DateTime<Utc>) -> Vec<DetectionResult> {
        let class = self.kind.event_class();
        let mut dispatched = Vec::new();

        for summary in self.aggregator.summaries(class, now) {
            let Some(group) = self.table.resolve(&summary.instrument) else {
                debug!(instrument = %summary.instrument, "Instrument not in any group, skipping");
                continue;
            };
            let thresholds = self.table.thresholds(group, class);

            if summary.total_volume_usd < thresholds.min_total_volume_usd {
                continue;
            }
            if summary.dominance_ratio < thresholds.min_dominance_ratio {
                continue;
            }
            if summary.event_count() < thresholds.min_event_count {
                continue;
            }
            if !self
                .cooldowns
                .ready(&summary.instrument, thresholds.cooldown_secs, now)
            {
                debug!(
                    kind = %self.kind,
                    instrument = %summary.instrument,
                    "Detection suppressed by cooldown"
                );
                continue;
            }

            let detection = DetectionResult::from_summary(self.kind, group, &summary, now);
            self.cooldowns.mark(summary.instrument.clone(), now);
            self.stats.note_detection();
            info!(
                kind = %detection.kind,
                instrument = %detection.instrument,
                group = %detection.group,
                side = %detection.dominant_side,
                volume_usd = %detection.total_volume_usd,
                dominance = %detection.dominance_ratio,
                events = detection.event_count,
                "Detection fired"
            );

            if let Err(e) = self.sink.deliver(&detection).await {
                self.stats.note_delivery_failure();
                warn!(
                    error = %e,
                    sink = self.sink.sink_name(),
                    instrument = %detection.instrument,
                    "Alert delivery failed"
                );
            }

            dispatched.push(detection);
        }

        dispatched
    }

    /// Spawn the evaluation loop. Runs until the shutdown signal flips to
    /// `true` or the shutdown channel closes.
    pub fn start(mut self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(self.tick_secs));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(kind = %self.kind, tick_secs = self.tick_secs, "Detector started");

            loop {
                tokio::select! {
                    result = shutdown.changed() => {
                        match result {
                            Ok(()) => {
                                if *shutdown.borrow() {
                                    info!(kind = %self.kind, "Detector shutting down");
                                    break;
                                }
                            }
                            Err(_) => {
                                info!(kind = %self.kind, "Shutdown channel closed");
                                break;
                            }
                        }
                    }
                    _ = ticker.tick() => {
                        self.evaluate_tick(Utc::now()).await;
                    }
                }
            }
        })
    }
}

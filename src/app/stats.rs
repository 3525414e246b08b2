//! Shared pipeline counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated atomically by the intake, detector, and delivery paths.
///
/// Snapshotted by the periodic status line; never reset while the pipeline
/// runs.
#[derive(Debug, Default)]
pub struct PipelineStats {
    events_ingested: AtomicU64,
    events_dropped: AtomicU64,
    detections_emitted: AtomicU64,
    delivery_failures: AtomicU64,
}

impl PipelineStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one event accepted from the stream.
    pub fn note_event(&self) {
        self.events_ingested.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one event dropped due to channel backpressure.
    pub fn note_event_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one detection handed to the alert sink.
    pub fn note_detection(&self) {
        self.detections_emitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one failed alert delivery.
    pub fn note_delivery_failure(&self) {
        self.delivery_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            events_ingested: self.events_ingested.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            detections_emitted: self.detections_emitted.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the pipeline counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub events_ingested: u64,
    pub events_dropped: u64,
    pub detections_emitted: u64,
    pub delivery_failures: u64,
}

//! Detector loops over the aggregated windows.
//!
//! Two detectors run against the same [`EventAggregator`]: one looks for
//! whale clusters in the trade windows, the other for liquidation storms in
//! the liquidation windows. Both tick on the same cadence, gate detections on
//! per-group thresholds, and hold a per-instrument cooldown after each fire.
//!
//! [`EventAggregator`]: crate::domain::EventAggregator

mod cooldown;
mod detector;

pub use cooldown::CooldownTracker;
pub use detector::Detector;

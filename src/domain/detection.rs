//! Detection results produced by the detector loops.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::event::{EventClass, Instrument, Side, SymbolGroup};
use super::window::WindowSummary;

/// The two detectors the pipeline runs. Each evaluates exactly one event
/// class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectorKind {
    WhaleCluster,
    LiquidationStorm,
}

impl DetectorKind {
    /// The event class this detector evaluates.
    #[must_use]
    pub fn event_class(self) -> EventClass {
        match self {
            Self::WhaleCluster => EventClass::Trade,
            Self::LiquidationStorm => EventClass::Liquidation,
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::WhaleCluster => "whale_cluster",
            Self::LiquidationStorm => "liquidation_storm",
        };
        write!(f, "{name}")
    }
}

/// One threshold crossing, handed to the alert sink and then discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    pub kind: DetectorKind,
    pub instrument: Instrument,
    pub group: SymbolGroup,
    pub dominant_side: Side,
    pub total_volume_usd: Decimal,
    pub dominance_ratio: Decimal,
    pub event_count: usize,
    pub window_secs: u64,
    pub detected_at: DateTime<Utc>,
}

impl DetectionResult {
    /// Build a result from the window snapshot that crossed the thresholds.
    #[must_use]
    pub fn from_summary(
        kind: DetectorKind,
        group: SymbolGroup,
        summary: &WindowSummary,
        detected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            instrument: summary.instrument.clone(),
            group,
            dominant_side: summary.dominant_side,
            total_volume_usd: summary.total_volume_usd,
            dominance_ratio: summary.dominance_ratio,
            event_count: summary.event_count(),
            window_secs: summary.window_secs,
            detected_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn detector_kinds_map_to_their_event_class() {
        assert_eq!(DetectorKind::WhaleCluster.event_class(), EventClass::Trade);
        assert_eq!(
            DetectorKind::LiquidationStorm.event_class(),
            EventClass::Liquidation
        );
    }

    #[test]
    fn kind_display_is_log_friendly() {
        assert_eq!(format!("{}", DetectorKind::WhaleCluster), "whale_cluster");
        assert_eq!(
            format!("{}", DetectorKind::LiquidationStorm),
            "liquidation_storm"
        );
    }

    #[test]
    fn result_copies_the_summary_fields() {
        let summary = WindowSummary {
            instrument: Instrument::new("BTCUSDT"),
            class: EventClass::Trade,
            window_secs: 30,
            buy_volume_usd: dec!(3_500_000),
            sell_volume_usd: dec!(0),
            buy_count: 5,
            sell_count: 0,
            total_volume_usd: dec!(3_500_000),
            dominant_side: Side::Buy,
            dominance_ratio: dec!(1.0),
        };
        let detected_at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 30).unwrap();

        let result = DetectionResult::from_summary(
            DetectorKind::WhaleCluster,
            SymbolGroup::Majors,
            &summary,
            detected_at,
        );

        assert_eq!(result.instrument, Instrument::new("BTCUSDT"));
        assert_eq!(result.dominant_side, Side::Buy);
        assert_eq!(result.total_volume_usd, dec!(3_500_000));
        assert_eq!(result.event_count, 5);
        assert_eq!(result.window_secs, 30);
        assert_eq!(result.detected_at, detected_at);
    }
}

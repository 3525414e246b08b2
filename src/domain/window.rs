//! Sliding-window state for one instrument and event class.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use super::event::{EventClass, Instrument, RawEvent, Side};

/// Slim per-event record kept inside a window.
#[derive(Debug, Clone, Copy)]
struct WindowEvent {
    side: Side,
    notional_usd: Decimal,
    occurred_at: DateTime<Utc>,
}

/// Events observed for one (instrument, class) pair over the last
/// `window_secs` seconds.
///
/// Events are appended in arrival order and pruned from the front once they
/// are strictly older than `now - window`. The feed delivers events roughly
/// in order; a slightly late event simply stays until the entries ahead of it
/// expire.
#[derive(Debug)]
pub struct WindowState {
    window_secs: u64,
    events: VecDeque<WindowEvent>,
}

impl WindowState {
    #[must_use]
    pub fn new(window_secs: u64) -> Self {
        Self {
            window_secs,
            events: VecDeque::new(),
        }
    }

    /// Record one event. The caller keys windows by (instrument, class), so
    /// the event's class is taken on trust here.
    pub fn record(&mut self, event: &RawEvent) {
        self.events.push_back(WindowEvent {
            side: event.side,
            notional_usd: event.notional_usd,
            occurred_at: event.occurred_at,
        });
    }

    /// Drop events strictly older than the window. An event aged exactly the
    /// window span is still in.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let cutoff = now - Duration::seconds(self.window_secs as i64);
        while let Some(front) = self.events.front() {
            if front.occurred_at < cutoff {
                self.events.pop_front();
            } else {
                break;
            }
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Prune and summarize the window as of `now`. Returns `None` when no
    /// events remain in the window.
    pub fn summarize(
        &mut self,
        instrument: &Instrument,
        class: EventClass,
        now: DateTime<Utc>,
    ) -> Option<WindowSummary> {
        self.prune(now);
        if self.events.is_empty() {
            return None;
        }

        let mut buy_volume_usd = Decimal::ZERO;
        let mut sell_volume_usd = Decimal::ZERO;
        let mut buy_count = 0usize;
        let mut sell_count = 0usize;
        for event in &self.events {
            if event.side.is_buy_flow() {
                buy_volume_usd += event.notional_usd;
                buy_count += 1;
            } else {
                sell_volume_usd += event.notional_usd;
                sell_count += 1;
            }
        }

        let total_volume_usd = buy_volume_usd + sell_volume_usd;
        let buy_dominant = buy_volume_usd >= sell_volume_usd;
        let dominant_volume = if buy_dominant {
            buy_volume_usd
        } else {
            sell_volume_usd
        };
        let dominance_ratio = if total_volume_usd.is_zero() {
            Decimal::ZERO
        } else {
            dominant_volume / total_volume_usd
        };

        // Report the dominant side in the window's class vocabulary. Buy flow
        // during a liquidation storm means shorts are being flushed.
        let dominant_side = match (class, buy_dominant) {
            (EventClass::Trade, true) => Side::Buy,
            (EventClass::Trade, false) => Side::Sell,
            (EventClass::Liquidation, true) => Side::ShortLiq,
            (EventClass::Liquidation, false) => Side::LongLiq,
        };

        Some(WindowSummary {
            instrument: instrument.clone(),
            class,
            window_secs: self.window_secs,
            buy_volume_usd,
            sell_volume_usd,
            buy_count,
            sell_count,
            total_volume_usd,
            dominant_side,
            dominance_ratio,
        })
    }
}

/// Snapshot of one window at evaluation time.
///
/// Buckets are directional flow: `buy_volume_usd` counts BUY prints and short
/// liquidations, `sell_volume_usd` counts SELL prints and long liquidations.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSummary {
    pub instrument: Instrument,
    pub class: EventClass,
    pub window_secs: u64,
    pub buy_volume_usd: Decimal,
    pub sell_volume_usd: Decimal,
    pub buy_count: usize,
    pub sell_count: usize,
    pub total_volume_usd: Decimal,
    /// Side with the larger volume, in class vocabulary. Ties go to the buy
    /// side; a tie is exactly 0.5 dominance and never crosses a threshold
    /// above 0.5 anyway.
    pub dominant_side: Side,
    /// Larger side's share of total volume, zero when the window has no
    /// volume.
    pub dominance_ratio: Decimal,
}

impl WindowSummary {
    /// Total number of events in the window.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.buy_count + self.sell_count
    }

    /// Volume on the dominant side.
    #[must_use]
    pub fn dominant_volume_usd(&self) -> Decimal {
        if self.dominant_side.is_buy_flow() {
            self.buy_volume_usd
        } else {
            self.sell_volume_usd
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        base_time() + Duration::seconds(secs)
    }

    fn event(side: Side, notional: Decimal, occurred_at: DateTime<Utc>) -> RawEvent {
        RawEvent {
            instrument: Instrument::new("BTCUSDT"),
            exchange: "binance".into(),
            side,
            notional_usd: notional,
            occurred_at,
        }
    }

    fn summarize(state: &mut WindowState, class: EventClass, now: DateTime<Utc>) -> WindowSummary {
        state
            .summarize(&Instrument::new("BTCUSDT"), class, now)
            .unwrap()
    }

    #[test]
    fn empty_window_summarizes_to_none() {
        let mut state = WindowState::new(30);
        assert!(state
            .summarize(&Instrument::new("BTCUSDT"), EventClass::Trade, base_time())
            .is_none());
    }

    #[test]
    fn events_strictly_older_than_the_window_are_excluded() {
        let mut state = WindowState::new(30);
        state.record(&event(Side::Buy, dec!(100), at(0)));
        state.record(&event(Side::Buy, dec!(200), at(10)));
        state.record(&event(Side::Buy, dec!(300), at(31)));

        let summary = summarize(&mut state, EventClass::Trade, at(31));

        assert_eq!(summary.event_count(), 2);
        assert_eq!(summary.total_volume_usd, dec!(500));
    }

    #[test]
    fn event_aged_exactly_the_window_is_still_included() {
        let mut state = WindowState::new(30);
        state.record(&event(Side::Buy, dec!(100), at(0)));
        state.record(&event(Side::Buy, dec!(200), at(5)));

        let summary = summarize(&mut state, EventClass::Trade, at(30));
        assert_eq!(summary.event_count(), 2);

        let summary = summarize(&mut state, EventClass::Trade, at(31));
        assert_eq!(summary.event_count(), 1);
        assert_eq!(summary.total_volume_usd, dec!(200));
    }

    #[test]
    fn dominance_ratio_arithmetic() {
        let mut state = WindowState::new(30);
        state.record(&event(Side::Buy, dec!(3_000_000), at(0)));
        state.record(&event(Side::Sell, dec!(500_000), at(1)));

        let summary = summarize(&mut state, EventClass::Trade, at(2));

        assert_eq!(summary.dominant_side, Side::Buy);
        assert_eq!(summary.dominance_ratio.round_dp(3), dec!(0.857));
        assert_eq!(summary.total_volume_usd, dec!(3_500_000));
        assert_eq!(summary.buy_count, 1);
        assert_eq!(summary.sell_count, 1);
    }

    #[test]
    fn even_split_reports_half_dominance() {
        let mut state = WindowState::new(30);
        state.record(&event(Side::Buy, dec!(1000), at(0)));
        state.record(&event(Side::Sell, dec!(1000), at(1)));

        let summary = summarize(&mut state, EventClass::Trade, at(2));

        assert_eq!(summary.dominance_ratio, dec!(0.5));
        assert_eq!(summary.dominant_side, Side::Buy);
    }

    #[test]
    fn liquidation_dominance_uses_liquidation_vocabulary() {
        let mut state = WindowState::new(30);
        state.record(&event(Side::LongLiq, dec!(800_000), at(0)));
        state.record(&event(Side::ShortLiq, dec!(200_000), at(1)));

        let summary = summarize(&mut state, EventClass::Liquidation, at(2));

        assert_eq!(summary.dominant_side, Side::LongLiq);
        assert_eq!(summary.dominance_ratio, dec!(0.8));
        assert_eq!(summary.sell_volume_usd, dec!(800_000));
        assert_eq!(summary.dominant_volume_usd(), dec!(800_000));
    }

    #[test]
    fn late_event_survives_until_entries_ahead_expire() {
        let mut state = WindowState::new(30);
        state.record(&event(Side::Buy, dec!(100), at(10)));
        // Arrived after, but stamped earlier.
        state.record(&event(Side::Buy, dec!(200), at(8)));

        let summary = summarize(&mut state, EventClass::Trade, at(20));
        assert_eq!(summary.event_count(), 2);

        // At 40s the front entry (t=10) is exactly window-old and still in,
        // so the late entry behind it rides along.
        let summary = summarize(&mut state, EventClass::Trade, at(40));
        assert_eq!(summary.event_count(), 2);

        // Once the front expires the late entry goes with it.
        assert!(state
            .summarize(&Instrument::new("BTCUSDT"), EventClass::Trade, at(41))
            .is_none());
    }
}

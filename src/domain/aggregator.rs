//! Sliding-window aggregation of raw events per instrument and class.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::event::{EventClass, Instrument, RawEvent};
use super::window::{WindowState, WindowSummary};

/// Concurrent event aggregator.
///
/// Windows are keyed by (instrument, class) so trade and liquidation activity
/// for the same instrument never mix. The intake task records events while
/// detector tasks summarize on their tick; the map's per-entry locking keeps
/// both sides consistent without a global lock.
#[derive(Debug)]
pub struct EventAggregator {
    window_secs: u64,
    windows: DashMap<(Instrument, EventClass), WindowState>,
    events_recorded: AtomicU64,
}

impl EventAggregator {
    #[must_use]
    pub fn new(window_secs: u64) -> Self {
        Self {
            window_secs,
            windows: DashMap::new(),
            events_recorded: AtomicU64::new(0),
        }
    }

    /// The configured window span in seconds.
    #[must_use]
    pub fn window_secs(&self) -> u64 {
        self.window_secs
    }

    /// Record one event into its window. Never fails on valid input.
    pub fn record(&self, event: &RawEvent) {
        let key = (event.instrument.clone(), event.class());
        self.windows
            .entry(key)
            .or_insert_with(|| WindowState::new(self.window_secs))
            .record(event);
        self.events_recorded.fetch_add(1, Ordering::Relaxed);
    }

    /// Prune and summarize one instrument's window as of `now`. `None` when
    /// the instrument has no in-window events of this class.
    pub fn summarize(
        &self,
        instrument: &Instrument,
        class: EventClass,
        now: DateTime<Utc>,
    ) -> Option<WindowSummary> {
        let key = (instrument.clone(), class);
        let mut window = self.windows.get_mut(&key)?;
        window.summarize(instrument, class, now)
    }

    /// Summarize every window of the given class that still holds events as
    /// of `now`. Expired events are pruned as a side effect, so detectors can
    /// use this as their per-tick scan.
    pub fn summaries(&self, class: EventClass, now: DateTime<Utc>) -> Vec<WindowSummary> {
        let mut out = Vec::new();
        for mut entry in self.windows.iter_mut() {
            if entry.key().1 != class {
                continue;
            }
            let (key, window) = entry.pair_mut();
            if let Some(summary) = window.summarize(&key.0, class, now) {
                out.push(summary);
            }
        }
        out
    }

    /// Instruments with at least one in-window event of the given class.
    pub fn active_instruments(&self, class: EventClass, now: DateTime<Utc>) -> Vec<Instrument> {
        let mut out = Vec::new();
        for mut entry in self.windows.iter_mut() {
            if entry.key().1 != class {
                continue;
            }
            let (key, window) = entry.pair_mut();
            window.prune(now);
            if !window.is_empty() {
                out.push(key.0.clone());
            }
        }
        out
    }

    /// Drop windows that hold no in-window events. Instruments that go quiet
    /// must not leak map entries.
    pub fn sweep(&self, now: DateTime<Utc>) {
        self.windows.retain(|_, window| {
            window.prune(now);
            !window.is_empty()
        });
    }

    /// Number of live windows.
    #[must_use]
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    /// Events recorded since startup.
    #[must_use]
    pub fn events_recorded(&self) -> u64 {
        self.events_recorded.load(Ordering::Relaxed)
    }
}

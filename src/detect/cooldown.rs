//! Per-instrument cooldown bookkeeping.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::domain::Instrument;

/// Last-fired timestamps per instrument, used to suppress repeat alerts while
/// a window stays hot.
///
/// Each detector owns its own tracker, so a whale alert on an instrument never
/// delays a liquidation alert on the same instrument. Entries are bounded by
/// the number of instruments the feed carries and are never pruned.
#[derive(Debug, Default)]
pub struct CooldownTracker {
    last_fired: HashMap<Instrument, DateTime<Utc>>,
}

impl CooldownTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the instrument may fire at `now`. Suppressed while less than
    /// `cooldown_secs` has passed since the last fire; eligible again at
    /// exactly the boundary.
    #[must_use]
    pub fn ready(&self, instrument: &Instrument, cooldown_secs: u64, now: DateTime<Utc>) -> bool {
        match self.last_fired.get(instrument) {
            Some(last) => {
                now.signed_duration_since(*last) >= Duration::seconds(cooldown_secs as i64)
            }
            None => true,
        }
    }

    /// Record a fire at `now`.
    pub fn mark(&mut self, instrument: Instrument, now: DateTime<Utc>) {
        self.last_fired.insert(instrument, now);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.last_fired.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.last_fired.is_empty()
    }
}

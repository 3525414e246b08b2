//! Builders for domain primitives used across tests.
//!
//! Concise factory functions for [`Instrument`], [`RawEvent`], and
//! [`StreamEvent`] so tests focus on assertions rather than construction
//! boilerplate.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::{Instrument, RawEvent, Side};
use crate::stream::StreamEvent;

/// Create an [`Instrument`] from a symbol.
pub fn instrument(symbol: &str) -> Instrument {
    Instrument::new(symbol)
}

/// Create a [`RawEvent`] timestamped now.
pub fn event(symbol: &str, side: Side, notional_usd: Decimal) -> RawEvent {
    event_at(symbol, side, notional_usd, Utc::now())
}

/// Create a [`RawEvent`] with an explicit event time.
pub fn event_at(
    symbol: &str,
    side: Side,
    notional_usd: Decimal,
    occurred_at: DateTime<Utc>,
) -> RawEvent {
    RawEvent {
        instrument: Instrument::new(symbol),
        exchange: "binance".to_string(),
        side,
        notional_usd,
        occurred_at,
    }
}

/// Create a [`StreamEvent::Event`] carrying a $500k buy.
pub fn buy_event(symbol: &str) -> StreamEvent {
    StreamEvent::Event(event(symbol, Side::Buy, dec!(500000)))
}

/// Create a [`StreamEvent::Disconnected`] event.
pub fn disconnect_event(reason: &str) -> StreamEvent {
    StreamEvent::Disconnected {
        reason: reason.to_string(),
    }
}

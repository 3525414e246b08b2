//! WebSocket feed client and reconnection machinery.
//!
//! [`WsEventStream`] speaks the feed protocol: one connection, a JSON
//! subscribe handshake, liveness pings, and text frames carrying trade and
//! liquidation events. [`ReconnectingStream`] wraps any [`EventStream`] and
//! re-dials with exponential backoff whenever the connection drops.

mod client;
mod messages;
mod reconnect;

pub use client::WsEventStream;
pub use messages::{EventFrame, SubscribeRequest, WireMessage};
pub use reconnect::ReconnectingStream;

use std::fmt;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::{Instrument, RawEvent};
use crate::error::Result;

/// A feed channel to subscribe to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSpec {
    /// The catch-all liquidation channel. Covers every instrument the feed
    /// tracks, so it is subscribed once regardless of configuration.
    AllLiquidations,
    /// Trade prints for one instrument, filtered server-side to notionals at
    /// or above the floor.
    Trades {
        exchange: String,
        instrument: Instrument,
        min_notional_usd: Decimal,
    },
}

impl ChannelSpec {
    /// Wire name of the channel, as sent in the subscribe request.
    #[must_use]
    pub fn id(&self) -> String {
        match self {
            Self::AllLiquidations => "liquidations".to_string(),
            Self::Trades {
                exchange,
                instrument,
                min_notional_usd,
            } => format!("{exchange}_{instrument}_{}", min_notional_usd.normalize()),
        }
    }
}

impl fmt::Display for ChannelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Events surfaced by a stream implementation.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// One parsed trade or liquidation.
    Event(RawEvent),
    /// The connection dropped. A reconnecting wrapper recovers; a bare
    /// client stays down until `connect` is called again.
    Disconnected { reason: String },
}

/// A real-time event feed.
///
/// Implementations own the transport: connecting, subscribing, and turning
/// wire frames into [`StreamEvent`]s. Consumers drive the stream by awaiting
/// [`next_event`](EventStream::next_event) in a loop.
#[async_trait]
pub trait EventStream: Send {
    /// Establish the connection.
    async fn connect(&mut self) -> Result<()>;

    /// Subscribe to the given channels. Requires a live connection.
    async fn subscribe(&mut self, channels: &[ChannelSpec]) -> Result<()>;

    /// Wait for the next event. `None` means the stream is exhausted and
    /// will produce nothing further.
    async fn next_event(&mut self) -> Option<StreamEvent>;

    /// Short name for log context.
    fn stream_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn liquidation_channel_has_fixed_name() {
        assert_eq!(ChannelSpec::AllLiquidations.id(), "liquidations");
    }

    #[test]
    fn trade_channel_encodes_exchange_symbol_and_floor() {
        let spec = ChannelSpec::Trades {
            exchange: "binance".to_string(),
            instrument: Instrument::new("btcusdt"),
            min_notional_usd: dec!(100000),
        };

        assert_eq!(spec.id(), "binance_BTCUSDT_100000");
    }

    #[test]
    fn trade_channel_floor_drops_trailing_zeros() {
        let spec = ChannelSpec::Trades {
            exchange: "binance".to_string(),
            instrument: Instrument::new("SOLUSDT"),
            min_notional_usd: dec!(50000.00),
        };

        assert_eq!(spec.id(), "binance_SOLUSDT_50000");
    }
}

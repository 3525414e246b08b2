//! Feed WebSocket message types.
//!
//! The feed sends JSON text frames. Event frames carry one trade or
//! liquidation each and may arrive batched in an array. Control frames
//! acknowledge subscriptions.
//!
//! Example event frame:
//! ```json
//! {"channel":"binance_BTCUSDT_100000","symbol":"BTCUSDT","exchange":"binance",
//!  "side":"buy","notional_usd":"734000.50","ts":1717243200123}
//! ```

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Instrument, RawEvent, Side};
use crate::stream::ChannelSpec;

/// Subscription request sent after connecting.
#[derive(Debug, Serialize)]
pub struct SubscribeRequest {
    pub op: &'static str,
    pub args: Vec<String>,
}

impl SubscribeRequest {
    pub fn new(channels: &[ChannelSpec]) -> Self {
        Self {
            op: "subscribe",
            args: channels.iter().map(ChannelSpec::id).collect(),
        }
    }
}

/// Messages received from the feed.
///
/// Event frames may arrive singly or batched in a JSON array. Anything that
/// is neither an event nor a control frame falls through to `Unknown`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WireMessage {
    /// Batch of event frames.
    Batch(Vec<EventFrame>),

    /// A single event frame.
    Single(EventFrame),

    /// Subscription acknowledgement or other control frame.
    Control(ControlFrame),

    /// Unknown or unparseable message.
    Unknown(serde_json::Value),
}

/// One trade or liquidation as received from the feed.
#[derive(Debug, Deserialize)]
pub struct EventFrame {
    pub symbol: String,
    pub exchange: String,
    pub side: String,
    pub notional_usd: Decimal,
    /// Event time, milliseconds since the Unix epoch.
    pub ts: i64,
    pub channel: Option<String>,
}

impl EventFrame {
    /// Convert this frame to a domain event.
    ///
    /// Returns the rejection reason for frames that cannot be represented:
    /// an unrecognized side, a negative notional, or a timestamp outside the
    /// representable range.
    pub fn to_raw_event(&self) -> Result<RawEvent, &'static str> {
        let side = match self.side.as_str() {
            "buy" => Side::Buy,
            "sell" => Side::Sell,
            "long" => Side::LongLiq,
            "short" => Side::ShortLiq,
            _ => return Err("unrecognized side"),
        };

        if self.notional_usd.is_sign_negative() {
            return Err("negative notional");
        }

        let occurred_at = Utc
            .timestamp_millis_opt(self.ts)
            .single()
            .ok_or("timestamp out of range")?;

        Ok(RawEvent {
            instrument: Instrument::new(self.symbol.as_str()),
            exchange: self.exchange.clone(),
            side,
            notional_usd: self.notional_usd,
            occurred_at,
        })
    }
}

/// Control frame: subscription acks and server notices.
#[derive(Debug, Deserialize)]
pub struct ControlFrame {
    pub op: String,
    #[serde(default)]
    pub args: Vec<String>,
}

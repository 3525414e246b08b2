//! Core event vocabulary: instruments, groups, sides, and raw events.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Instrument identifier, normalized to uppercase.
///
/// The inner String is private so all construction goes through [`Instrument::new`]
/// and two spellings of the same symbol always compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instrument(String);

impl Instrument {
    pub fn new(symbol: impl Into<String>) -> Self {
        let mut symbol = symbol.into();
        symbol.make_ascii_uppercase();
        Self(symbol)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Instrument {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Instrument {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Liquidity tier an instrument is assigned to. Thresholds are configured per
/// group, not per instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolGroup {
    Majors,
    LargeCap,
    MidCap,
}

impl fmt::Display for SymbolGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Majors => "MAJORS",
            Self::LargeCap => "LARGE_CAP",
            Self::MidCap => "MID_CAP",
        };
        write!(f, "{name}")
    }
}

/// The two kinds of events the feed carries. Windows and thresholds never mix
/// classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventClass {
    Trade,
    Liquidation,
}

impl fmt::Display for EventClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Trade => "trade",
            Self::Liquidation => "liquidation",
        };
        write!(f, "{name}")
    }
}

/// Event side in class vocabulary: trades are `Buy`/`Sell`, liquidations are
/// `LongLiq`/`ShortLiq`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
    LongLiq,
    ShortLiq,
}

impl Side {
    /// The event class this side belongs to.
    #[must_use]
    pub fn class(self) -> EventClass {
        match self {
            Self::Buy | Self::Sell => EventClass::Trade,
            Self::LongLiq | Self::ShortLiq => EventClass::Liquidation,
        }
    }

    /// Whether the resulting market flow is buying. A forced close trades
    /// against the position direction, so a short liquidation is a buy.
    #[must_use]
    pub fn is_buy_flow(self) -> bool {
        matches!(self, Self::Buy | Self::ShortLiq)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::LongLiq => "LONG_LIQ",
            Self::ShortLiq => "SHORT_LIQ",
        };
        write!(f, "{name}")
    }
}

/// One observed market occurrence: a large trade print or a forced
/// liquidation.
///
/// The event class is derived from the side, so an event can never claim to be
/// a trade while carrying a liquidation side. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    pub instrument: Instrument,
    pub exchange: String,
    pub side: Side,
    /// Notional value in USD. Parsing rejects negative values.
    pub notional_usd: Decimal,
    pub occurred_at: DateTime<Utc>,
}

impl RawEvent {
    #[must_use]
    pub fn class(&self) -> EventClass {
        self.side.class()
    }
}

//! Canonical test configurations.
//!
//! Single source of truth for config structs used across tests.
//! Avoids each test module defining its own slightly-different defaults.

use rust_decimal_macros::dec;

use crate::config::{BackoffConfig, GroupConfig, GroupsConfig, SymbolGroupTable, ThresholdConfig};

/// Backoff config with the production defaults (2s doubling to 60s).
///
/// Tests that sleep through these delays should run on a paused tokio clock.
pub fn backoff() -> BackoffConfig {
    BackoffConfig {
        initial_secs: 2,
        multiplier: 2.0,
        max_secs: 60,
    }
}

/// The canonical three-group threshold table:
///
/// | group     | symbols            | whale                  | liquidation            |
/// |-----------|--------------------|------------------------|------------------------|
/// | majors    | BTCUSDT, ETHUSDT   | $3M / 0.70 / 3 / 600s  | $1M / 0.75 / 5 / 300s  |
/// | large_cap | SOLUSDT, BNBUSDT   | $1M / 0.75 / 3 / 600s  | $500k / 0.75 / 4 / 300s|
/// | mid_cap   | ARBUSDT, OPUSDT    | $500k / 0.80 / 3 / 900s| $250k / 0.80 / 4 / 450s|
pub fn groups() -> GroupsConfig {
    GroupsConfig {
        majors: GroupConfig {
            symbols: vec!["BTCUSDT".into(), "ETHUSDT".into()],
            min_print_usd: dec!(100_000),
            whale: ThresholdConfig {
                min_total_volume_usd: dec!(3_000_000),
                min_dominance_ratio: dec!(0.70),
                min_event_count: 3,
                cooldown_secs: 600,
            },
            liquidation: ThresholdConfig {
                min_total_volume_usd: dec!(1_000_000),
                min_dominance_ratio: dec!(0.75),
                min_event_count: 5,
                cooldown_secs: 300,
            },
        },
        large_cap: GroupConfig {
            symbols: vec!["SOLUSDT".into(), "BNBUSDT".into()],
            min_print_usd: dec!(50_000),
            whale: ThresholdConfig {
                min_total_volume_usd: dec!(1_000_000),
                min_dominance_ratio: dec!(0.75),
                min_event_count: 3,
                cooldown_secs: 600,
            },
            liquidation: ThresholdConfig {
                min_total_volume_usd: dec!(500_000),
                min_dominance_ratio: dec!(0.75),
                min_event_count: 4,
                cooldown_secs: 300,
            },
        },
        mid_cap: GroupConfig {
            symbols: vec!["ARBUSDT".into(), "OPUSDT".into()],
            min_print_usd: dec!(25_000),
            whale: ThresholdConfig {
                min_total_volume_usd: dec!(500_000),
                min_dominance_ratio: dec!(0.80),
                min_event_count: 3,
                cooldown_secs: 900,
            },
            liquidation: ThresholdConfig {
                min_total_volume_usd: dec!(250_000),
                min_dominance_ratio: dec!(0.80),
                min_event_count: 4,
                cooldown_secs: 450,
            },
        },
    }
}

/// Lookup table built from [`groups`].
pub fn table() -> SymbolGroupTable {
    groups().build_table()
}

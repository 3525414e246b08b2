//! Symbol group configuration and threshold lookup.
//!
//! Every monitored instrument belongs to exactly one liquidity group, and each
//! group carries its own detection thresholds. The table is closed: a config
//! file that omits a group or a threshold block fails to parse, so the
//! detectors can assume a complete table once the application is running.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::{EventClass, Instrument, SymbolGroup};
use crate::error::ConfigError;

/// Detection thresholds for one group and one detector kind.
#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdConfig {
    /// Minimum aggregate window volume in USD before a cluster qualifies.
    pub min_total_volume_usd: Decimal,
    /// Minimum share of window volume on the dominant side (0, 1].
    pub min_dominance_ratio: Decimal,
    /// Minimum number of events in the window.
    pub min_event_count: usize,
    /// Seconds to suppress repeat alerts for the same instrument.
    pub cooldown_secs: u64,
}

/// Configuration for a single symbol group.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupConfig {
    /// Instruments assigned to this group.
    pub symbols: Vec<String>,
    /// Per-event floor encoded into the trade channel subscription.
    pub min_print_usd: Decimal,
    /// Whale cluster thresholds.
    pub whale: ThresholdConfig,
    /// Liquidation storm thresholds.
    pub liquidation: ThresholdConfig,
}

/// The full three-group threshold table. All groups are required so a partial
/// table is rejected at parse time rather than discovered mid-detection.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupsConfig {
    pub majors: GroupConfig,
    pub large_cap: GroupConfig,
    pub mid_cap: GroupConfig,
}

impl GroupsConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        for (group, config) in self.iter() {
            validate_group(group, config)?;
        }

        // An instrument in two groups would resolve to two threshold sets.
        let mut seen: HashMap<Instrument, SymbolGroup> = HashMap::new();
        for (group, config) in self.iter() {
            for symbol in &config.symbols {
                let instrument = Instrument::new(symbol);
                if let Some(previous) = seen.insert(instrument.clone(), group) {
                    return Err(ConfigError::InvalidValue {
                        field: "symbols",
                        reason: format!("{instrument} is listed in both {previous} and {group}"),
                    });
                }
            }
        }
        Ok(())
    }

    /// Build the lookup table the detectors use at runtime.
    #[must_use]
    pub fn build_table(&self) -> SymbolGroupTable {
        let mut by_symbol = HashMap::new();
        for (group, config) in self.iter() {
            for symbol in &config.symbols {
                by_symbol.insert(Instrument::new(symbol), group);
            }
        }
        SymbolGroupTable {
            by_symbol,
            groups: self.clone(),
        }
    }

    fn iter(&self) -> impl Iterator<Item = (SymbolGroup, &GroupConfig)> {
        [
            (SymbolGroup::Majors, &self.majors),
            (SymbolGroup::LargeCap, &self.large_cap),
            (SymbolGroup::MidCap, &self.mid_cap),
        ]
        .into_iter()
    }
}

fn validate_group(group: SymbolGroup, config: &GroupConfig) -> Result<(), ConfigError> {
    if config.symbols.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "symbols",
            reason: format!("group {group} has no symbols"),
        });
    }
    if config.min_print_usd < Decimal::ZERO {
        return Err(ConfigError::InvalidValue {
            field: "min_print_usd",
            reason: format!("must be >= 0 in group {group}"),
        });
    }
    validate_thresholds(group, "whale", &config.whale)?;
    validate_thresholds(group, "liquidation", &config.liquidation)?;
    Ok(())
}

fn validate_thresholds(
    group: SymbolGroup,
    kind: &str,
    thresholds: &ThresholdConfig,
) -> Result<(), ConfigError> {
    if thresholds.min_total_volume_usd <= Decimal::ZERO {
        return Err(ConfigError::InvalidValue {
            field: "min_total_volume_usd",
            reason: format!("must be > 0 in {group}.{kind}"),
        });
    }
    if thresholds.min_dominance_ratio <= Decimal::ZERO
        || thresholds.min_dominance_ratio > Decimal::ONE
    {
        return Err(ConfigError::InvalidValue {
            field: "min_dominance_ratio",
            reason: format!("must be within (0, 1] in {group}.{kind}"),
        });
    }
    if thresholds.min_event_count == 0 {
        return Err(ConfigError::InvalidValue {
            field: "min_event_count",
            reason: format!("must be >= 1 in {group}.{kind}"),
        });
    }
    Ok(())
}

/// Runtime lookup table mapping instruments to groups and groups to thresholds.
#[derive(Debug, Clone)]
pub struct SymbolGroupTable {
    by_symbol: HashMap<Instrument, SymbolGroup>,
    groups: GroupsConfig,
}

impl SymbolGroupTable {
    /// Resolve the group an instrument belongs to, if any. Instruments from
    /// the catch-all liquidation feed may be unknown and are skipped upstream.
    #[must_use]
    pub fn resolve(&self, instrument: &Instrument) -> Option<SymbolGroup> {
        self.by_symbol.get(instrument).copied()
    }

    #[must_use]
    pub fn group(&self, group: SymbolGroup) -> &GroupConfig {
        match group {
            SymbolGroup::Majors => &self.groups.majors,
            SymbolGroup::LargeCap => &self.groups.large_cap,
            SymbolGroup::MidCap => &self.groups.mid_cap,
        }
    }

    /// Thresholds for one group, selected by the event class the detector
    /// evaluates.
    #[must_use]
    pub fn thresholds(&self, group: SymbolGroup, class: EventClass) -> &ThresholdConfig {
        let config = self.group(group);
        match class {
            EventClass::Trade => &config.whale,
            EventClass::Liquidation => &config.liquidation,
        }
    }

    /// All configured instruments with their groups.
    pub fn instruments(&self) -> impl Iterator<Item = (&Instrument, SymbolGroup)> {
        self.by_symbol.iter().map(|(i, g)| (i, *g))
    }
}

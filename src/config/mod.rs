//! Application configuration loading and validation.
//!
//! Configuration is loaded from a TOML file with environment variable
//! overrides for sensitive values like `WHALEWATCH_STREAM_KEY`.

use serde::Deserialize;
use std::path::Path;

use crate::error::{ConfigError, Result};

mod groups;
mod logging;

pub use groups::{GroupConfig, GroupsConfig, SymbolGroupTable, ThresholdConfig};
pub use logging::LoggingConfig;

/// Environment variable holding the feed credential, appended to the
/// connection URL as a query parameter. Never read from the config file.
pub const STREAM_KEY_ENV: &str = "WHALEWATCH_STREAM_KEY";

/// Reconnection backoff configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BackoffConfig {
    /// Delay before the first reconnection attempt (seconds).
    #[serde(default = "default_backoff_initial_secs")]
    pub initial_secs: u64,
    /// Multiplier applied to the delay after each failed attempt.
    #[serde(default = "default_backoff_multiplier")]
    pub multiplier: f64,
    /// Upper bound on the delay between attempts (seconds).
    #[serde(default = "default_backoff_max_secs")]
    pub max_secs: u64,
}

const fn default_backoff_initial_secs() -> u64 {
    2
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

const fn default_backoff_max_secs() -> u64 {
    60
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_secs: default_backoff_initial_secs(),
            multiplier: default_backoff_multiplier(),
            max_secs: default_backoff_max_secs(),
        }
    }
}

/// WebSocket feed configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    /// Feed endpoint, e.g. `wss://feed.example.com/ws`.
    pub ws_url: String,
    /// Exchange identifier used in trade channel names, e.g. `binance`.
    pub exchange: String,
    /// Instruments to subscribe trade channels for. Liquidations arrive on a
    /// catch-all channel and need no per-symbol subscription.
    #[serde(default)]
    pub trade_symbols: Vec<String>,
    /// Liveness ping interval (seconds).
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,
    /// Seconds to wait for a pong before treating the connection as dead.
    #[serde(default = "default_pong_timeout_secs")]
    pub pong_timeout_secs: u64,
    #[serde(default)]
    pub backoff: BackoffConfig,
    /// Feed credential loaded from `WHALEWATCH_STREAM_KEY` at runtime.
    #[serde(skip)]
    pub stream_key: Option<String>,
}

const fn default_ping_interval_secs() -> u64 {
    20
}

const fn default_pong_timeout_secs() -> u64 {
    10
}

/// Sliding window configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorConfig {
    /// Window span in seconds. Events older than this are pruned.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

const fn default_window_secs() -> u64 {
    30
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
        }
    }
}

/// Detector scheduling configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectorsConfig {
    /// Evaluation cadence in seconds. Both detectors tick at this rate.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
}

const fn default_tick_secs() -> u64 {
    5
}

impl Default for DetectorsConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
        }
    }
}

/// Telegram alert delivery configuration. Credentials come from
/// `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHAT_ID` at runtime.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelegramAlertsConfig {
    /// Enable the Telegram sink.
    #[serde(default)]
    pub enabled: bool,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub stream: StreamConfig,
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub detectors: DetectorsConfig,
    /// Symbol groups with their detection thresholds. All three groups are
    /// required.
    pub groups: GroupsConfig,
    #[serde(default)]
    pub telegram: TelegramAlertsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;

        let mut config: Self = toml::from_str(&content).map_err(ConfigError::Parse)?;

        // Feed credential comes from the environment, never the config file.
        config.stream.stream_key = std::env::var(STREAM_KEY_ENV).ok();

        config.validate()?;

        Ok(config)
    }

    #[allow(clippy::result_large_err)]
    pub fn validate(&self) -> Result<()> {
        if self.stream.ws_url.is_empty() {
            return Err(ConfigError::MissingField {
                field: "stream.ws_url",
            }
            .into());
        }
        // Catch a bad endpoint here instead of letting the reconnect loop
        // chew on it forever.
        match url::Url::parse(&self.stream.ws_url) {
            Ok(url) if matches!(url.scheme(), "ws" | "wss") => {}
            Ok(url) => {
                return Err(ConfigError::InvalidValue {
                    field: "stream.ws_url",
                    reason: format!("scheme must be ws or wss, got {}", url.scheme()),
                }
                .into());
            }
            Err(e) => {
                return Err(ConfigError::InvalidValue {
                    field: "stream.ws_url",
                    reason: format!("not a valid URL: {e}"),
                }
                .into());
            }
        }
        if self.stream.exchange.is_empty() {
            return Err(ConfigError::MissingField {
                field: "stream.exchange",
            }
            .into());
        }
        if self.stream.ping_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "stream.ping_interval_secs",
                reason: "must be at least 1".into(),
            }
            .into());
        }
        if self.stream.pong_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "stream.pong_timeout_secs",
                reason: "must be at least 1".into(),
            }
            .into());
        }

        let backoff = &self.stream.backoff;
        if backoff.initial_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "stream.backoff.initial_secs",
                reason: "must be at least 1".into(),
            }
            .into());
        }
        if backoff.multiplier < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "stream.backoff.multiplier",
                reason: format!("must be >= 1.0, got {}", backoff.multiplier),
            }
            .into());
        }
        if backoff.max_secs < backoff.initial_secs {
            return Err(ConfigError::InvalidValue {
                field: "stream.backoff.max_secs",
                reason: format!(
                    "must be >= initial_secs ({} < {})",
                    backoff.max_secs, backoff.initial_secs
                ),
            }
            .into());
        }

        if self.aggregator.window_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "aggregator.window_secs",
                reason: "must be at least 1".into(),
            }
            .into());
        }
        if self.detectors.tick_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "detectors.tick_secs",
                reason: "must be at least 1".into(),
            }
            .into());
        }

        self.groups.validate()?;

        // Every subscribed instrument must resolve to a threshold set.
        let table = self.groups.build_table();
        for symbol in &self.stream.trade_symbols {
            let instrument = crate::domain::Instrument::new(symbol);
            if table.resolve(&instrument).is_none() {
                return Err(ConfigError::UnknownSymbol {
                    symbol: symbol.clone(),
                }
                .into());
            }
        }

        Ok(())
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn minimal_toml() -> String {
        r#"
            [stream]
            ws_url = "wss://feed.example.com/ws"
            exchange = "binance"
            trade_symbols = ["BTCUSDT", "SOLUSDT"]

            [groups.majors]
            symbols = ["BTCUSDT", "ETHUSDT"]
            min_print_usd = 100000
            [groups.majors.whale]
            min_total_volume_usd = 3000000
            min_dominance_ratio = 0.70
            min_event_count = 3
            cooldown_secs = 600
            [groups.majors.liquidation]
            min_total_volume_usd = 1000000
            min_dominance_ratio = 0.75
            min_event_count = 5
            cooldown_secs = 300

            [groups.large_cap]
            symbols = ["SOLUSDT"]
            min_print_usd = 50000
            [groups.large_cap.whale]
            min_total_volume_usd = 1000000
            min_dominance_ratio = 0.75
            min_event_count = 3
            cooldown_secs = 600
            [groups.large_cap.liquidation]
            min_total_volume_usd = 500000
            min_dominance_ratio = 0.75
            min_event_count = 4
            cooldown_secs = 300

            [groups.mid_cap]
            symbols = ["ARBUSDT"]
            min_print_usd = 25000
            [groups.mid_cap.whale]
            min_total_volume_usd = 500000
            min_dominance_ratio = 0.80
            min_event_count = 3
            cooldown_secs = 900
            [groups.mid_cap.liquidation]
            min_total_volume_usd = 250000
            min_dominance_ratio = 0.80
            min_event_count = 4
            cooldown_secs = 450
        "#
        .to_string()
    }

    fn parse(toml_str: &str) -> Config {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn minimal_config_passes_validation() {
        let config = parse(&minimal_toml());
        config.validate().unwrap();
    }

    #[test]
    fn load_reads_config_from_disk() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(minimal_toml().as_bytes()).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.stream.exchange, "binance");
        assert_eq!(config.stream.trade_symbols.len(), 2);
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = parse(&minimal_toml());

        assert_eq!(config.stream.ping_interval_secs, 20);
        assert_eq!(config.stream.pong_timeout_secs, 10);
        assert_eq!(config.stream.backoff.initial_secs, 2);
        assert_eq!(config.stream.backoff.max_secs, 60);
        assert_eq!(config.aggregator.window_secs, 30);
        assert_eq!(config.detectors.tick_secs, 5);
        assert!(!config.telegram.enabled);
    }

    #[test]
    fn empty_ws_url_is_rejected() {
        let mut config = parse(&minimal_toml());
        config.stream.ws_url.clear();

        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::MissingField {
                field: "stream.ws_url"
            })
        ));
    }

    #[test]
    fn non_websocket_url_is_rejected() {
        let mut config = parse(&minimal_toml());
        config.stream.ws_url = "https://feed.example.com/ws".into();

        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue {
                field: "stream.ws_url",
                ..
            })
        ));
    }

    #[test]
    fn backoff_multiplier_below_one_is_rejected() {
        let mut config = parse(&minimal_toml());
        config.stream.backoff.multiplier = 0.5;

        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue {
                field: "stream.backoff.multiplier",
                ..
            })
        ));
    }

    #[test]
    fn unassigned_trade_symbol_is_rejected() {
        let mut config = parse(&minimal_toml());
        config.stream.trade_symbols.push("DOGEUSDT".into());

        let err = config.validate().unwrap_err();
        match err {
            Error::Config(ConfigError::UnknownSymbol { symbol }) => {
                assert_eq!(symbol, "DOGEUSDT");
            }
            other => panic!("expected UnknownSymbol, got {other:?}"),
        }
    }

    #[test]
    fn missing_group_section_fails_to_parse() {
        let toml_str = minimal_toml().replace("[groups.mid_cap]", "[groups.mid_cap_typo]");

        assert!(toml::from_str::<Config>(&toml_str).is_err());
    }

    #[test]
    fn missing_threshold_block_fails_to_parse() {
        let toml_str = minimal_toml().replace(
            "[groups.mid_cap.liquidation]",
            "[groups.mid_cap.liquidation_typo]",
        );

        assert!(toml::from_str::<Config>(&toml_str).is_err());
    }
}

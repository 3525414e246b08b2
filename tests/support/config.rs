use whalewatch::config::{
    AggregatorConfig, Config, DetectorsConfig, LoggingConfig, StreamConfig, TelegramAlertsConfig,
};
use whalewatch::testkit;

/// A complete config file accepted by `Config::load`, mirroring
/// `config.example.toml` with the canonical three-group table.
pub fn valid_config_toml() -> String {
    r#"
[stream]
ws_url = "wss://feed.example.com/ws"
exchange = "binance"
trade_symbols = ["BTCUSDT", "ETHUSDT", "SOLUSDT"]
ping_interval_secs = 20
pong_timeout_secs = 10

[stream.backoff]
initial_secs = 2
multiplier = 2.0
max_secs = 60

[aggregator]
window_secs = 30

[detectors]
tick_secs = 5

[telegram]
enabled = false

[logging]
level = "info"
format = "pretty"

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
symbols = ["SOLUSDT", "BNBUSDT"]
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
symbols = ["ARBUSDT", "OPUSDT"]
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

/// In-memory config for driving `run_pipeline` directly, with the canonical
/// testkit group table and production-default timings.
pub fn pipeline_config(trade_symbols: &[&str]) -> Config {
    Config {
        stream: StreamConfig {
            ws_url: "wss://feed.example.com/ws".to_string(),
            exchange: "binance".to_string(),
            trade_symbols: trade_symbols.iter().map(ToString::to_string).collect(),
            ping_interval_secs: 20,
            pong_timeout_secs: 10,
            backoff: testkit::config::backoff(),
            stream_key: None,
        },
        aggregator: AggregatorConfig::default(),
        detectors: DetectorsConfig::default(),
        groups: testkit::config::groups(),
        telegram: TelegramAlertsConfig::default(),
        logging: LoggingConfig::default(),
    }
}

//! Pipeline orchestration.
//!
//! Wires the stream client, the window aggregator, the two detectors, and the
//! alert sink into a running pipeline, and owns its shutdown sequencing.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::{Config, SymbolGroupTable};
use crate::detect::Detector;
use crate::domain::{DetectorKind, EventAggregator, EventClass, Instrument, RawEvent};
use crate::error::Result;
use crate::notify::{AlertSink, LogSink};
#[cfg(feature = "telegram")]
use crate::notify::{TelegramCreds, TelegramSink};
use crate::stream::{ChannelSpec, EventStream, ReconnectingStream, StreamEvent, WsEventStream};

use super::stats::PipelineStats;

/// Cadence of the periodic status line and window sweep.
const STATUS_INTERVAL_SECS: u64 = 60;

/// Buffered events between the stream task and the aggregation loop. The
/// aggregation path is cheap, so the buffer only fills if it stalls outright.
const EVENT_BUFFER: usize = 1024;

/// Main application struct.
pub struct App;

impl App {
    /// Run the pipeline until the stream ends.
    pub async fn run(config: Config) -> Result<()> {
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        Self::run_with_shutdown(config, shutdown_rx).await
    }

    /// Run with an externally controlled shutdown signal.
    pub async fn run_with_shutdown(config: Config, shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(
            feed = %config.stream.ws_url,
            exchange = %config.stream.exchange,
            symbols = config.stream.trade_symbols.len(),
            "Starting whalewatch"
        );

        let table = config.groups.build_table();
        let channels = subscription_channels(&config, &table);
        let sink = build_alert_sink(&config);

        let stream = ReconnectingStream::new(
            WsEventStream::new(&config.stream),
            config.stream.backoff.clone(),
        );

        run_pipeline(&config, stream, &channels, sink, shutdown).await
    }
}

/// Core pipeline loop, generic over the stream implementation.
///
/// Connects and subscribes, spawns the stream task and both detectors, then
/// drains events into the aggregator until shutdown or stream end. Detectors
/// are signalled and joined before returning.
pub async fn run_pipeline<S>(
    config: &Config,
    mut stream: ReconnectingStream<S>,
    channels: &[ChannelSpec],
    sink: Arc<dyn AlertSink>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()>
where
    S: EventStream + 'static,
{
    // A feed that is down at launch is a transport failure, not a startup
    // failure. Subscribe records the channel list either way, and the
    // reconnect loop dials and replays it with backoff once the stream task
    // starts pulling events.
    if let Err(e) = stream.connect().await {
        warn!(error = %e, "Initial connect failed, retrying with backoff");
    }
    if let Err(e) = stream.subscribe(channels).await {
        warn!(error = %e, "Initial subscribe failed, will resubscribe after reconnect");
    }

    let aggregator = Arc::new(EventAggregator::new(config.aggregator.window_secs));
    let stats = Arc::new(PipelineStats::new());
    let table = config.groups.build_table();

    let (detector_shutdown_tx, detector_shutdown_rx) = watch::channel(false);
    let whale_handle = Detector::new(
        DetectorKind::WhaleCluster,
        config.detectors.tick_secs,
        Arc::clone(&aggregator),
        table.clone(),
        Arc::clone(&sink),
        Arc::clone(&stats),
    )
    .start(detector_shutdown_rx.clone());
    let storm_handle = Detector::new(
        DetectorKind::LiquidationStorm,
        config.detectors.tick_secs,
        Arc::clone(&aggregator),
        table,
        sink,
        Arc::clone(&stats),
    )
    .start(detector_shutdown_rx);

    let (event_tx, mut event_rx) = mpsc::channel(EVENT_BUFFER);
    let pump_handle = tokio::spawn(pump_stream(
        stream,
        event_tx,
        Arc::clone(&stats),
        shutdown.clone(),
    ));

    info!("Listening for feed events");

    let mut status_interval = tokio::time::interval(Duration::from_secs(STATUS_INTERVAL_SECS));
    status_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            result = shutdown.changed() => {
                match result {
                    Ok(()) => {
                        if *shutdown.borrow() {
                            info!("Shutdown signal received");
                            break;
                        }
                    }
                    Err(_) => {
                        info!("Shutdown channel closed");
                        break;
                    }
                }
            }
            _ = status_interval.tick() => {
                let now = Utc::now();
                aggregator.sweep(now);
                let snapshot = stats.snapshot();
                info!(
                    events = snapshot.events_ingested,
                    dropped = snapshot.events_dropped,
                    detections = snapshot.detections_emitted,
                    delivery_failures = snapshot.delivery_failures,
                    active_windows = aggregator.window_count(),
                    trade_instruments = aggregator.active_instruments(EventClass::Trade, now).len(),
                    liquidation_instruments =
                        aggregator.active_instruments(EventClass::Liquidation, now).len(),
                    "Pipeline status"
                );
            }
            event = event_rx.recv() => {
                let Some(event) = event else {
                    warn!("Event stream ended");
                    break;
                };
                aggregator.record(&event);
                stats.note_event();
            }
        }
    }

    let _ = detector_shutdown_tx.send(true);
    let _ = whale_handle.await;
    let _ = storm_handle.await;
    let _ = pump_handle.await;

    Ok(())
}

/// Read events off the stream and forward them to the aggregation loop.
///
/// Runs as its own task so that reconnection sleeps inside `next_event` are
/// never cancelled by the status interval.
async fn pump_stream<S>(
    mut stream: ReconnectingStream<S>,
    event_tx: mpsc::Sender<RawEvent>,
    stats: Arc<PipelineStats>,
    mut shutdown: watch::Receiver<bool>,
) where
    S: EventStream,
{
    loop {
        tokio::select! {
            result = shutdown.changed() => {
                match result {
                    Ok(()) => {
                        if *shutdown.borrow() {
                            debug!("Stream task shutting down");
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
            event = stream.next_event() => {
                match event {
                    Some(StreamEvent::Event(event)) => match event_tx.try_send(event) {
                        Ok(()) => {}
                        Err(mpsc::error::TrySendError::Full(_)) => {
                            stats.note_event_dropped();
                            warn!("Event channel full, dropping event");
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => {
                            debug!("Event channel closed, stopping stream task");
                            break;
                        }
                    },
                    Some(StreamEvent::Disconnected { reason }) => {
                        debug!(reason = %reason, "Stream reported disconnect");
                    }
                    None => {
                        warn!("Event stream ended");
                        break;
                    }
                }
            }
        }
    }
}

/// Channels to subscribe: the catch-all liquidation feed plus one trade
/// channel per configured symbol, floored at its group's minimum print size.
fn subscription_channels(config: &Config, table: &SymbolGroupTable) -> Vec<ChannelSpec> {
    let mut channels = vec![ChannelSpec::AllLiquidations];
    for symbol in &config.stream.trade_symbols {
        let instrument = Instrument::new(symbol);
        // Validation already rejected symbols outside the group table.
        let Some(group) = table.resolve(&instrument) else {
            continue;
        };
        channels.push(ChannelSpec::Trades {
            exchange: config.stream.exchange.clone(),
            instrument,
            min_notional_usd: table.group(group).min_print_usd,
        });
    }
    channels
}

/// Pick the alert sink from configuration. Telegram when enabled and
/// credentialed, otherwise the log sink.
fn build_alert_sink(config: &Config) -> Arc<dyn AlertSink> {
    #[cfg(feature = "telegram")]
    if config.telegram.enabled {
        if let Some(creds) = TelegramCreds::from_env() {
            info!("Telegram alerts enabled");
            return Arc::new(TelegramSink::new(creds));
        }
        warn!("Telegram enabled but TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID not set");
    }

    #[cfg(not(feature = "telegram"))]
    let _ = config;

    info!("Alerts will be written to the log");
    Arc::new(LogSink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    use crate::config::{
        AggregatorConfig, DetectorsConfig, LoggingConfig, StreamConfig, TelegramAlertsConfig,
    };
    use crate::testkit;

    fn test_config() -> Config {
        Config {
            stream: StreamConfig {
                ws_url: "wss://feed.example.com/ws".to_string(),
                exchange: "binance".to_string(),
                trade_symbols: vec!["BTCUSDT".to_string(), "SOLUSDT".to_string()],
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

    #[test]
    fn channels_cover_liquidations_and_configured_trades() {
        let config = test_config();
        let table = config.groups.build_table();

        let channels = subscription_channels(&config, &table);

        assert_eq!(channels.len(), 3);
        assert_eq!(channels[0], ChannelSpec::AllLiquidations);
        assert_eq!(
            channels[1],
            ChannelSpec::Trades {
                exchange: "binance".to_string(),
                instrument: Instrument::new("BTCUSDT"),
                min_notional_usd: dec!(100000),
            }
        );
        assert_eq!(
            channels[2],
            ChannelSpec::Trades {
                exchange: "binance".to_string(),
                instrument: Instrument::new("SOLUSDT"),
                min_notional_usd: dec!(50000),
            }
        );
    }

    #[test]
    fn trade_floor_follows_the_symbol_group() {
        let config = test_config();
        let table = config.groups.build_table();

        let channels = subscription_channels(&config, &table);

        let ids: Vec<String> = channels.iter().map(ChannelSpec::id).collect();
        assert_eq!(
            ids,
            [
                "liquidations",
                "binance_BTCUSDT_100000",
                "binance_SOLUSDT_50000"
            ]
        );
    }

    #[test]
    fn disabled_telegram_falls_back_to_log_sink() {
        let config = test_config();
        assert!(!config.telegram.enabled);

        let sink = build_alert_sink(&config);

        assert_eq!(sink.sink_name(), "log");
    }
}

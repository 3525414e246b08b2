//! Reconnecting wrapper for event streams.
//!
//! Adds automatic reconnection with exponential backoff to any
//! [`EventStream`] implementation. Delays follow a deterministic doubling
//! schedule from the configured initial value up to the cap; there is no
//! upper bound on attempts, so a down feed is retried until it comes back
//! or the process is shut down.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::config::BackoffConfig;
use crate::error::Result;

use super::{ChannelSpec, EventStream, StreamEvent};

/// Wrapper that adds reconnection logic to any [`EventStream`].
///
/// Consumers only ever observe [`StreamEvent::Event`]: disconnects are
/// swallowed, the connection is re-dialed after a backoff delay, and the
/// stored channels are resubscribed before events flow again.
pub struct ReconnectingStream<S: EventStream> {
    /// The underlying stream.
    inner: S,
    /// Backoff configuration.
    config: BackoffConfig,
    /// Channels to resubscribe after reconnection.
    channels: Vec<ChannelSpec>,
    /// Current consecutive failure count.
    consecutive_failures: u32,
    /// Delay before the next reconnection attempt (seconds).
    current_delay_secs: u64,
    /// Whether we're currently connected.
    connected: bool,
    /// When the current connection came up.
    connected_at: Option<Instant>,
}

impl<S: EventStream> ReconnectingStream<S> {
    /// Create a new reconnecting wrapper.
    pub fn new(inner: S, config: BackoffConfig) -> Self {
        let initial_delay = config.initial_secs;
        Self {
            inner,
            config,
            channels: Vec::new(),
            consecutive_failures: 0,
            current_delay_secs: initial_delay,
            connected: false,
            connected_at: None,
        }
    }

    fn reset_backoff(&mut self) {
        self.consecutive_failures = 0;
        self.current_delay_secs = self.config.initial_secs;
    }

    /// Delay to sleep before the next attempt. Grows the stored delay for
    /// the attempt after this one, capped at the configured maximum.
    fn next_delay(&mut self) -> Duration {
        let delay = Duration::from_secs(self.current_delay_secs);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let grown = (self.current_delay_secs as f64 * self.config.multiplier) as u64;
        self.current_delay_secs = grown.min(self.config.max_secs);

        delay
    }

    fn record_failure(&mut self) {
        self.consecutive_failures += 1;
        self.connected = false;
        self.connected_at = None;
    }

    /// Reset backoff once the connection has stayed up longer than the
    /// current backoff delay. A connection that dies sooner than that keeps
    /// the grown delay, so a flapping feed cannot pin retries at the
    /// initial two seconds.
    fn note_event_received(&mut self) {
        if self.consecutive_failures == 0 {
            return;
        }
        if let Some(connected_at) = self.connected_at {
            if connected_at.elapsed() >= Duration::from_secs(self.current_delay_secs) {
                debug!("Connection stable, resetting backoff");
                self.reset_backoff();
            }
        }
    }

    /// Sleep out the backoff delay, then reconnect and resubscribe.
    async fn reconnect(&mut self) -> Result<()> {
        let delay = self.next_delay();
        info!(
            delay_secs = delay.as_secs(),
            attempt = self.consecutive_failures + 1,
            stream = self.inner.stream_name(),
            "Reconnecting after delay"
        );
        sleep(delay).await;

        match self.inner.connect().await {
            Ok(()) => {
                info!("Reconnected");
                self.connected = true;
                self.connected_at = Some(Instant::now());

                if !self.channels.is_empty() {
                    debug!(channels = self.channels.len(), "Resubscribing to channels");
                    if let Err(err) = self.inner.subscribe(&self.channels).await {
                        error!(error = %err, "Resubscribe failed after reconnect");
                        self.record_failure();
                        return Err(err);
                    }
                }

                // Backoff resets later, once the connection proves stable.
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Reconnection failed");
                self.record_failure();
                Err(e)
            }
        }
    }
}

#[async_trait]
impl<S: EventStream + Send> EventStream for ReconnectingStream<S> {
    async fn connect(&mut self) -> Result<()> {
        let result = self.inner.connect().await;
        if result.is_ok() {
            self.connected = true;
            self.connected_at = Some(Instant::now());
        }
        result
    }

    async fn subscribe(&mut self, channels: &[ChannelSpec]) -> Result<()> {
        // Store channels for resubscription after reconnect
        self.channels = channels.to_vec();
        self.inner.subscribe(channels).await
    }

    async fn next_event(&mut self) -> Option<StreamEvent> {
        loop {
            if !self.connected {
                if let Err(e) = self.reconnect().await {
                    warn!(error = %e, "Reconnection attempt failed, will retry");
                    continue;
                }
            }

            match self.inner.next_event().await {
                Some(StreamEvent::Disconnected { reason }) => {
                    warn!(reason = %reason, "Connection lost, will reconnect");
                    self.record_failure();
                    continue;
                }
                Some(event) => {
                    self.note_event_received();
                    return Some(event);
                }
                None => {
                    warn!("Event stream ended unexpectedly, will reconnect");
                    self.record_failure();
                    continue;
                }
            }
        }
    }

    fn stream_name(&self) -> &'static str {
        self.inner.stream_name()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::error::Error;
    use crate::testkit;
    use crate::testkit::stream::ScriptedStream;

    fn backoff_config() -> BackoffConfig {
        BackoffConfig {
            initial_secs: 2,
            multiplier: 2.0,
            max_secs: 60,
        }
    }

    #[tokio::test]
    async fn successful_connection_yields_events() {
        let mock =
            ScriptedStream::new().with_events(vec![Some(testkit::domain::buy_event("BTCUSDT"))]);

        let mut stream = ReconnectingStream::new(mock, backoff_config());
        stream.connect().await.unwrap();

        let event = stream.next_event().await;
        assert!(matches!(event, Some(StreamEvent::Event(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn reconnects_after_disconnect() {
        let mock = ScriptedStream::new().with_events(vec![
            Some(testkit::domain::disconnect_event("server vanished")),
            Some(testkit::domain::buy_event("BTCUSDT")),
        ]);
        let (connect_count, subscribe_count) = mock.counts();

        let mut stream = ReconnectingStream::new(mock, backoff_config());
        stream.connect().await.unwrap();
        stream
            .subscribe(&[ChannelSpec::AllLiquidations])
            .await
            .unwrap();

        // First call swallows the disconnect and reconnects, then yields the event.
        let event = stream.next_event().await;
        assert!(matches!(event, Some(StreamEvent::Event(_))));

        assert_eq!(connect_count.load(Ordering::SeqCst), 2);
        assert_eq!(subscribe_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn backoff_delays_double_up_to_the_cap() {
        let mut stream = ReconnectingStream::new(ScriptedStream::new(), backoff_config());

        let delays: Vec<u64> = (0..7).map(|_| stream.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![2, 4, 8, 16, 32, 60, 60]);
    }

    #[test]
    fn reset_backoff_restores_initial_delay() {
        let mut stream = ReconnectingStream::new(ScriptedStream::new(), backoff_config());

        stream.consecutive_failures = 5;
        stream.current_delay_secs = 60;
        stream.reset_backoff();

        assert_eq!(stream.consecutive_failures, 0);
        assert_eq!(stream.current_delay_secs, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_failures_retry_until_success() {
        let mock = ScriptedStream::new()
            .with_connect_results(vec![
                Err(Error::Connection("refused".into())),
                Err(Error::Connection("refused".into())),
                Ok(()),
            ])
            .with_events(vec![Some(testkit::domain::buy_event("BTCUSDT"))]);
        let (connect_count, _) = mock.counts();

        let mut stream = ReconnectingStream::new(mock, backoff_config());

        // No explicit connect: the wrapper dials on first use and keeps
        // retrying through the failures.
        let event = stream.next_event().await;
        assert!(matches!(event, Some(StreamEvent::Event(_))));
        assert_eq!(connect_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn first_event_after_reconnect_does_not_reset_backoff() {
        let mock = ScriptedStream::new().with_events(vec![
            Some(testkit::domain::disconnect_event("blip")),
            Some(testkit::domain::buy_event("BTCUSDT")),
        ]);

        let mut stream = ReconnectingStream::new(mock, backoff_config());
        stream.connect().await.unwrap();

        stream.next_event().await.unwrap();

        // One failure happened and the very next event arrived immediately:
        // the grown delay must survive.
        assert_eq!(stream.consecutive_failures, 1);
        assert_eq!(stream.current_delay_secs, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn sustained_uptime_resets_backoff() {
        let mock = ScriptedStream::new().with_events(vec![
            Some(testkit::domain::disconnect_event("blip")),
            Some(testkit::domain::buy_event("BTCUSDT")),
            Some(testkit::domain::buy_event("ETHUSDT")),
        ]);

        let mut stream = ReconnectingStream::new(mock, backoff_config());
        stream.connect().await.unwrap();

        stream.next_event().await.unwrap();
        assert_eq!(stream.current_delay_secs, 4);

        // Uptime exceeds the pending four second delay, so the next event
        // resets the schedule.
        tokio::time::advance(Duration::from_secs(5)).await;
        stream.next_event().await.unwrap();

        assert_eq!(stream.consecutive_failures, 0);
        assert_eq!(stream.current_delay_secs, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn early_disconnects_keep_growing_the_delay() {
        let mock = ScriptedStream::new().with_events(vec![
            Some(testkit::domain::disconnect_event("blip")),
            Some(testkit::domain::buy_event("BTCUSDT")),
            Some(testkit::domain::disconnect_event("blip again")),
            Some(testkit::domain::buy_event("BTCUSDT")),
        ]);

        let mut stream = ReconnectingStream::new(mock, backoff_config());
        stream.connect().await.unwrap();

        stream.next_event().await.unwrap();
        assert_eq!(stream.current_delay_secs, 4);

        stream.next_event().await.unwrap();
        assert_eq!(stream.consecutive_failures, 2);
        assert_eq!(stream.current_delay_secs, 8);
    }
}

//! Feed WebSocket client.
//!
//! Connection lifecycle:
//!
//! 1. **Connect**: dial the endpoint with the credential appended as a query
//!    parameter, bounded by a handshake timeout.
//! 2. **Subscribe**: send one JSON subscribe request naming the channels.
//! 3. **Message loop**: turn text frames into events, answer protocol pings,
//!    and send liveness pings of our own.
//!
//! The client does not reconnect. When the connection drops it surfaces
//! [`StreamEvent::Disconnected`] and waits for `connect` to be called again;
//! [`ReconnectingStream`](super::ReconnectingStream) automates that.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::config::StreamConfig;
use crate::domain::RawEvent;
use crate::error::{Error, Result};
use crate::stream::messages::{EventFrame, SubscribeRequest, WireMessage};
use crate::stream::{ChannelSpec, EventStream, StreamEvent};

/// Cap on the connect handshake, TLS included.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// One outcome of waiting on the socket and the liveness timers.
enum Step {
    /// Time to send a liveness ping.
    PingDue,
    /// The last liveness ping went unanswered past the deadline.
    PongOverdue,
    /// A frame (or stream end) from the socket.
    Frame(Option<std::result::Result<Message, WsError>>),
}

/// WebSocket client for the trade and liquidation feed.
///
/// Implements [`EventStream`]: connect, subscribe, then pull events with
/// `next_event`. Liveness is verified with client-initiated pings; a pong
/// that fails to arrive within the configured timeout tears the connection
/// down so the caller can re-dial.
pub struct WsEventStream {
    url: String,
    stream_key: Option<String>,
    ping_interval: Duration,
    pong_timeout: Duration,
    ws: Option<WebSocketStream<MaybeTlsStream<TcpStream>>>,
    ping_timer: Option<Interval>,
    /// Deadline for the pong answering the oldest unanswered liveness ping.
    pong_deadline: Option<Instant>,
    /// Buffer for events when one frame carries more than one.
    pending: VecDeque<RawEvent>,
}

impl WsEventStream {
    #[must_use]
    pub fn new(config: &StreamConfig) -> Self {
        Self {
            url: config.ws_url.clone(),
            stream_key: config.stream_key.clone(),
            ping_interval: Duration::from_secs(config.ping_interval_secs),
            pong_timeout: Duration::from_secs(config.pong_timeout_secs),
            ws: None,
            ping_timer: None,
            pong_deadline: None,
            pending: VecDeque::new(),
        }
    }

    /// Connection URL with the credential appended as a query parameter.
    ///
    /// Kept separate from the configured URL so log lines never carry the
    /// credential.
    fn connect_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.url)?;
        if let Some(key) = &self.stream_key {
            url.query_pairs_mut().append_pair("token", key);
        }
        Ok(url)
    }

    fn teardown(&mut self) {
        self.ws = None;
        self.ping_timer = None;
        self.pong_deadline = None;
    }

    /// Queue parsed events, dropping frames that cannot be represented.
    fn buffer_events(&mut self, frames: &[EventFrame]) {
        for frame in frames {
            match frame.to_raw_event() {
                Ok(event) => self.pending.push_back(event),
                Err(reason) => {
                    warn!(symbol = %frame.symbol, reason, "Dropping malformed event");
                }
            }
        }
    }

    /// Handle one WebSocket message. Returns an event to surface, or `None`
    /// to keep reading. Parsed feed events land in `pending`.
    async fn handle_message(&mut self, msg: Message) -> Option<StreamEvent> {
        match msg {
            Message::Text(text) => {
                trace!(bytes = text.len(), "Received feed text frame");
                match serde_json::from_str::<WireMessage>(&text) {
                    Ok(WireMessage::Batch(frames)) => self.buffer_events(&frames),
                    Ok(WireMessage::Single(frame)) => {
                        self.buffer_events(std::slice::from_ref(&frame));
                    }
                    Ok(WireMessage::Control(frame)) => {
                        debug!(op = %frame.op, "Feed control frame");
                    }
                    Ok(WireMessage::Unknown(_)) => {
                        debug!(bytes = text.len(), "Ignoring unrecognized frame");
                    }
                    Err(e) => {
                        warn!(error = %e, bytes = text.len(), "Failed to parse message");
                    }
                }
                None
            }
            Message::Ping(data) => {
                trace!("Received WebSocket ping");
                let ws = self.ws.as_mut()?;
                if ws.send(Message::Pong(data)).await.is_err() {
                    self.teardown();
                    return Some(StreamEvent::Disconnected {
                        reason: "Failed to send pong".into(),
                    });
                }
                None
            }
            Message::Pong(_) => {
                trace!("Received liveness pong");
                self.pong_deadline = None;
                None
            }
            Message::Close(frame) => {
                info!(frame = ?frame, "WebSocket closed by server");
                self.teardown();
                Some(StreamEvent::Disconnected {
                    reason: frame.map(|f| f.reason.to_string()).unwrap_or_default(),
                })
            }
            // Binary and raw frames are ignored.
            _ => None,
        }
    }
}

#[async_trait]
impl EventStream for WsEventStream {
    async fn connect(&mut self) -> Result<()> {
        let url = self.connect_url()?;
        info!(url = %self.url, "Connecting to event feed");

        let (ws_stream, response) =
            tokio::time::timeout(CONNECT_TIMEOUT, connect_async(url.as_str()))
                .await
                .map_err(|_| {
                    Error::Connection(format!(
                        "connect timed out after {}s",
                        CONNECT_TIMEOUT.as_secs()
                    ))
                })??;

        info!(status = %response.status(), "Feed connected");

        let mut timer =
            tokio::time::interval_at(Instant::now() + self.ping_interval, self.ping_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.ws = Some(ws_stream);
        self.ping_timer = Some(timer);
        self.pong_deadline = None;
        self.pending.clear();
        Ok(())
    }

    async fn subscribe(&mut self, channels: &[ChannelSpec]) -> Result<()> {
        let ws = self
            .ws
            .as_mut()
            .ok_or_else(|| Error::Connection("not connected".into()))?;

        let request = SubscribeRequest::new(channels);
        let json = serde_json::to_string(&request)?;

        // Log a truncated view of channels to avoid spam
        let total = request.args.len();
        if total <= 5 {
            info!(channels = ?request.args, "Subscribing to channels");
        } else {
            let preview: Vec<_> = request.args.iter().take(5).collect();
            info!(channels = ?preview, more = total - 5, "Subscribing to channels");
        }
        ws.send(Message::Text(json)).await?;
        Ok(())
    }

    async fn next_event(&mut self) -> Option<StreamEvent> {
        loop {
            // Drain buffered events from an earlier batched frame first.
            if let Some(event) = self.pending.pop_front() {
                return Some(StreamEvent::Event(event));
            }

            let step = {
                let deadline = self.pong_deadline;
                let ws = self.ws.as_mut()?;
                let ping_timer = self.ping_timer.as_mut()?;

                tokio::select! {
                    () = async {
                        match deadline {
                            Some(at) => tokio::time::sleep_until(at).await,
                            None => std::future::pending::<()>().await,
                        }
                    } => Step::PongOverdue,
                    _ = ping_timer.tick() => Step::PingDue,
                    frame = ws.next() => Step::Frame(frame),
                }
            };

            match step {
                Step::PingDue => {
                    let Some(ws) = self.ws.as_mut() else {
                        return None;
                    };
                    if ws.send(Message::Ping(Vec::new())).await.is_err() {
                        self.teardown();
                        return Some(StreamEvent::Disconnected {
                            reason: "Failed to send liveness ping".into(),
                        });
                    }
                    trace!("Sent liveness ping");
                    // The deadline tracks the oldest unanswered ping.
                    if self.pong_deadline.is_none() {
                        self.pong_deadline = Some(Instant::now() + self.pong_timeout);
                    }
                }
                Step::PongOverdue => {
                    warn!(
                        timeout_secs = self.pong_timeout.as_secs(),
                        "Liveness pong not received, tearing connection down"
                    );
                    self.teardown();
                    return Some(StreamEvent::Disconnected {
                        reason: format!("no pong within {}s", self.pong_timeout.as_secs()),
                    });
                }
                Step::Frame(None) => {
                    debug!("WebSocket stream ended");
                    self.teardown();
                    return None;
                }
                Step::Frame(Some(Ok(msg))) => {
                    if let Some(event) = self.handle_message(msg).await {
                        return Some(event);
                    }
                }
                Step::Frame(Some(Err(e))) => {
                    error!(error = %e, "WebSocket error");
                    self.teardown();
                    return Some(StreamEvent::Disconnected {
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    fn stream_name(&self) -> &'static str {
        "feed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackoffConfig;

    fn stream_config(stream_key: Option<&str>) -> StreamConfig {
        StreamConfig {
            ws_url: "wss://feed.example.com/ws".into(),
            exchange: "binance".into(),
            trade_symbols: vec![],
            ping_interval_secs: 20,
            pong_timeout_secs: 10,
            backoff: BackoffConfig::default(),
            stream_key: stream_key.map(String::from),
        }
    }

    // -------------------------------------------------------------------------
    // Connection URL Tests
    // -------------------------------------------------------------------------

    #[test]
    fn connect_url_appends_credential_as_query_param() {
        let stream = WsEventStream::new(&stream_config(Some("s3cr3t")));
        let url = stream.connect_url().unwrap();

        assert_eq!(url.as_str(), "wss://feed.example.com/ws?token=s3cr3t");
    }

    #[test]
    fn connect_url_without_credential_is_unchanged() {
        let stream = WsEventStream::new(&stream_config(None));
        let url = stream.connect_url().unwrap();

        assert_eq!(url.as_str(), "wss://feed.example.com/ws");
    }

    #[test]
    fn connect_url_preserves_existing_query_params() {
        let mut config = stream_config(Some("k"));
        config.ws_url = "wss://feed.example.com/ws?v=2".into();

        let stream = WsEventStream::new(&config);
        let url = stream.connect_url().unwrap();

        assert_eq!(url.as_str(), "wss://feed.example.com/ws?v=2&token=k");
    }

    #[test]
    fn invalid_url_is_rejected() {
        let mut config = stream_config(None);
        config.ws_url = "not a url".into();

        let stream = WsEventStream::new(&config);
        assert!(stream.connect_url().is_err());
    }

    // -------------------------------------------------------------------------
    // Disconnected Behavior Tests
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn subscribe_without_connection_errors() {
        let mut stream = WsEventStream::new(&stream_config(None));

        let err = stream
            .subscribe(&[ChannelSpec::AllLiquidations])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
    }

    #[tokio::test]
    async fn next_event_without_connection_returns_none() {
        let mut stream = WsEventStream::new(&stream_config(None));
        assert!(stream.next_event().await.is_none());
    }

    #[test]
    fn stream_name_is_stable() {
        let stream = WsEventStream::new(&stream_config(None));
        assert_eq!(stream.stream_name(), "feed");
    }
}

//! Mock [`EventStream`] implementations for testing.
//!
//! Two mock stream types for different testing needs:
//!
//! - [`ScriptedStream`] - Pre-loaded connect/subscribe results and events.
//!   Best for: error handling, reconnection logic, retry behavior.
//!
//! - [`ChannelStream`] - Channel-backed stream with external control handle.
//!   Best for: integration tests needing precise, on-demand event delivery.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::Result;
use crate::stream::{ChannelSpec, EventStream, StreamEvent};

// ---------------------------------------------------------------------------
// ScriptedStream
// ---------------------------------------------------------------------------

/// A mock stream with scripted connect/subscribe results and a fixed event queue.
///
/// Each call to `connect()` or `subscribe()` pops the next result from the
/// corresponding queue (defaults to `Ok(())` when exhausted).
pub struct ScriptedStream {
    connect_results: VecDeque<Result<()>>,
    subscribe_results: VecDeque<Result<()>>,
    events: VecDeque<Option<StreamEvent>>,
    connect_count: Arc<AtomicU32>,
    subscribe_count: Arc<AtomicU32>,
    connect_times: Arc<Mutex<Vec<tokio::time::Instant>>>,
}

impl ScriptedStream {
    pub fn new() -> Self {
        Self {
            connect_results: VecDeque::new(),
            subscribe_results: VecDeque::new(),
            events: VecDeque::new(),
            connect_count: Arc::new(AtomicU32::new(0)),
            subscribe_count: Arc::new(AtomicU32::new(0)),
            connect_times: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_connect_results(mut self, results: Vec<Result<()>>) -> Self {
        self.connect_results = results.into();
        self
    }

    pub fn with_subscribe_results(mut self, results: Vec<Result<()>>) -> Self {
        self.subscribe_results = results.into();
        self
    }

    pub fn with_events(mut self, events: Vec<Option<StreamEvent>>) -> Self {
        self.events = events.into();
        self
    }

    /// Get shared counters for asserting connect/subscribe call counts.
    pub fn counts(&self) -> (Arc<AtomicU32>, Arc<AtomicU32>) {
        (self.connect_count.clone(), self.subscribe_count.clone())
    }

    /// Timestamps of every `connect()` call, in order.
    ///
    /// With a paused tokio clock, deltas between consecutive entries expose
    /// the exact backoff delays a reconnecting wrapper slept.
    pub fn connect_times(&self) -> Arc<Mutex<Vec<tokio::time::Instant>>> {
        self.connect_times.clone()
    }

    pub fn connect_count(&self) -> u32 {
        self.connect_count.load(Ordering::SeqCst)
    }

    pub fn subscribe_count(&self) -> u32 {
        self.subscribe_count.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedStream {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStream for ScriptedStream {
    async fn connect(&mut self) -> Result<()> {
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        self.connect_times
            .lock()
            .unwrap()
            .push(tokio::time::Instant::now());
        self.connect_results.pop_front().unwrap_or(Ok(()))
    }

    async fn subscribe(&mut self, _channels: &[ChannelSpec]) -> Result<()> {
        self.subscribe_count.fetch_add(1, Ordering::SeqCst);
        self.subscribe_results.pop_front().unwrap_or(Ok(()))
    }

    async fn next_event(&mut self) -> Option<StreamEvent> {
        self.events.pop_front().flatten()
    }

    fn stream_name(&self) -> &'static str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// ChannelStream
// ---------------------------------------------------------------------------

/// A mock stream controlled externally via a [`ChannelStreamHandle`].
///
/// Events are sent into the handle's `event_tx` and read by the consumer
/// via `next_event()`. No real network I/O.
pub struct ChannelStream {
    event_rx: tokio::sync::mpsc::Receiver<Option<StreamEvent>>,
    connect_count: Arc<AtomicU32>,
    subscribe_count: Arc<AtomicU32>,
    subscribed_channels: Arc<Mutex<Vec<ChannelSpec>>>,
}

/// Control handle for a [`ChannelStream`].
pub struct ChannelStreamHandle {
    event_tx: tokio::sync::mpsc::Sender<Option<StreamEvent>>,
    connect_count: Arc<AtomicU32>,
    subscribe_count: Arc<AtomicU32>,
    subscribed_channels: Arc<Mutex<Vec<ChannelSpec>>>,
}

impl ChannelStreamHandle {
    /// Send an event to the stream.
    pub async fn send(&self, event: StreamEvent) {
        let _ = self.event_tx.send(Some(event)).await;
    }

    /// Get a cloned sender for sending events without holding a reference.
    pub fn sender(&self) -> tokio::sync::mpsc::Sender<Option<StreamEvent>> {
        self.event_tx.clone()
    }

    /// Signal end-of-stream (causes `next_event` to return `None`).
    pub async fn close(&self) {
        let _ = self.event_tx.send(None).await;
    }

    /// How many times `connect()` was called.
    pub fn connect_count(&self) -> u32 {
        self.connect_count.load(Ordering::SeqCst)
    }

    /// How many times `subscribe()` was called.
    pub fn subscribe_count(&self) -> u32 {
        self.subscribe_count.load(Ordering::SeqCst)
    }

    /// Which channels were last subscribed to.
    pub fn subscribed_channels(&self) -> Vec<ChannelSpec> {
        self.subscribed_channels.lock().unwrap().clone()
    }
}

/// Create a [`ChannelStream`] and its control [`ChannelStreamHandle`].
pub fn channel_stream(buffer: usize) -> (ChannelStream, ChannelStreamHandle) {
    let (tx, rx) = tokio::sync::mpsc::channel(buffer);
    let cc = Arc::new(AtomicU32::new(0));
    let sc = Arc::new(AtomicU32::new(0));
    let subs = Arc::new(Mutex::new(Vec::new()));
    (
        ChannelStream {
            event_rx: rx,
            connect_count: cc.clone(),
            subscribe_count: sc.clone(),
            subscribed_channels: subs.clone(),
        },
        ChannelStreamHandle {
            event_tx: tx,
            connect_count: cc,
            subscribe_count: sc,
            subscribed_channels: subs,
        },
    )
}

#[async_trait]
impl EventStream for ChannelStream {
    async fn connect(&mut self) -> Result<()> {
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn subscribe(&mut self, channels: &[ChannelSpec]) -> Result<()> {
        self.subscribe_count.fetch_add(1, Ordering::SeqCst);
        *self.subscribed_channels.lock().unwrap() = channels.to_vec();
        Ok(())
    }

    async fn next_event(&mut self) -> Option<StreamEvent> {
        match self.event_rx.recv().await {
            Some(Some(event)) => Some(event),
            Some(None) | None => None,
        }
    }

    fn stream_name(&self) -> &'static str {
        "mock"
    }
}

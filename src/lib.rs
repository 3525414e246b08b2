//! Whalewatch - Real-time whale-flow and liquidation-storm detection.
//!
//! This crate ingests a live stream of large trade prints and forced
//! liquidations from a market-event feed, maintains short sliding windows of
//! activity per instrument, and raises alerts when clustered one-sided flow
//! crosses configured thresholds.
//!
//! # Architecture
//!
//! The pipeline is a chain of small, independently testable stages:
//!
//! - **`stream`** - WebSocket feed client with automatic reconnection and
//!   exponential backoff
//! - **`domain::aggregator`** - Sliding-window aggregation of events per
//!   instrument and event class
//! - **`detect`** - Periodic detectors (whale clusters, liquidation storms)
//!   with per-instrument cooldowns
//! - **`notify`** - Alert sinks (Telegram, log) fed by a background worker
//!
//! # Modules
//!
//! - [`config`] - Configuration loading from TOML files with symbol groups
//! - [`domain`] - Feed-agnostic types: market events, windows, detections
//! - [`detect`] - Detector loop and threshold evaluation
//! - [`stream`] - WebSocket client and reconnection wrapper
//! - [`notify`] - Alert sink trait and implementations
//! - [`app`] - Application orchestration wiring the stages together
//! - [`error`] - Error types for the crate
//!
//! # Features
//!
//! - `telegram` - Enable the Telegram alert sink (on by default)
//! - `testkit` - Scripted streams and recording sinks for tests
//!
//! # Example
//!
//! ```no_run
//! use whalewatch::config::Config;
//!
//! # fn main() -> whalewatch::error::Result<()> {
//! let config = Config::load("config.toml")?;
//! println!("watching {} instruments", config.stream.trade_symbols.len());
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod config;
pub mod detect;
pub mod domain;
pub mod error;
pub mod notify;
pub mod stream;

#[cfg(feature = "testkit")]
pub mod testkit;

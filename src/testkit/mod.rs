//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`stream`] - Mock [`EventStream`](crate::stream::EventStream)
//!   implementations: `ScriptedStream`, `ChannelStream`.
//! - [`domain`] - Builders for domain primitives: instruments and events.
//! - [`notify`] - A recording [`AlertSink`](crate::notify::AlertSink).
//! - [`config`] - Canonical test configurations (groups, backoff).

pub mod config;
pub mod domain;
pub mod notify;
pub mod stream;

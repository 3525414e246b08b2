//! A recording [`AlertSink`] for asserting on delivered detections.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::DetectionResult;
use crate::error::{Error, Result};
use crate::notify::AlertSink;

/// Sink that records every delivered detection.
///
/// Can be switched into a failing mode to exercise best-effort dispatch
/// paths: while failing, `deliver` returns an error and records nothing.
#[derive(Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<DetectionResult>>,
    failing: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent deliveries fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Everything delivered so far, in order.
    pub fn delivered(&self) -> Vec<DetectionResult> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn delivered_count(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }
}

#[async_trait]
impl AlertSink for RecordingSink {
    async fn deliver(&self, detection: &DetectionResult) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Delivery("recording sink set to fail".into()));
        }
        self.delivered.lock().unwrap().push(detection.clone());
        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        "recording"
    }
}

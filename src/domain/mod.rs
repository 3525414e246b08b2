//! Feed-agnostic domain logic.

mod detection;
mod event;
mod window;

pub mod aggregator;

// Core domain types
pub use detection::{DetectionResult, DetectorKind};
pub use event::{EventClass, Instrument, RawEvent, Side, SymbolGroup};
pub use window::{WindowState, WindowSummary};

pub use aggregator::EventAggregator;

//! Application layer - pipeline orchestration and shared counters.

mod orchestrator;
pub mod stats;

pub use orchestrator::{run_pipeline, App};
pub use stats::{PipelineStats, StatsSnapshot};

//! The analysis pipeline: perspective catalog, score aggregation, progress
//! reporting, pipeline events, and the orchestrator that drives one session
//! from raw idea to final recommendation.

pub mod catalog;
pub mod events;
pub mod orchestrator;
pub mod progress;
pub mod score;

pub use events::{EventEmitter, PipelineEvent};
pub use orchestrator::{IdeaPipeline, OUTPUT_STAGE_THRESHOLD, VIABILITY_GATE_THRESHOLD};
pub use progress::{Progress, TOTAL_STAGES};
pub use score::aggregate_score;

// file: src/pipeline/mod.rs
// description: pipeline module exports and public api
// reference: pipeline orchestration

pub mod aggregator;
pub mod context;
mod orchestrator;
pub mod progress;
pub mod state;

pub use aggregator::{Aggregator, ExtractedSections, determine_outcome};
pub use context::StepContext;
pub use orchestrator::AnalysisPipeline;
pub use progress::{ProgressRegistry, ProgressReporter, ProgressSink};
pub use state::{
    ErrorLog, ExtractionOutcome, Fault, PipelineState, PipelineStep, StepEvent, transition,
};

// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/readme.md"))]

pub mod collaborators;
pub mod config;
pub mod document;
pub mod error;
pub mod extractor;
pub mod merge;
pub mod models;
pub mod pipeline;
pub mod scheduler;
pub mod utils;

pub use collaborators::{
    ArtifactLocation, ChatCompletionClient, IndexHandle, Indexer, KeywordIndex,
    MarkdownReportRenderer, ReportRenderer, TextChunk, TextModel,
};
pub use config::{Config, IndexConfig, LlmConfig, OutputConfig, PipelineConfig, SchedulerConfig};
pub use document::{DocumentContent, DocumentLoader, DocumentRef};
pub use error::{AnalysisError, Result};
pub use merge::{Merge, merge_results};
pub use models::{AnalysisResult, ExtractedField, TaskId, TaskOptions, TaskStatus, TaskView};
pub use pipeline::{AnalysisPipeline, PipelineState, PipelineStep, ProgressRegistry};
pub use scheduler::TaskScheduler;
pub use utils::{OperationTimer, Validator};

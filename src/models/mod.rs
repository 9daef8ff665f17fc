// file: src/models/mod.rs
// description: data models module exports
// reference: internal module structure

pub mod analysis;
pub mod field;
pub mod task;

pub use analysis::{
    AnalysisResult, BasicInformation, ContractInformation, QualificationCriteria,
    ScoreComposition, ScoringCriteria, ScoringItem, SectionKind,
};
pub use field::{DedupKey, DocumentSource, ExtractedField};
pub use task::{ProgressSnapshot, Task, TaskId, TaskOptions, TaskStatus, TaskView};

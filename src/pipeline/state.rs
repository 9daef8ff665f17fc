// file: src/pipeline/state.rs
// description: pipeline steps, transition table, and the per-run working state
// reference: explicit state machine over tagged step variants

use crate::document::{DocumentContent, DocumentRef};
use crate::collaborators::{ArtifactLocation, IndexHandle};
use crate::error::{AnalysisError, Result};
use crate::models::{AnalysisResult, TaskId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    Start,
    DocumentProcessed,
    ParallelExtraction,
    ParallelExtractionCompleted,
    PartialExtractionCompleted,
    ExtractionFailed,
    AggregationFailed,
    Formatted,
    Completed,
    Error,
    Failed,
}

impl PipelineStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStep::Start => "start",
            PipelineStep::DocumentProcessed => "document_processed",
            PipelineStep::ParallelExtraction => "parallel_extraction",
            PipelineStep::ParallelExtractionCompleted => "parallel_extraction_completed",
            PipelineStep::PartialExtractionCompleted => "partial_extraction_completed",
            PipelineStep::ExtractionFailed => "extraction_failed",
            PipelineStep::AggregationFailed => "aggregation_failed",
            PipelineStep::Formatted => "formatted",
            PipelineStep::Completed => "completed",
            PipelineStep::Error => "error",
            PipelineStep::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStep::Completed | PipelineStep::Failed)
    }

    /// Steps decided by the aggregation barrier. The last one visited is what
    /// a finished task reports as its step.
    pub fn is_milestone(&self) -> bool {
        matches!(
            self,
            PipelineStep::ParallelExtractionCompleted
                | PipelineStep::PartialExtractionCompleted
                | PipelineStep::ExtractionFailed
                | PipelineStep::AggregationFailed
        )
    }

    /// Percentage shown for the step outside the parallel phase.
    pub fn baseline_progress(&self) -> u8 {
        match self {
            PipelineStep::Start => 0,
            PipelineStep::DocumentProcessed => 20,
            PipelineStep::ParallelExtraction => 20,
            PipelineStep::ParallelExtractionCompleted => 85,
            PipelineStep::PartialExtractionCompleted => 85,
            PipelineStep::ExtractionFailed => 85,
            PipelineStep::AggregationFailed => 85,
            PipelineStep::Formatted => 95,
            PipelineStep::Error => 90,
            PipelineStep::Completed => 100,
            PipelineStep::Failed => 0,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PipelineStep::Start => "waiting to start",
            PipelineStep::DocumentProcessed => "document indexed",
            PipelineStep::ParallelExtraction => "extracting",
            PipelineStep::ParallelExtractionCompleted => "all sections extracted",
            PipelineStep::PartialExtractionCompleted => "some sections extracted",
            PipelineStep::ExtractionFailed => "no section could be extracted",
            PipelineStep::AggregationFailed => "aggregation failed",
            PipelineStep::Formatted => "report rendered",
            PipelineStep::Error => "recovering partial results",
            PipelineStep::Completed => "analysis complete",
            PipelineStep::Failed => "analysis failed",
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionOutcome {
    Complete,
    Partial,
    Empty,
}

impl ExtractionOutcome {
    pub fn step(&self) -> PipelineStep {
        match self {
            ExtractionOutcome::Complete => PipelineStep::ParallelExtractionCompleted,
            ExtractionOutcome::Partial => PipelineStep::PartialExtractionCompleted,
            ExtractionOutcome::Empty => PipelineStep::ExtractionFailed,
        }
    }
}

/// What sent the run to the error handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fault {
    Preprocessing,
    NothingExtracted,
    Aggregation,
    Formatting,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepEvent {
    Preprocessed,
    FannedOut,
    Aggregated(ExtractionOutcome),
    AggregationFaulted,
    Rendered,
    RenderSkipped,
    Finished,
    Faulted(Fault),
    Recovered,
    Abandoned,
}

/// The transition table. Any pair not listed is rejected.
pub fn transition(from: PipelineStep, event: StepEvent) -> Result<PipelineStep> {
    use PipelineStep as S;
    use StepEvent as E;

    let next = match (from, event) {
        (S::Start, E::Preprocessed) => S::DocumentProcessed,
        (S::DocumentProcessed, E::FannedOut) => S::ParallelExtraction,
        (S::ParallelExtraction, E::Aggregated(outcome)) => outcome.step(),
        (S::ParallelExtraction, E::AggregationFaulted) => S::AggregationFailed,
        (S::ParallelExtractionCompleted | S::PartialExtractionCompleted, E::Rendered) => {
            S::Formatted
        }
        (S::ParallelExtractionCompleted | S::PartialExtractionCompleted, E::RenderSkipped) => {
            S::Completed
        }
        (S::Formatted, E::Finished) => S::Completed,
        (S::Error, E::Recovered) => S::Completed,
        (S::Error, E::Abandoned) => S::Failed,
        (S::Error | S::Completed | S::Failed, E::Faulted(_)) => {
            return Err(AnalysisError::AggregationFailure(format!(
                "fault raised in {} step",
                from
            )));
        }
        (_, E::Faulted(_)) => S::Error,
        (from, event) => {
            return Err(AnalysisError::AggregationFailure(format!(
                "illegal transition from {} on {:?}",
                from, event
            )));
        }
    };

    Ok(next)
}

/// Append-only error list shared by concurrently running steps.
#[derive(Debug, Clone, Default)]
pub struct ErrorLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, message: impl Into<String>) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.push(message.into());
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

/// Working envelope for one task run, passed by value from step to step.
#[derive(Debug)]
pub struct PipelineState {
    pub task_id: TaskId,
    pub document: DocumentRef,
    pub content: Option<DocumentContent>,
    pub index: Option<IndexHandle>,
    pub result: AnalysisResult,
    pub current_step: PipelineStep,
    pub history: Vec<PipelineStep>,
    pub errors: ErrorLog,
    pub retry_count: u32,
    pub outcome: Option<ExtractionOutcome>,
    pub fault: Option<Fault>,
    pub artifact: Option<ArtifactLocation>,
}

impl PipelineState {
    pub fn new(task_id: TaskId, document: DocumentRef) -> Self {
        let result = AnalysisResult::new(document.name());
        Self {
            task_id,
            document,
            content: None,
            index: None,
            result,
            current_step: PipelineStep::Start,
            history: vec![PipelineStep::Start],
            errors: ErrorLog::new(),
            retry_count: 0,
            outcome: None,
            fault: None,
            artifact: None,
        }
    }

    pub fn advance(&mut self, event: StepEvent) -> Result<PipelineStep> {
        let next = transition(self.current_step, event)?;
        if let StepEvent::Faulted(fault) = event {
            self.fault = Some(fault);
        }
        if let StepEvent::Aggregated(outcome) = event {
            self.outcome = Some(outcome);
        }
        self.current_step = next;
        self.history.push(next);
        Ok(next)
    }

    /// Records an error and sends the run to the error handler.
    pub fn fail(&mut self, fault: Fault, error: &AnalysisError) {
        self.errors.push(error.to_string());
        if let Err(e) = self.advance(StepEvent::Faulted(fault)) {
            self.errors.push(e.to_string());
            self.current_step = PipelineStep::Failed;
            self.history.push(PipelineStep::Failed);
        }
    }

    /// The step a finished task reports: the aggregation milestone when one
    /// was reached, otherwise wherever the run stopped.
    pub fn final_step(&self) -> PipelineStep {
        self.history
            .iter()
            .rev()
            .find(|step| step.is_milestone())
            .copied()
            .unwrap_or(self.current_step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn state() -> PipelineState {
        PipelineState::new(
            TaskId::new(),
            DocumentRef::new(PathBuf::from("/tmp/tender.txt")),
        )
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut state = state();
        state.advance(StepEvent::Preprocessed).unwrap();
        state.advance(StepEvent::FannedOut).unwrap();
        state
            .advance(StepEvent::Aggregated(ExtractionOutcome::Complete))
            .unwrap();
        state.advance(StepEvent::Rendered).unwrap();
        state.advance(StepEvent::Finished).unwrap();

        assert_eq!(state.current_step, PipelineStep::Completed);
        assert_eq!(state.final_step(), PipelineStep::ParallelExtractionCompleted);
    }

    #[test]
    fn test_illegal_transition_is_rejected() {
        assert!(transition(PipelineStep::Start, StepEvent::Rendered).is_err());
        assert!(transition(PipelineStep::ExtractionFailed, StepEvent::Rendered).is_err());
        assert!(transition(PipelineStep::Completed, StepEvent::Faulted(Fault::Formatting)).is_err());
    }

    #[test]
    fn test_fault_routes_to_error_from_any_live_step() {
        for step in [
            PipelineStep::Start,
            PipelineStep::DocumentProcessed,
            PipelineStep::ParallelExtraction,
            PipelineStep::ExtractionFailed,
            PipelineStep::AggregationFailed,
            PipelineStep::PartialExtractionCompleted,
            PipelineStep::Formatted,
        ] {
            assert_eq!(
                transition(step, StepEvent::Faulted(Fault::Aggregation)).unwrap(),
                PipelineStep::Error
            );
        }
    }

    #[test]
    fn test_final_step_without_milestone() {
        let mut state = state();
        state.fail(Fault::Preprocessing, &AnalysisError::Indexing("boom".into()));
        state.advance(StepEvent::Abandoned).unwrap();

        assert_eq!(state.final_step(), PipelineStep::Failed);
        assert_eq!(state.errors.len(), 1);
        assert_eq!(state.fault, Some(Fault::Preprocessing));
    }

    #[tokio::test]
    async fn test_error_log_concurrent_appends() {
        let log = ErrorLog::new();
        let mut handles = Vec::new();
        for i in 0..16 {
            let log = log.clone();
            handles.push(tokio::spawn(async move {
                log.push(format!("error {}", i));
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(log.len(), 16);
    }
}

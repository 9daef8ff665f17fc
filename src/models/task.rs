// file: src/models/task.rs
// description: task records, status values, and the public task view
// reference: internal data structures

use crate::collaborators::ArtifactLocation;
use crate::document::DocumentRef;
use crate::models::AnalysisResult;
use crate::pipeline::{PipelineState, PipelineStep};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOptions {
    /// Name shown in the report instead of the file name.
    pub display_name: Option<String>,
    pub render_report: bool,
}

impl Default for TaskOptions {
    fn default() -> Self {
        Self {
            display_name: None,
            render_report: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub step: PipelineStep,
    pub percent: u8,
    pub description: String,
    pub agent_progress: Option<BTreeMap<String, u8>>,
}

impl ProgressSnapshot {
    pub fn for_step(step: PipelineStep) -> Self {
        Self {
            step,
            percent: step.baseline_progress(),
            description: step.description().to_string(),
            agent_progress: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub document: DocumentRef,
    pub options: TaskOptions,
    pub status: TaskStatus,
    pub step: PipelineStep,
    pub progress: ProgressSnapshot,
    pub result: Option<AnalysisResult>,
    pub errors: Vec<String>,
    pub artifact: Option<ArtifactLocation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(document: DocumentRef, options: TaskOptions) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::new(),
            document,
            options,
            status: TaskStatus::Pending,
            step: PipelineStep::Start,
            progress: ProgressSnapshot::for_step(PipelineStep::Start),
            result: None,
            errors: Vec::new(),
            artifact: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn started(&self) -> Self {
        Self {
            status: TaskStatus::Processing,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }

    pub fn with_progress(&self, progress: ProgressSnapshot) -> Self {
        Self {
            step: progress.step,
            progress,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }

    /// Terminal record built from a finished run.
    pub fn finished(&self, state: PipelineState) -> Self {
        let status = match state.current_step {
            PipelineStep::Completed => TaskStatus::Completed,
            _ => TaskStatus::Failed,
        };
        let step = state.final_step();
        let progress = ProgressSnapshot {
            step,
            percent: state.current_step.baseline_progress(),
            description: state.current_step.description().to_string(),
            agent_progress: None,
        };
        let result = if status == TaskStatus::Completed || state.result.has_content() {
            Some(state.result)
        } else {
            None
        };

        Self {
            status,
            step,
            progress,
            result,
            errors: state.errors.snapshot(),
            artifact: state.artifact,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }

    /// Terminal record for a run that never started.
    pub fn aborted(&self, reason: impl Into<String>) -> Self {
        let mut errors = self.errors.clone();
        errors.push(reason.into());
        Self {
            status: TaskStatus::Failed,
            step: PipelineStep::Failed,
            progress: ProgressSnapshot::for_step(PipelineStep::Failed),
            errors,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }

    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        (now - self.created_at).num_milliseconds() as f64 / 3_600_000.0
    }

    pub fn view(&self) -> TaskView {
        TaskView {
            task_id: self.id,
            document: self.document.path().display().to_string(),
            status: self.status,
            step: self.step.as_str().to_string(),
            progress_percent: self.progress.percent,
            progress_description: self.progress.description.clone(),
            agent_progress: self.progress.agent_progress.clone(),
            result: self.result.clone(),
            errors: self.errors.clone(),
            artifact_location: self.artifact.as_ref().map(|a| a.to_string()),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Read-only projection returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskView {
    pub task_id: TaskId,
    pub document: String,
    pub status: TaskStatus,
    pub step: String,
    pub progress_percent: u8,
    pub progress_description: String,
    pub agent_progress: Option<BTreeMap<String, u8>>,
    pub result: Option<AnalysisResult>,
    pub errors: Vec<String>,
    pub artifact_location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{ExtractionOutcome, StepEvent};
    use std::path::PathBuf;

    fn task() -> Task {
        Task::new(
            DocumentRef::new(PathBuf::from("/tmp/tender.txt")),
            TaskOptions::default(),
        )
    }

    #[test]
    fn test_new_task_is_pending() {
        let task = task();
        let view = task.view();
        assert_eq!(view.status, TaskStatus::Pending);
        assert_eq!(view.step, "start");
        assert_eq!(view.progress_percent, 0);
        assert!(view.result.is_none());
    }

    #[test]
    fn test_finished_partial_run() {
        let task = task().started();
        let mut state = PipelineState::new(task.id, task.document.clone());
        state.advance(StepEvent::Preprocessed).unwrap();
        state.advance(StepEvent::FannedOut).unwrap();
        state
            .advance(StepEvent::Aggregated(ExtractionOutcome::Partial))
            .unwrap();
        state.advance(StepEvent::RenderSkipped).unwrap();
        state.errors.push("scoring failed");

        let done = task.finished(state);
        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.step, PipelineStep::PartialExtractionCompleted);
        assert_eq!(done.progress.percent, 100);
        assert_eq!(done.errors.len(), 1);
        assert!(done.result.is_some());
    }

    #[test]
    fn test_aborted_task_keeps_reason() {
        let done = task().aborted("scheduler shut down");
        assert_eq!(done.status, TaskStatus::Failed);
        assert_eq!(done.errors, vec!["scheduler shut down".to_string()]);
    }

    #[test]
    fn test_task_id_roundtrip() {
        let id = TaskId::new();
        let parsed: TaskId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }
}

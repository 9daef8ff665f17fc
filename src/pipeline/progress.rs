// file: src/pipeline/progress.rs
// description: per-run progress registry for the parallel extraction agents
// reference: lock-guarded percent map with derived aggregate and description

use crate::models::ProgressSnapshot;
use crate::pipeline::state::PipelineStep;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Tracks percent-complete per extraction agent for a single pipeline run.
///
/// Cloning shares the same underlying map. A fresh registry is created for
/// every run, so progress from one task never leaks into another.
#[derive(Debug, Clone, Default)]
pub struct ProgressRegistry {
    agents: Arc<Mutex<BTreeMap<String, u8>>>,
}

impl ProgressRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_agents<I, S>(agents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let registry = Self::new();
        {
            let mut map = registry.lock();
            for agent in agents {
                map.insert(agent.into(), 0);
            }
        }
        registry
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, u8>> {
        self.agents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_progress(&self, agent: &str, percent: i64) {
        let clamped = percent.clamp(0, 100) as u8;
        self.lock().insert(agent.to_string(), clamped);
        debug!("Agent {} progress: {}%", agent, clamped);
    }

    pub fn overall_progress(&self) -> u8 {
        let agents = self.lock();
        if agents.is_empty() {
            return 0;
        }
        let total: u64 = agents.values().map(|&p| u64::from(p)).sum();
        (total / agents.len() as u64).min(100) as u8
    }

    pub fn describe(&self) -> String {
        let agents = self.lock();
        let total = agents.len();
        let complete = agents.values().filter(|&&p| p >= 100).count();
        let started = agents.values().any(|&p| p > 0);

        if total == 0 || !started {
            "not started".to_string()
        } else if complete == total {
            "aggregating".to_string()
        } else if complete > 0 {
            format!("{}/{} complete", complete, total)
        } else {
            "extracting".to_string()
        }
    }

    pub fn snapshot(&self) -> BTreeMap<String, u8> {
        self.lock().clone()
    }

    /// Builds the task-level snapshot for `step`. During the parallel phase
    /// the agents' mean is scaled into the 20..80 band between indexing and
    /// aggregation.
    pub fn task_snapshot(&self, step: PipelineStep) -> ProgressSnapshot {
        match step {
            PipelineStep::ParallelExtraction => {
                let overall = u32::from(self.overall_progress());
                let percent = 20 + (overall * 60 / 100) as u8;
                ProgressSnapshot {
                    step,
                    percent,
                    description: self.describe(),
                    agent_progress: Some(self.snapshot()),
                }
            }
            PipelineStep::ParallelExtractionCompleted
            | PipelineStep::PartialExtractionCompleted
            | PipelineStep::ExtractionFailed => ProgressSnapshot {
                step,
                percent: step.baseline_progress(),
                description: step.description().to_string(),
                agent_progress: Some(self.snapshot()),
            },
            _ => ProgressSnapshot::for_step(step),
        }
    }
}

/// Receives every snapshot a run publishes.
pub type ProgressSink = Arc<dyn Fn(ProgressSnapshot) + Send + Sync>;

/// Registry plus the sink that mirrors it onto the task record.
#[derive(Clone)]
pub struct ProgressReporter {
    registry: ProgressRegistry,
    sink: ProgressSink,
}

impl ProgressReporter {
    pub fn new(registry: ProgressRegistry, sink: ProgressSink) -> Self {
        Self { registry, sink }
    }

    pub fn detached() -> Self {
        Self::new(ProgressRegistry::new(), Arc::new(|_| {}))
    }

    pub fn registry(&self) -> &ProgressRegistry {
        &self.registry
    }

    pub fn checkpoint(&self, agent: &str, percent: i64) {
        self.registry.set_progress(agent, percent);
        (self.sink)(self.registry.task_snapshot(PipelineStep::ParallelExtraction));
    }

    pub fn step(&self, step: PipelineStep) {
        (self.sink)(self.registry.task_snapshot(step));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overall_progress_is_floored_mean() {
        let registry = ProgressRegistry::new();
        registry.set_progress("a", 100);
        registry.set_progress("b", 50);
        registry.set_progress("c", 0);
        assert_eq!(registry.overall_progress(), 50);

        registry.set_progress("c", 1);
        assert_eq!(registry.overall_progress(), 50);
    }

    #[test]
    fn test_set_progress_clamps() {
        let registry = ProgressRegistry::new();
        registry.set_progress("a", 250);
        registry.set_progress("b", -20);
        let snapshot = registry.snapshot();
        assert_eq!(snapshot["a"], 100);
        assert_eq!(snapshot["b"], 0);
    }

    #[test]
    fn test_describe_phases() {
        let registry = ProgressRegistry::with_agents(["a", "b", "c"]);
        assert_eq!(registry.describe(), "not started");

        registry.set_progress("a", 10);
        assert_eq!(registry.describe(), "extracting");

        registry.set_progress("a", 100);
        assert_eq!(registry.describe(), "1/3 complete");

        registry.set_progress("b", 100);
        registry.set_progress("c", 100);
        assert_eq!(registry.describe(), "aggregating");
        assert_eq!(registry.overall_progress(), 100);
    }

    #[test]
    fn test_empty_registry() {
        let registry = ProgressRegistry::new();
        assert_eq!(registry.overall_progress(), 0);
        assert_eq!(registry.describe(), "not started");
    }

    #[test]
    fn test_parallel_snapshot_scaling() {
        let registry = ProgressRegistry::with_agents(["a", "b"]);
        registry.set_progress("a", 100);
        registry.set_progress("b", 100);
        let snapshot = registry.task_snapshot(PipelineStep::ParallelExtraction);
        assert_eq!(snapshot.percent, 80);
        assert_eq!(snapshot.description, "aggregating");
        assert!(snapshot.agent_progress.is_some());
    }

    #[test]
    fn test_reporter_publishes_to_sink() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let reporter = ProgressReporter::new(
            ProgressRegistry::with_agents(["a"]),
            Arc::new(move |snapshot| sink_seen.lock().unwrap().push(snapshot.percent)),
        );

        reporter.checkpoint("a", 50);
        reporter.step(PipelineStep::Formatted);

        assert_eq!(*seen.lock().unwrap(), vec![50, 95]);
    }
}

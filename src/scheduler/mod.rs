// file: src/scheduler/mod.rs
// description: task lifecycle management on a bounded pool of pipeline workers
// reference: semaphore-bounded tokio tasks with cancellation tokens

//! Submitting documents and tracking their analysis.
//!
//! [`TaskScheduler::submit`] records a `pending` task and returns at once.
//! The run itself waits for one of `max_workers` permits, then drives an
//! [`AnalysisPipeline`] to completion. Every change to a task, including
//! progress updates from inside the run, replaces the whole record in the
//! [`TaskStore`].

pub mod store;

pub use store::TaskStore;

use crate::config::Config;
use crate::error::{AnalysisError, Result};
use crate::models::{ProgressSnapshot, Task, TaskId, TaskOptions, TaskStatus, TaskView};
use crate::pipeline::{AnalysisPipeline, ProgressSink};
use chrono::Utc;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

struct Inner {
    pipeline: Arc<AnalysisPipeline>,
    store: TaskStore,
    workers: Arc<Semaphore>,
    cancels: Mutex<HashMap<TaskId, CancellationToken>>,
    shutdown: CancellationToken,
    max_workers: usize,
}

impl Inner {
    fn forget_cancel(&self, id: &TaskId) {
        self.cancels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(id);
    }
}

#[derive(Clone)]
pub struct TaskScheduler {
    inner: Arc<Inner>,
}

impl TaskScheduler {
    pub fn new(pipeline: AnalysisPipeline, max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            inner: Arc::new(Inner {
                pipeline: Arc::new(pipeline),
                store: TaskStore::new(),
                workers: Arc::new(Semaphore::new(max_workers)),
                cancels: Mutex::new(HashMap::new()),
                shutdown: CancellationToken::new(),
                max_workers,
            }),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let pipeline = AnalysisPipeline::from_config(config)?;
        Ok(Self::new(pipeline, config.scheduler.max_workers))
    }

    pub fn max_workers(&self) -> usize {
        self.inner.max_workers
    }

    /// Validates the document and queues it for analysis.
    pub async fn submit(&self, path: &Path, options: TaskOptions) -> Result<TaskId> {
        if self.inner.shutdown.is_cancelled() {
            return Err(AnalysisError::Validation(
                "scheduler is shutting down".to_string(),
            ));
        }

        let document = self.inner.pipeline.loader().resolve(path).await?;
        let task = self.inner.store.insert(Task::new(document, options));
        let id = task.id;

        let cancel = self.inner.shutdown.child_token();
        self.inner
            .cancels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id, cancel.clone());

        info!("Submitted task {} for {}", id, task.document.name());
        tokio::spawn(execute(Arc::clone(&self.inner), id, cancel));

        Ok(id)
    }

    pub fn status(&self, id: &TaskId) -> Result<TaskView> {
        self.inner
            .store
            .get(id)
            .map(|task| task.view())
            .ok_or_else(|| AnalysisError::NotFound(format!("task {}", id)))
    }

    /// Evicts terminal tasks created at least `max_age_hours` ago.
    pub fn cleanup(&self, max_age_hours: u64) -> usize {
        let removed = self
            .inner
            .store
            .evict_terminal(max_age_hours as f64, Utc::now());
        if removed > 0 {
            info!("Cleaned up {} finished task(s)", removed);
        }
        removed
    }

    pub fn cancel(&self, id: &TaskId) -> Result<()> {
        let task = self
            .inner
            .store
            .get(id)
            .ok_or_else(|| AnalysisError::NotFound(format!("task {}", id)))?;

        if task.status.is_terminal() {
            debug!("Task {} already finished; nothing to cancel", id);
            return Ok(());
        }

        let token = self
            .inner
            .cancels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(id)
            .cloned();
        if let Some(token) = token {
            info!("Cancelling task {}", id);
            token.cancel();
        }
        Ok(())
    }

    /// Resolves once the task is terminal, or fails with `Timeout`.
    pub async fn wait(&self, id: &TaskId, timeout: Duration) -> Result<TaskView> {
        let deadline = Instant::now() + timeout;

        loop {
            let notified = self.inner.store.changed().notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let view = self.status(id)?;
            if view.status.is_terminal() {
                return Ok(view);
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Err(AnalysisError::Timeout {
                    operation: format!("waiting for task {}", id),
                    after: timeout,
                });
            }
        }
    }

    pub fn list(&self) -> Vec<TaskView> {
        self.inner.store.list().iter().map(|task| task.view()).collect()
    }

    /// Runs `cleanup` every `interval` until the scheduler shuts down.
    pub fn spawn_janitor(&self, interval: Duration, max_age_hours: u64) -> JoinHandle<()> {
        let scheduler = self.clone();
        let shutdown = self.inner.shutdown.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        debug!("Task janitor stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        scheduler.cleanup(max_age_hours);
                    }
                }
            }
        })
    }

    /// Cancels every queued and running task and stops the janitor.
    pub fn shutdown(&self) {
        info!("Shutting down task scheduler");
        self.inner.shutdown.cancel();
    }
}

async fn execute(inner: Arc<Inner>, id: TaskId, cancel: CancellationToken) {
    let permit = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        permit = Arc::clone(&inner.workers).acquire_owned() => permit.ok(),
    };

    let Some(_permit) = permit else {
        inner.store.update(&id, |task| task.aborted("Task cancelled"));
        inner.forget_cancel(&id);
        warn!("Task {} cancelled before it started", id);
        return;
    };

    let Some(task) = inner.store.update(&id, Task::started) else {
        inner.forget_cancel(&id);
        return;
    };
    info!("Task {} started", id);

    let sink_inner = Arc::clone(&inner);
    let sink: ProgressSink = Arc::new(move |snapshot: ProgressSnapshot| {
        sink_inner.store.update(&id, |task| {
            if task.status == TaskStatus::Processing {
                task.with_progress(snapshot)
            } else {
                task.clone()
            }
        });
    });

    let pipeline = Arc::clone(&inner.pipeline);
    let document = task.document.clone();
    let options = task.options.clone();
    let run = tokio::spawn(async move {
        pipeline.run(id, document, &options, cancel, sink).await
    })
    .await;

    let finished = match run {
        Ok(state) => inner.store.update(&id, |task| task.finished(state)),
        Err(join_error) => {
            error!("Pipeline for task {} crashed: {}", id, join_error);
            inner
                .store
                .update(&id, |task| task.aborted(format!("pipeline crashed: {}", join_error)))
        }
    };
    inner.forget_cancel(&id);

    if let Some(task) = finished {
        match task.status {
            TaskStatus::Completed => info!(
                "Task {} completed at step {} with {} error(s)",
                id,
                task.step,
                task.errors.len()
            ),
            _ => warn!("Task {} failed at step {}: {:?}", id, task.step, task.errors),
        }
    }
}

// file: src/scheduler/store.rs
// description: in-memory task table with whole-record replacement
// reference: lock-guarded map of shared immutable records

use crate::models::{Task, TaskId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::Notify;

/// Records are never mutated in place: every change swaps in a new
/// `Arc<Task>`, so readers always see a consistent snapshot.
#[derive(Default)]
pub struct TaskStore {
    tasks: RwLock<HashMap<TaskId, Arc<Task>>>,
    changed: Notify,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<TaskId, Arc<Task>>> {
        self.tasks
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<TaskId, Arc<Task>>> {
        self.tasks
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert(&self, task: Task) -> Arc<Task> {
        let task = Arc::new(task);
        self.write().insert(task.id, Arc::clone(&task));
        task
    }

    pub fn get(&self, id: &TaskId) -> Option<Arc<Task>> {
        self.read().get(id).cloned()
    }

    /// Replaces the record for `id` with `f(current)`. Returns the new
    /// record, or `None` if the task is unknown.
    pub fn update<F>(&self, id: &TaskId, f: F) -> Option<Arc<Task>>
    where
        F: FnOnce(&Task) -> Task,
    {
        let updated = {
            let mut tasks = self.write();
            let current = tasks.get(id)?;
            let next = Arc::new(f(current));
            tasks.insert(*id, Arc::clone(&next));
            next
        };
        self.changed.notify_waiters();
        Some(updated)
    }

    /// Removes terminal tasks created at least `max_age_hours` before `now`.
    pub fn evict_terminal(&self, max_age_hours: f64, now: DateTime<Utc>) -> usize {
        let mut tasks = self.write();
        let before = tasks.len();
        tasks.retain(|_, task| !(task.status.is_terminal() && task.age_hours(now) >= max_age_hours));
        before - tasks.len()
    }

    /// All tasks, newest first.
    pub fn list(&self) -> Vec<Arc<Task>> {
        let mut tasks: Vec<Arc<Task>> = self.read().values().cloned().collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tasks
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn changed(&self) -> &Notify {
        &self.changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentRef;
    use crate::models::{TaskOptions, TaskStatus};
    use chrono::Duration;
    use std::path::PathBuf;

    fn task() -> Task {
        Task::new(
            DocumentRef::new(PathBuf::from("/tmp/tender.txt")),
            TaskOptions::default(),
        )
    }

    #[test]
    fn test_update_replaces_record() {
        let store = TaskStore::new();
        let record = store.insert(task());

        let updated = store.update(&record.id, Task::started).unwrap();
        assert_eq!(updated.status, TaskStatus::Processing);
        assert_eq!(record.status, TaskStatus::Pending);
        assert_eq!(store.get(&record.id).unwrap().status, TaskStatus::Processing);
    }

    #[test]
    fn test_update_wakes_waiters() {
        let store = TaskStore::new();
        let task = store.insert(task());

        let mut waiter = tokio_test::task::spawn(store.changed().notified());
        tokio_test::assert_pending!(waiter.poll());

        store.update(&task.id, Task::started);
        assert!(waiter.is_woken());
        tokio_test::assert_ready!(waiter.poll());
    }

    #[test]
    fn test_update_unknown_task() {
        let store = TaskStore::new();
        assert!(store.update(&TaskId::new(), Task::started).is_none());
    }

    #[test]
    fn test_evict_only_old_terminal_tasks() {
        let store = TaskStore::new();
        let done = store.insert(task().aborted("boom"));
        let running = store.insert(task().started());
        let pending = store.insert(task());

        let now = Utc::now() + Duration::hours(2);
        assert_eq!(store.evict_terminal(3.0, now), 0);
        assert_eq!(store.evict_terminal(1.0, now), 1);

        assert!(store.get(&done.id).is_none());
        assert!(store.get(&running.id).is_some());
        assert!(store.get(&pending.id).is_some());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_list_newest_first() {
        let store = TaskStore::new();
        let mut older = task();
        older.created_at = Utc::now() - Duration::minutes(5);
        let older = store.insert(older);
        let newer = store.insert(task());

        let ids: Vec<TaskId> = store.list().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }
}

//! Prioritized wrap-up work collected during a call.
//!
//! Entries run strictly one after another, lowest priority value first and
//! in insertion order among equals. Run-once action entries are deduplicated
//! by signature, keeping the earliest slot. Running the queue again skips
//! entries that were already attempted.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{ActionResult, TaskFailure, TaskQueueError};
use crate::handle::ActionHandle;

/// A deferred callable.
pub type DeferredFn = Arc<dyn Fn() -> BoxFuture<'static, ActionResult<Value>> + Send + Sync>;

/// What a queue entry does.
#[derive(Clone)]
pub enum Task {
    /// Run an action. With `run_only_once`, later entries with the same
    /// signature are dropped.
    Action {
        action: Arc<ActionHandle>,
        run_only_once: bool,
    },
    /// Call a closure.
    Deferred(DeferredFn),
}

impl Task {
    fn describe(&self) -> String {
        match self {
            Self::Action { action, .. } => action.label(),
            Self::Deferred(_) => "deferred".to_string(),
        }
    }

    async fn execute(&self) -> ActionResult<Value> {
        match self {
            Self::Action { action, .. } => action.run(true).await,
            Self::Deferred(callable) => callable().await,
        }
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Action {
                action,
                run_only_once,
            } => f
                .debug_struct("Action")
                .field("action", &action.label())
                .field("run_only_once", run_only_once)
                .finish(),
            Self::Deferred(_) => f.write_str("Deferred"),
        }
    }
}

/// A queued entry.
#[derive(Debug, Clone)]
pub struct QueuedTask {
    /// Insertion sequence number, unique within the queue.
    pub seq: u64,
    pub priority: i32,
    pub task: Task,
}

#[derive(Default)]
struct QueueState {
    entries: Vec<QueuedTask>,
    executed: HashSet<u64>,
    next_seq: u64,
}

/// Shared task queue. Clones refer to the same queue.
#[derive(Clone, Default)]
pub struct TaskQueue {
    state: Arc<Mutex<QueueState>>,
}

impl TaskQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, task: Task, priority: i32) {
        let mut state = self.state.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.entries.push(QueuedTask {
            seq,
            priority,
            task,
        });
    }

    /// Queue an action run.
    pub fn add_action(
        &self,
        action: impl Into<Arc<ActionHandle>>,
        run_only_once: bool,
        priority: i32,
    ) {
        let action = action.into();
        tracing::trace!(action = %action.label(), run_only_once, priority, "queued action");
        self.push(
            Task::Action {
                action,
                run_only_once,
            },
            priority,
        );
    }

    /// Queue a closure.
    pub fn add_deferred<F, Fut>(&self, callable: F, priority: i32)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult<Value>> + Send + 'static,
    {
        let callable: DeferredFn = Arc::new(move || callable().boxed());
        self.push(Task::Deferred(callable), priority);
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entries already attempted.
    pub fn executed(&self) -> usize {
        self.state.lock().executed.len()
    }

    /// Drop every entry and forget what ran.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.executed.clear();
    }

    /// Entries in execution order with run-once duplicates removed.
    ///
    /// Signatures of run-once entries are computed concurrently on every
    /// call. An entry whose signature cannot be computed is kept.
    pub async fn contents(&self) -> Vec<QueuedTask> {
        let mut entries = self.state.lock().entries.clone();
        entries.sort_by_key(|entry| entry.priority);

        let signatures = join_all(entries.iter().map(|entry| async move {
            match &entry.task {
                Task::Action {
                    action,
                    run_only_once: true,
                } => action.id().await.ok(),
                _ => None,
            }
        }))
        .await;

        let mut seen = HashSet::new();
        entries
            .into_iter()
            .zip(signatures)
            .filter_map(|(entry, signature)| match signature {
                Some(signature) if seen.contains(&signature) => {
                    tracing::trace!(task = %entry.task.describe(), seq = entry.seq, "dropping duplicate run-once task");
                    None
                }
                Some(signature) => {
                    seen.insert(signature);
                    Some(entry)
                }
                None => Some(entry),
            })
            .collect()
    }

    /// Run every entry not yet attempted.
    ///
    /// Failures do not stop the queue; they are collected and returned
    /// together once every entry has been attempted.
    pub async fn run(&self) -> Result<(), TaskQueueError> {
        let mut failures = Vec::new();

        for entry in self.contents().await {
            let fresh = self.state.lock().executed.insert(entry.seq);
            if !fresh {
                continue;
            }

            if let Err(error) = entry.task.execute().await {
                let task = entry.task.describe();
                tracing::warn!(task = %task, priority = entry.priority, error = %error, "task failed");
                failures.push(TaskFailure {
                    task,
                    priority: entry.priority,
                    error,
                });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(TaskQueueError::Aggregate { failures })
        }
    }
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TaskQueue")
            .field("entries", &state.entries.len())
            .field("executed", &state.executed.len())
            .finish()
    }
}

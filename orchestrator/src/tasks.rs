//! Supervised detached task execution
//!
//! Detached tasks run on the tokio runtime. Each gets a cancellation token
//! and a snapshot slot that holds its eventual result, so callers can poll
//! for completion or cancel it.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use scholar_agent::{ExecutionResult, JsonMap, ProviderType};

use crate::error::panic_message;

/// Lifecycle of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed | TaskState::Cancelled)
    }
}

/// Point-in-time view of a detached task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub task_id: String,
    pub provider_type: ProviderType,
    pub task_type: String,
    pub status: TaskState,
    #[serde(default)]
    pub result: Option<JsonMap>,
    #[serde(default)]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

struct TaskEntry {
    snapshot: TaskSnapshot,
    cancel: CancellationToken,
}

type TaskTable = Arc<RwLock<HashMap<String, TaskEntry>>>;

/// How long a finished task stays retrievable
pub const DEFAULT_TASK_RETENTION: Duration = Duration::from_secs(3600);

/// Tracks detached tasks and their outcomes
#[derive(Clone)]
pub struct TaskSupervisor {
    tasks: TaskTable,
    retention: Duration,
}

impl Default for TaskSupervisor {
    fn default() -> Self {
        Self {
            tasks: TaskTable::default(),
            retention: DEFAULT_TASK_RETENTION,
        }
    }
}

impl TaskSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Spawn a detached task under `task_id`.
    ///
    /// Finished tasks older than the retention window are dropped first.
    pub fn spawn<F>(&self, task_id: &str, provider_type: ProviderType, task_type: &str, work: F)
    where
        F: Future<Output = ExecutionResult> + Send + 'static,
    {
        self.prune_expired();

        let cancel = CancellationToken::new();
        let snapshot = TaskSnapshot {
            task_id: task_id.to_string(),
            provider_type,
            task_type: task_type.to_string(),
            status: TaskState::Pending,
            result: None,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        };
        write(&self.tasks).insert(
            task_id.to_string(),
            TaskEntry {
                snapshot,
                cancel: cancel.clone(),
            },
        );

        let tasks = self.tasks.clone();
        let task_id = task_id.to_string();
        tokio::spawn(async move {
            transition(&tasks, &task_id, |s| {
                if s.status == TaskState::Pending {
                    s.status = TaskState::Running;
                }
            });

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("Async task {} cancelled", task_id);
                }
                outcome = AssertUnwindSafe(work).catch_unwind() => {
                    let (status, result, error) = match outcome {
                        Ok(result) if result.is_completed() => (TaskState::Completed, Some(result.output), None),
                        Ok(result) => (TaskState::Failed, Some(result.output), result.error),
                        Err(payload) => (TaskState::Failed, None, Some(panic_message(payload.as_ref()))),
                    };
                    tracing::info!("Async task {} finished with status: {:?}", task_id, status);
                    transition(&tasks, &task_id, |s| {
                        if !s.status.is_terminal() {
                            s.status = status;
                            s.result = result;
                            s.error = error;
                            s.completed_at = Some(Utc::now());
                        }
                    });
                }
            }
        });
    }

    /// Current snapshot of a task
    pub fn status(&self, task_id: &str) -> Option<TaskSnapshot> {
        read(&self.tasks).get(task_id).map(|entry| entry.snapshot.clone())
    }

    /// Cancel a task that has not finished. Returns false for unknown or finished tasks.
    pub fn cancel(&self, task_id: &str) -> bool {
        let mut tasks = write(&self.tasks);
        let Some(entry) = tasks.get_mut(task_id) else {
            return false;
        };
        if entry.snapshot.status.is_terminal() {
            return false;
        }
        entry.cancel.cancel();
        entry.snapshot.status = TaskState::Cancelled;
        entry.snapshot.completed_at = Some(Utc::now());
        true
    }

    /// Forget every finished task, returning how many were dropped
    pub fn prune_finished(&self) -> usize {
        self.prune_where(|_| true)
    }

    /// Forget tasks that finished longer ago than the retention window
    pub fn prune_expired(&self) -> usize {
        let now = Utc::now();
        let retention = self.retention;
        self.prune_where(|finished| (now - finished).to_std().unwrap_or(Duration::ZERO) >= retention)
    }

    fn prune_where<F>(&self, expired: F) -> usize
    where
        F: Fn(DateTime<Utc>) -> bool,
    {
        let mut tasks = write(&self.tasks);
        let before = tasks.len();
        tasks.retain(|_, entry| {
            let finished = match entry.snapshot.completed_at {
                Some(at) if entry.snapshot.status.is_terminal() => at,
                _ => return true,
            };
            !expired(finished)
        });
        let dropped = before - tasks.len();
        if dropped > 0 {
            tracing::debug!("Pruned {} finished task(s)", dropped);
        }
        dropped
    }

    pub fn len(&self) -> usize {
        read(&self.tasks).len()
    }

    pub fn is_empty(&self) -> bool {
        read(&self.tasks).is_empty()
    }
}

fn read(tasks: &TaskTable) -> std::sync::RwLockReadGuard<'_, HashMap<String, TaskEntry>> {
    tasks.read().unwrap_or_else(|e| e.into_inner())
}

fn write(tasks: &TaskTable) -> std::sync::RwLockWriteGuard<'_, HashMap<String, TaskEntry>> {
    tasks.write().unwrap_or_else(|e| e.into_inner())
}

fn transition<F>(tasks: &TaskTable, task_id: &str, f: F)
where
    F: FnOnce(&mut TaskSnapshot),
{
    if let Some(entry) = write(tasks).get_mut(task_id) {
        f(&mut entry.snapshot);
    }
}

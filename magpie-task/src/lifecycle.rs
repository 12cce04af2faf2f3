// SPDX-License-Identifier: MIT OR Apache-2.0

//! The task lifecycle manager: claiming, completion, cancellation and the
//! FIFO re-evaluation of waiting tasks.

use std::collections::BTreeSet;

use magpie_core::{LockRequest, Outcome, ResourceKey, Task, TaskKey, TaskStatus};
use magpie_store::{Graph, GraphStore, RetryPolicy};
use tracing::{debug, error};

use crate::admission::{self, Admission, TaskSpec};
use crate::cycles;
use crate::error::TaskError;
use crate::sweep::{self, SweepReport};

/// Drives tasks through their lifecycle against a shared graph store.
///
/// Every operation runs as one atomic store transaction; concurrent callers
/// may share clones of the same manager. The manager is the only component
/// that deletes lock or block edges.
#[derive(Clone, Debug)]
pub struct TaskManager {
    store: GraphStore,
    retry: RetryPolicy,
}

impl TaskManager {
    pub fn new(store: GraphStore) -> Self {
        Self {
            store,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(store: GraphStore, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Admit a proposed task: compute its lock/block edges and initial
    /// state. Fails without creating the task when admission is rejected.
    pub fn admit(&self, spec: TaskSpec) -> Result<Admission, TaskError> {
        self.store
            .transaction(&self.retry, |graph| admission::admit(graph, &spec))
    }

    /// An executor takes ownership of a READY task.
    pub fn claim(&self, task: &TaskKey) -> Result<(), TaskError> {
        self.store.transaction(&self.retry, |graph| {
            let task = graph
                .task_mut(task)
                .ok_or_else(|| TaskError::NotFound(task.clone()))?;
            task.transition(TaskStatus::Running)?;
            task.msg = "Running".to_string();
            Ok(())
        })
    }

    /// Terminate a task, release everything it holds and re-evaluate
    /// waiters. Returns the tasks promoted to READY.
    pub fn complete(&self, task: &TaskKey, outcome: Outcome) -> Result<Vec<TaskKey>, TaskError> {
        let msg = match outcome {
            Outcome::Succeeded => "Finished",
            Outcome::Failed => "Failed",
        };
        self.store
            .transaction(&self.retry, |graph| finalize(graph, task, outcome.into(), msg))
    }

    /// Cancel a task still in an entry state (BLOCKED or READY). A RUNNING
    /// task belongs to its executor, which must call `complete` instead.
    pub fn cancel(&self, task: &TaskKey) -> Result<Vec<TaskKey>, TaskError> {
        self.store.transaction(&self.retry, |graph| {
            let current = graph
                .task(task)
                .ok_or_else(|| TaskError::NotFound(task.clone()))?
                .status;
            if !matches!(current, TaskStatus::Blocked | TaskStatus::Ready) {
                return Err(TaskError::Transition(magpie_core::TransitionError {
                    from: current,
                    to: TaskStatus::Failed,
                }));
            }
            finalize(graph, task, TaskStatus::Failed, "Cancelled")
        })
    }

    pub fn status(&self, task: &TaskKey) -> Result<TaskStatus, TaskError> {
        self.store.with_read(|graph| {
            graph
                .task(task)
                .map(|task| task.status)
                .ok_or_else(|| TaskError::NotFound(task.clone()))
        })
    }

    pub fn get(&self, task: &TaskKey) -> Result<Task, TaskError> {
        self.store.with_read(|graph| {
            graph
                .task(task)
                .cloned()
                .ok_or_else(|| TaskError::NotFound(task.clone()))
        })
    }

    /// Recovery and consistency sweep; see [`SweepReport`].
    pub fn sweep(&self) -> Result<SweepReport, TaskError> {
        self.store.transaction(&self.retry, sweep::sweep)
    }
}

/// Shared terminal path for completion and cancellation: guarded status
/// transition, atomic lock/block removal and waiter re-evaluation, all
/// within the caller's transaction.
fn finalize(
    graph: &mut Graph,
    key: &TaskKey,
    to: TaskStatus,
    msg: &str,
) -> Result<Vec<TaskKey>, TaskError> {
    let task = graph
        .task_mut(key)
        .ok_or_else(|| TaskError::NotFound(key.clone()))?;
    task.transition(to)?;
    task.msg = msg.to_string();

    let freed = graph.remove_locks_of(key);
    let waiters = graph.remove_blocks_to(key);
    // A cancelled BLOCKED task still has waiting edges of its own.
    graph.remove_blocks_of(key);

    debug!(task = %key, status = %to, freed = freed.len(), "task finalized");
    Ok(reevaluate(graph, &freed, &waiters))
}

/// Re-evaluate blocked tasks after resources were freed.
///
/// Candidates are visited in creation order (first-requested-first-served).
/// A candidate is promoted only when every pending claim can be granted at
/// once; otherwise its block edges are refreshed to the tasks currently in
/// its way so a future completion re-triggers evaluation.
pub(crate) fn reevaluate(
    graph: &mut Graph,
    freed: &[ResourceKey],
    waiters: &[TaskKey],
) -> Vec<TaskKey> {
    let mut candidates: Vec<(u64, TaskKey)> = graph
        .tasks()
        .filter(|task| task.status == TaskStatus::Blocked)
        .filter(|task| {
            waiters.contains(&task.key)
                || task.requests.iter().any(|request| {
                    freed.contains(&request.resource) && !graph.has_lock(&task.key, &request.resource)
                })
        })
        .map(|task| (task.seq, task.key.clone()))
        .collect();
    candidates.sort();

    let mut promoted = Vec::new();
    for (seq, key) in candidates {
        let Some(task) = graph.task(&key) else {
            continue;
        };
        let pending: Vec<LockRequest> = task
            .requests
            .iter()
            .filter(|request| !graph.has_lock(&key, &request.resource))
            .cloned()
            .collect();

        let mut obstacles: BTreeSet<TaskKey> = BTreeSet::new();
        for request in &pending {
            obstacles.extend(admission::conflicts_on(
                graph,
                &request.resource,
                request.mode,
                Some(&key),
                seq,
            ));
        }

        if obstacles.is_empty() {
            let mut granted = true;
            for request in &pending {
                if let Err(err) =
                    graph.add_lock(&key, request.resource.clone(), request.mode)
                {
                    // Conflict checking said the claim was free; a failure
                    // here is a scheduler bug, surfaced and left alone.
                    error!(task = %key, %err, "lock grant failed during promotion");
                    granted = false;
                    break;
                }
            }
            if !granted {
                continue;
            }
            graph.remove_blocks_of(&key);
            if let Some(task) = graph.task_mut(&key) {
                if task.transition(TaskStatus::Ready).is_ok() {
                    task.msg = "Pending".to_string();
                    debug!(task = %key, "task promoted to ready");
                    promoted.push(key.clone());
                }
            }
        } else {
            // Keep the waiter anchored to whoever now stands in its way.
            let targets: Vec<&TaskKey> = obstacles.iter().collect();
            if cycles::would_cycle(graph, seq, &targets) {
                error!(task = %key, "block refresh would form a cycle; keeping previous edges");
                continue;
            }
            graph.remove_blocks_of(&key);
            for target in obstacles {
                graph.add_block(key.clone(), target);
            }
        }
    }

    promoted
}

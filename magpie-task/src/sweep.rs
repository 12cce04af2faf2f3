// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recovery and consistency sweeps over the lock/block graph.
//!
//! A crash between edge removal and waiter re-evaluation must never leave a
//! resource permanently unavailable. The sweep clears lock and block edges
//! whose owning task is already terminal (the documented recovery cleanup),
//! re-evaluates affected waiters, and reports what it found. Anything beyond
//! that cleanup, in particular a task stuck BLOCKED with no live blocker,
//! is surfaced as an operational fault, never silently repaired.

use magpie_core::{ResourceKey, TaskKey, TaskStatus};
use magpie_store::Graph;
use tracing::{error, warn};

use crate::error::TaskError;
use crate::lifecycle;

/// Findings of one sweep pass.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SweepReport {
    /// Lock edges whose owner was already terminal; removed.
    pub orphaned_locks: Vec<(TaskKey, ResourceKey)>,
    /// Block edges with a terminal endpoint; removed.
    pub orphaned_blocks: Vec<(TaskKey, TaskKey)>,
    /// Tasks promoted to READY by the post-cleanup re-evaluation.
    pub promoted: Vec<TaskKey>,
    /// Tasks stuck BLOCKED with no live blocker: a scheduler bug.
    pub stuck_tasks: Vec<TaskKey>,
}

impl SweepReport {
    /// No faults found (promotions alone do not make a sweep dirty).
    pub fn is_clean(&self) -> bool {
        self.orphaned_locks.is_empty()
            && self.orphaned_blocks.is_empty()
            && self.stuck_tasks.is_empty()
    }
}

fn terminal_or_missing(graph: &Graph, task: &TaskKey) -> bool {
    graph.task(task).is_none_or(|task| task.status.is_terminal())
}

pub(crate) fn sweep(graph: &mut Graph) -> Result<SweepReport, TaskError> {
    let mut report = SweepReport::default();

    let orphaned_locks: Vec<(TaskKey, ResourceKey)> = graph
        .lock_edges()
        .filter(|(task, _, _)| terminal_or_missing(graph, task))
        .map(|(task, resource, _)| (task.clone(), resource.clone()))
        .collect();
    for (task, resource) in &orphaned_locks {
        graph.remove_lock(task, resource);
    }

    let orphaned_blocks: Vec<(TaskKey, TaskKey)> = graph
        .block_edges()
        .filter(|(from, to)| terminal_or_missing(graph, from) || terminal_or_missing(graph, to))
        .map(|(from, to)| (from.clone(), to.clone()))
        .collect();
    for (from, to) in &orphaned_blocks {
        graph.remove_block(from, to);
    }

    let freed: Vec<ResourceKey> = orphaned_locks
        .iter()
        .map(|(_, resource)| resource.clone())
        .collect();
    let waiters: Vec<TaskKey> = orphaned_blocks
        .iter()
        .filter(|(from, _)| !terminal_or_missing(graph, from))
        .map(|(from, _)| from.clone())
        .collect();
    report.promoted = lifecycle::reevaluate(graph, &freed, &waiters);

    // After cleanup and re-evaluation, a blocked task with no outgoing block
    // edge has nothing left that could ever wake it.
    report.stuck_tasks = graph
        .tasks()
        .filter(|task| {
            task.status == TaskStatus::Blocked && graph.blocks_of(&task.key).next().is_none()
        })
        .map(|task| task.key.clone())
        .collect();

    report.orphaned_locks = orphaned_locks;
    report.orphaned_blocks = orphaned_blocks;

    if !report.orphaned_locks.is_empty() || !report.orphaned_blocks.is_empty() {
        warn!(
            locks = report.orphaned_locks.len(),
            blocks = report.orphaned_blocks.len(),
            "sweep cleared orphaned scheduler edges"
        );
    }
    for task in &report.stuck_tasks {
        error!(task = %task, "task stuck blocked with no live blockers");
    }

    Ok(report)
}

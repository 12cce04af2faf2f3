// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admission: assigning a new task its initial BLOCKED/READY state and its
//! lock and block edges.

use std::collections::{BTreeMap, BTreeSet};

use magpie_core::{
    LockMode, LockRequest, ResourceKey, Task, TaskKey, TaskKind, TaskStatus, UserKey,
};
use magpie_store::Graph;
use tracing::debug;

use crate::cycles;
use crate::error::TaskError;

/// A proposed task: the operation plus the set of resources it must hold.
#[derive(Clone, Debug)]
pub struct TaskSpec {
    pub kind: TaskKind,
    pub client: UserKey,
    pub requests: Vec<LockRequest>,
}

impl TaskSpec {
    pub fn new(kind: TaskKind, client: UserKey) -> Self {
        Self {
            kind,
            client,
            requests: Vec::new(),
        }
    }

    pub fn read(mut self, resource: impl Into<ResourceKey>) -> Self {
        self.requests.push(LockRequest::read(resource));
        self
    }

    pub fn write(mut self, resource: impl Into<ResourceKey>) -> Self {
        self.requests.push(LockRequest::write(resource));
        self
    }
}

/// Outcome of a successful admission.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Admission {
    Ready(TaskKey),
    Blocked {
        task: TaskKey,
        blocking: Vec<TaskKey>,
    },
}

impl Admission {
    pub fn task(&self) -> &TaskKey {
        match self {
            Admission::Ready(task) => task,
            Admission::Blocked { task, .. } => task,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Admission::Ready(_))
    }
}

/// Collapse duplicate claims on the same resource; write subsumes read.
fn normalize(requests: &[LockRequest]) -> Vec<LockRequest> {
    let mut merged: BTreeMap<ResourceKey, LockMode> = BTreeMap::new();
    for request in requests {
        merged
            .entry(request.resource.clone())
            .and_modify(|mode| {
                if request.mode == LockMode::Write {
                    *mode = LockMode::Write;
                }
            })
            .or_insert(request.mode);
    }
    merged
        .into_iter()
        .map(|(resource, mode)| LockRequest { resource, mode })
        .collect()
}

/// Tasks that currently stand between `(resource, mode)` and a grant: live
/// conflicting lock holders, plus blocked tasks older than `before_seq` with
/// a conflicting claim still pending. Counting pending claims is what makes
/// admission first-requested-first-served; a newer task must queue behind an
/// older waiter even when the resource is momentarily free.
pub(crate) fn conflicts_on(
    graph: &Graph,
    resource: &ResourceKey,
    mode: LockMode,
    exclude: Option<&TaskKey>,
    before_seq: u64,
) -> BTreeSet<TaskKey> {
    let mut conflicts = BTreeSet::new();

    for (holder, held) in graph.locks_on(resource) {
        if Some(&holder) == exclude {
            continue;
        }
        if mode.conflicts_with(held) {
            conflicts.insert(holder);
        }
    }

    for task in graph.tasks() {
        if task.status != TaskStatus::Blocked || task.seq >= before_seq {
            continue;
        }
        if Some(&task.key) == exclude || graph.has_lock(&task.key, resource) {
            continue;
        }
        let wants = task
            .requests
            .iter()
            .any(|request| request.resource == *resource && mode.conflicts_with(request.mode));
        if wants {
            conflicts.insert(task.key.clone());
        }
    }

    conflicts
}

/// Admit a task within the current transaction.
///
/// All-or-nothing: a rejected admission returns an error before any state
/// change survives (the surrounding transaction discards the staged graph),
/// so the task is simply never created.
pub(crate) fn admit(graph: &mut Graph, spec: &TaskSpec) -> Result<Admission, TaskError> {
    let requests = normalize(&spec.requests);
    for request in &requests {
        if !graph.has_resource(&request.resource) {
            return Err(TaskError::ResourceNotFound(request.resource.clone()));
        }
    }

    let seq = graph.next_task_seq();

    let mut granted = Vec::new();
    let mut blocking: BTreeSet<TaskKey> = BTreeSet::new();
    for request in &requests {
        let conflicts = conflicts_on(graph, &request.resource, request.mode, None, u64::MAX);
        if conflicts.is_empty() {
            granted.push(request.clone());
        } else {
            blocking.extend(conflicts);
        }
    }

    if !blocking.is_empty() {
        let targets: Vec<&TaskKey> = blocking.iter().collect();
        if cycles::would_cycle(graph, seq, &targets) {
            return Err(TaskError::DeadlockRejected);
        }
    }

    let key = TaskKey::random();
    let status = if blocking.is_empty() {
        TaskStatus::Ready
    } else {
        TaskStatus::Blocked
    };
    graph.insert_task(Task::new(
        key.clone(),
        spec.kind,
        spec.client.clone(),
        requests,
        seq,
        status,
    ));

    for request in granted {
        graph
            .add_lock(&key, request.resource, request.mode)
            .map_err(|err| TaskError::Integrity(err.to_string()))?;
    }
    for target in &blocking {
        graph.add_block(key.clone(), target.clone());
    }

    debug!(task = %key, %seq, ?status, waiting_on = blocking.len(), "task admitted");

    if blocking.is_empty() {
        Ok(Admission::Ready(key))
    } else {
        Ok(Admission::Blocked {
            task: key,
            blocking: blocking.into_iter().collect(),
        })
    }
}

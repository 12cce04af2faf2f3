// SPDX-License-Identifier: MIT OR Apache-2.0

//! Task documents and the task status state machine.
//!
//! All status changes go through [`Task::transition`] so the legal lifecycle
//! (BLOCKED → READY → RUNNING → terminal, with cancellation from the two
//! entry states) is enforced in exactly one place.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::unix_time;
use crate::edge::LockMode;
use crate::key::{ResourceKey, TaskKey, UserKey};

#[derive(Clone, Debug, Error, PartialEq)]
#[error("invalid task transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: TaskStatus,
    pub to: TaskStatus,
}

/// Kind of asynchronous operation a task performs.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    DataGet,
    DataPut,
    RecordDelete,
    OwnerChange,
    AllocationChange,
    ProjectDelete,
}

/// Task lifecycle status.
///
/// `Blocked` and `Ready` are entry states assigned at admission; `Running` is
/// entered when an executor claims a ready task; `Succeeded` and `Failed` are
/// terminal.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Blocked,
    Ready,
    Running,
    Succeeded,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed)
    }

    /// Legal transitions. `Failed` is reachable from every non-terminal
    /// state (cancellation from the entry states, failure from running);
    /// `Succeeded` only from `Running`.
    pub fn can_transition(self, to: TaskStatus) -> bool {
        matches!(
            (self, to),
            (TaskStatus::Blocked, TaskStatus::Ready)
                | (TaskStatus::Blocked, TaskStatus::Failed)
                | (TaskStatus::Ready, TaskStatus::Running)
                | (TaskStatus::Ready, TaskStatus::Failed)
                | (TaskStatus::Running, TaskStatus::Succeeded)
                | (TaskStatus::Running, TaskStatus::Failed)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Blocked => "blocked",
            TaskStatus::Ready => "ready",
            TaskStatus::Running => "running",
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Terminal outcome reported to `complete`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    Succeeded,
    Failed,
}

impl From<Outcome> for TaskStatus {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Succeeded => TaskStatus::Succeeded,
            Outcome::Failed => TaskStatus::Failed,
        }
    }
}

/// One resource claim of a task.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct LockRequest {
    pub resource: ResourceKey,
    pub mode: LockMode,
}

impl LockRequest {
    pub fn read(resource: impl Into<ResourceKey>) -> Self {
        Self {
            resource: resource.into(),
            mode: LockMode::Read,
        }
    }

    pub fn write(resource: impl Into<ResourceKey>) -> Self {
        Self {
            resource: resource.into(),
            mode: LockMode::Write,
        }
    }
}

/// A unit of asynchronous work.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub key: TaskKey,
    pub kind: TaskKind,
    pub status: TaskStatus,
    /// Identity the task acts on behalf of.
    pub client: UserKey,
    /// The full resource claim set the task was admitted with; pending
    /// (not-yet-granted) claims are re-checked at every re-evaluation.
    pub requests: Vec<LockRequest>,
    /// Monotonic creation sequence number; the FIFO ordering key.
    pub seq: u64,
    /// Human-readable progress message.
    pub msg: String,
    pub ct: u64,
    pub ut: u64,
}

impl Task {
    pub fn new(
        key: TaskKey,
        kind: TaskKind,
        client: UserKey,
        requests: Vec<LockRequest>,
        seq: u64,
        status: TaskStatus,
    ) -> Self {
        let now = unix_time();
        let msg = match status {
            TaskStatus::Blocked => "Blocked",
            _ => "Pending",
        };
        Self {
            key,
            kind,
            status,
            client,
            requests,
            seq,
            msg: msg.to_string(),
            ct: now,
            ut: now,
        }
    }

    /// Apply a guarded status transition.
    pub fn transition(&mut self, to: TaskStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition(to) {
            return Err(TransitionError {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.ut = unix_time();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::RecordKey;

    fn task(status: TaskStatus) -> Task {
        Task::new(
            TaskKey::new("t1"),
            TaskKind::DataGet,
            UserKey::new("ada"),
            vec![LockRequest::read(RecordKey::new("x1"))],
            1,
            status,
        )
    }

    #[test]
    fn entry_states_can_be_cancelled() {
        assert!(task(TaskStatus::Blocked).transition(TaskStatus::Failed).is_ok());
        assert!(task(TaskStatus::Ready).transition(TaskStatus::Failed).is_ok());
    }

    #[test]
    fn success_requires_running() {
        assert!(
            task(TaskStatus::Blocked)
                .transition(TaskStatus::Succeeded)
                .is_err()
        );
        assert!(
            task(TaskStatus::Ready)
                .transition(TaskStatus::Succeeded)
                .is_err()
        );

        let mut running = task(TaskStatus::Ready);
        running.transition(TaskStatus::Running).expect("claim");
        assert!(running.transition(TaskStatus::Succeeded).is_ok());
    }

    #[test]
    fn terminal_states_are_final() {
        let mut done = task(TaskStatus::Ready);
        done.transition(TaskStatus::Failed).expect("cancel");
        assert!(done.status.is_terminal());
        assert!(done.transition(TaskStatus::Ready).is_err());
        assert!(done.transition(TaskStatus::Running).is_err());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&TaskStatus::Succeeded).expect("serialize status");
        assert_eq!(json, "\"succeeded\"");
    }
}

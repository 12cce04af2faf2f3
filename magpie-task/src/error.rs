// SPDX-License-Identifier: MIT OR Apache-2.0

use magpie_core::{ResourceKey, TaskKey, TransitionError};
use magpie_store::StoreError;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum TaskError {
    #[error("task not found: {0}")]
    NotFound(TaskKey),

    #[error("resource not found: {0}")]
    ResourceNotFound(ResourceKey),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// Admission would introduce a cycle into the block graph; nothing was
    /// created.
    #[error("admission rejected: blocking would deadlock")]
    DeadlockRejected,

    /// Store-level failures. `StoreError::Busy` is the retryable transaction
    /// conflict, surfaced only after the store's bounded backoff retries.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Scheduler self-consistency violation; surfaced to the operator
    /// channel, never silently repaired.
    #[error("scheduler integrity fault: {0}")]
    Integrity(String),
}

// SPDX-License-Identifier: MIT OR Apache-2.0

use magpie_core::{AliasKey, LockMode, ObjectKey, ResourceKey, TaskKey, VertexKey};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("vertex not found: {0}")]
    NotFound(VertexKey),

    /// Transient write-guard contention; the operation as a whole is safe to
    /// retry.
    #[error("graph store busy: exhausted transaction retries")]
    Busy,

    /// Integrity guard on lock-edge insertion: write locks are exclusive
    /// against every other lock on the same resource.
    #[error("{mode} lock on {resource} conflicts with lock held by {holder}")]
    LockConflict {
        resource: ResourceKey,
        mode: LockMode,
        holder: TaskKey,
    },

    #[error("alias {0} is already bound")]
    AliasBound(AliasKey),

    #[error("object {0} already carries an alias")]
    AliasExists(ObjectKey),

    #[error("object {0} is already linked under a parent collection")]
    HasParent(ObjectKey),
}

// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core data model for the magpie catalog: typed vertex keys, the capability
//! mask, vertex documents, edge payloads and the task state machine.

pub mod clock;
pub mod edge;
pub mod key;
pub mod perm;
pub mod task;
pub mod vertex;

pub use edge::{AclEntry, Allocation, Dependency, LockMode};
pub use key::{
    AccountKey, AliasKey, CollectionKey, GroupKey, KeyError, ObjectKey, OwnerKey, PrincipalKey,
    ProjectKey, RecordKey, RepoKey, ResourceKey, TaskKey, UserKey, VertexKey,
};
pub use perm::PermMask;
pub use task::{LockRequest, Outcome, Task, TaskKind, TaskStatus, TransitionError};
pub use vertex::{AclState, Account, Alias, Collection, Group, Project, Record, Repo, User};

// SPDX-License-Identifier: MIT OR Apache-2.0

use magpie_auth::AuthError;
use magpie_core::{OwnerKey, RepoKey};
use magpie_store::StoreError;
use magpie_task::TaskError;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum CatalogError {
    /// Covers both "object exists but is hidden" and "object does not
    /// exist"; the two must be indistinguishable to callers.
    #[error("permission denied")]
    PermissionDenied,

    #[error(transparent)]
    Auth(AuthError),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("no allocation for {owner} on {repo}")]
    NoAllocation { owner: OwnerKey, repo: RepoKey },

    #[error("allocation exhausted on {repo}")]
    AllocationExceeded { repo: RepoKey },

    #[error("invalid link: {0}")]
    InvalidLink(String),
}

impl From<AuthError> for CatalogError {
    fn from(err: AuthError) -> Self {
        match err {
            // The existence non-leakage boundary: gated operations answer
            // identically for hidden and absent objects.
            AuthError::NotFound(_) | AuthError::PermissionDenied => Self::PermissionDenied,
            other => Self::Auth(other),
        }
    }
}

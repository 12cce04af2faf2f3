// SPDX-License-Identifier: MIT OR Apache-2.0

use magpie_core::{AccountKey, ObjectKey};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum AuthError {
    #[error("object not found: {0}")]
    NotFound(ObjectKey),

    /// The message deliberately carries no object detail; callers surface it
    /// for missing and hidden objects alike.
    #[error("permission denied")]
    PermissionDenied,

    /// Containment revisited a vertex: a data-integrity fault, not a normal
    /// denial.
    #[error("containment cycle detected at {0}")]
    ContainmentCycle(ObjectKey),

    #[error("no user linked to account {0}")]
    UnknownIdentity(AccountKey),
}

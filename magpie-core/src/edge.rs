// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payload records carried by graph edges.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::perm::PermMask;

/// Payload of an `acl` edge from a catalog object to a principal.
///
/// Denies override grants at the same level; the resolver applies the
/// combination rules.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct AclEntry {
    pub grant: PermMask,
    pub deny: PermMask,
}

impl AclEntry {
    pub fn grant(mask: PermMask) -> Self {
        Self {
            grant: mask,
            deny: PermMask::NONE,
        }
    }

    pub fn deny(mask: PermMask) -> Self {
        Self {
            grant: PermMask::NONE,
            deny: mask,
        }
    }
}

/// Payload of an `allocation` edge from a principal to a repo: quota limits
/// and current usage counters.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    /// Maximum raw data bytes.
    pub data_limit: u64,
    /// Raw data bytes currently in use.
    pub data_size: u64,
    /// Maximum number of records.
    pub rec_limit: u64,
    /// Records currently allocated.
    pub rec_count: u64,
}

impl Allocation {
    pub fn new(data_limit: u64, rec_limit: u64) -> Self {
        Self {
            data_limit,
            data_size: 0,
            rec_limit,
            rec_count: 0,
        }
    }

    /// Whether one more record of `size` bytes fits within the limits.
    pub fn fits(&self, size: u64) -> bool {
        self.rec_count < self.rec_limit && self.data_size.saturating_add(size) <= self.data_limit
    }
}

/// Mode of a `lock` edge from a task to a resource.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockMode {
    Read,
    Write,
}

impl LockMode {
    /// Two locks on the same resource conflict unless both are reads.
    pub fn conflicts_with(self, other: LockMode) -> bool {
        matches!(self, LockMode::Write) || matches!(other, LockMode::Write)
    }
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LockMode::Read => "read",
            LockMode::Write => "write",
        };
        write!(f, "{}", s)
    }
}

/// Payload of a `dependency` edge between two data records, expressing a
/// derivation or versioning relationship.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dependency {
    DerivedFrom,
    ComponentOf,
    NewVersionOf,
}

// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vertex documents for every catalog collection.

use serde::{Deserialize, Serialize};

use crate::clock::unix_time;
use crate::key::{
    AccountKey, AliasKey, CollectionKey, GroupKey, ProjectKey, RecordKey, RepoKey, UserKey,
};
use crate::perm::PermMask;

/// ACL-related state shared by records and collections.
///
/// `local_grant`/`local_deny` are the object's direct mask pair, applied to
/// every authenticated identity before per-principal ACL edges. A set `topic`
/// publishes the object: everyone receives [`PermMask::PUBLIC`] at this
/// level. `acl_rev` moves on every ACL-affecting mutation and is the cache
/// invalidation stamp used by the permission resolver.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct AclState {
    pub local_grant: PermMask,
    pub local_deny: PermMask,
    pub topic: Option<String>,
    pub acl_rev: u64,
}

impl AclState {
    /// Record an ACL-affecting mutation.
    pub fn touch(&mut self) {
        self.acl_rev += 1;
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub key: UserKey,
    pub name: String,
    pub email: Option<String>,
}

impl User {
    pub fn new(key: UserKey, name: impl Into<String>) -> Self {
        Self {
            key,
            name: name.into(),
            email: None,
        }
    }
}

/// A linked external account identity, resolved to its user through an
/// `identity` edge.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub key: AccountKey,
    pub provider: String,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub key: GroupKey,
    pub title: String,
}

impl Group {
    pub fn new(key: GroupKey, title: impl Into<String>) -> Self {
        Self {
            key,
            title: title.into(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub key: ProjectKey,
    pub title: String,
}

impl Project {
    pub fn new(key: ProjectKey, title: impl Into<String>) -> Self {
        Self {
            key,
            title: title.into(),
        }
    }
}

/// The atomic catalog object: one data record.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub key: RecordKey,
    pub title: String,
    pub desc: Option<String>,
    /// Raw data size in bytes.
    pub size: u64,
    pub ct: u64,
    pub ut: u64,
    pub acl: AclState,
}

impl Record {
    pub fn new(key: RecordKey, title: impl Into<String>) -> Self {
        let now = unix_time();
        Self {
            key,
            title: title.into(),
            desc: None,
            size: 0,
            ct: now,
            ut: now,
            acl: AclState::default(),
        }
    }
}

/// Container object; children are attached through `item` edges.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub key: CollectionKey,
    pub title: String,
    pub ct: u64,
    pub ut: u64,
    pub acl: AclState,
}

impl Collection {
    pub fn new(key: CollectionKey, title: impl Into<String>) -> Self {
        let now = unix_time();
        Self {
            key,
            title: title.into(),
            ct: now,
            ut: now,
            acl: AclState::default(),
        }
    }
}

/// A human-readable name bound 1:1 to a record or collection through an
/// `alias` edge.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Alias {
    pub key: AliasKey,
}

/// A storage/execution endpoint.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Repo {
    pub key: RepoKey,
    pub title: String,
    pub address: String,
    /// Total capacity in bytes.
    pub capacity: u64,
}

impl Repo {
    pub fn new(key: RepoKey, title: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            key,
            title: title.into(),
            address: address.into(),
            capacity: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acl_rev_moves_on_touch() {
        let mut record = Record::new(RecordKey::new("x1"), "sample");
        let before = record.acl.acl_rev;
        record.acl.touch();
        assert_eq!(record.acl.acl_rev, before + 1);
    }

    #[test]
    fn record_document_round_trip() {
        let mut record = Record::new(RecordKey::new("x1"), "sample");
        record.acl.local_grant = PermMask::READ_ALL;
        record.acl.topic = Some("materials.synthesis".to_string());

        let json = serde_json::to_string(&record).expect("serialize record");
        let back: Record = serde_json::from_str(&json).expect("deserialize record");
        assert_eq!(back, record);
    }
}

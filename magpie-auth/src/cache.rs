// SPDX-License-Identifier: MIT OR Apache-2.0

//! Effective-mask cache with revision-stamp invalidation.

use std::collections::HashMap;

use magpie_core::{ObjectKey, PermMask, UserKey};
use magpie_store::Graph;

/// One cached resolution: the effective mask plus the ACL revision of every
/// object on the containment chain it was computed from.
#[derive(Clone, Debug)]
struct CacheEntry {
    mask: PermMask,
    stamps: Vec<(ObjectKey, u64)>,
}

/// Per-resolver memo of effective masks.
///
/// A lookup revalidates every stamp against the live graph, so an entry dies
/// the moment any ACL edge, local mask, topic or containment link on the
/// object or one of its ancestors changes (all of those move `acl_rev`).
#[derive(Debug, Default)]
pub(crate) struct PermCache {
    entries: HashMap<(UserKey, ObjectKey), CacheEntry>,
}

impl PermCache {
    pub(crate) fn lookup(
        &self,
        graph: &Graph,
        user: &UserKey,
        object: &ObjectKey,
    ) -> Option<PermMask> {
        let entry = self.entries.get(&(user.clone(), object.clone()))?;
        for (chained, rev) in &entry.stamps {
            if graph.acl_state(chained).map(|state| state.acl_rev) != Some(*rev) {
                return None;
            }
        }
        Some(entry.mask)
    }

    pub(crate) fn store(
        &mut self,
        user: UserKey,
        object: ObjectKey,
        mask: PermMask,
        stamps: Vec<(ObjectKey, u64)>,
    ) {
        self.entries
            .insert((user, object), CacheEntry { mask, stamps });
    }
}

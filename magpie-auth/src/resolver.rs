// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::HashSet;

use magpie_core::{AclState, GroupKey, ObjectKey, OwnerKey, PermMask, PrincipalKey, UserKey};
use magpie_store::Graph;
use tracing::debug;

use crate::cache::PermCache;
use crate::error::AuthError;

/// Resolves effective capability masks for identities on catalog objects.
///
/// Owners and project admins bypass ACL evaluation entirely. For everyone
/// else the mask is assembled level by level: the object's own ACLs first,
/// then each ancestor reached through reverse `item` edges. At every level a
/// deny clears the bits it shares with grants from the same level, and a
/// local deny on the object itself clears the bit no matter which ancestor
/// granted it.
///
/// The resolver carries a per-instance cache; pass the same instance across
/// calls to benefit from it. Results are invalidated through ACL revision
/// stamps, never by time.
#[derive(Debug, Default)]
pub struct PermissionResolver {
    cache: PermCache,
}

impl PermissionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the effective mask of `user` on `object`.
    pub fn resolve(
        &mut self,
        graph: &Graph,
        user: &UserKey,
        object: &ObjectKey,
    ) -> Result<PermMask, AuthError> {
        if !graph.has_object(object) {
            return Err(AuthError::NotFound(object.clone()));
        }

        // The privileged path comes first: owners and admins short-circuit
        // both the ACL walk and the cache.
        if owner_bypass(graph, user, object) {
            return Ok(PermMask::ALL);
        }

        if let Some(mask) = self.cache.lookup(graph, user, object) {
            return Ok(mask);
        }

        let groups: HashSet<GroupKey> = graph.groups_of(user).cloned().collect();

        let mut effective = PermMask::NONE;
        let mut local_deny = PermMask::NONE;
        let mut stamps = Vec::new();
        let mut visited: HashSet<ObjectKey> = HashSet::new();

        let mut current = Some(object.clone());
        while let Some(level) = current {
            if !visited.insert(level.clone()) {
                return Err(AuthError::ContainmentCycle(level));
            }

            let state = graph
                .acl_state(&level)
                .ok_or_else(|| AuthError::NotFound(level.clone()))?;
            let (grant, deny) = level_masks(graph, &level, state, user, &groups);

            if level == *object {
                local_deny = deny;
            }
            // A deny only suppresses grants from its own level; inherited
            // grants from other ancestors pass through untouched.
            effective |= grant.without(deny);

            stamps.push((level.clone(), state.acl_rev));
            current = graph
                .parent_of(&level)
                .map(|parent| ObjectKey::Collection(parent.clone()));
        }

        // Local denies win over every inherited grant.
        effective = effective.without(local_deny);

        debug!(%user, %object, mask = %effective, "resolved effective permissions");
        self.cache
            .store(user.clone(), object.clone(), effective, stamps);
        Ok(effective)
    }

    /// Whether `user` holds every bit of `required` on `object`.
    pub fn check(
        &mut self,
        graph: &Graph,
        user: &UserKey,
        object: &ObjectKey,
        required: PermMask,
    ) -> Result<bool, AuthError> {
        Ok(self.resolve(graph, user, object)?.contains(required))
    }

    /// Like [`check`](Self::check) but failing with `PermissionDenied`.
    pub fn enforce(
        &mut self,
        graph: &Graph,
        user: &UserKey,
        object: &ObjectKey,
        required: PermMask,
    ) -> Result<(), AuthError> {
        if self.check(graph, user, object, required)? {
            Ok(())
        } else {
            debug!(%user, %object, required = %required, "permission denied");
            Err(AuthError::PermissionDenied)
        }
    }
}

/// Owner/admin bypass: direct user ownership, or ownership through a project
/// the user owns or administers.
fn owner_bypass(graph: &Graph, user: &UserKey, object: &ObjectKey) -> bool {
    match graph.owner_of(&object.clone().into()) {
        Some(OwnerKey::User(owner)) => owner == user,
        Some(OwnerKey::Project(project)) => {
            if graph.is_admin(project, user) {
                return true;
            }
            matches!(
                graph.owner_of(&project.clone().into()),
                Some(OwnerKey::User(owner)) if owner == user
            )
        }
        None => false,
    }
}

/// Grant and deny masks contributed by one level of the hierarchy: the
/// object's direct mask pair, publication, and every ACL entry matching the
/// identity or one of its groups.
fn level_masks(
    graph: &Graph,
    object: &ObjectKey,
    state: &AclState,
    user: &UserKey,
    groups: &HashSet<GroupKey>,
) -> (PermMask, PermMask) {
    let mut grant = state.local_grant;
    let mut deny = state.local_deny;

    if state.topic.is_some() {
        grant |= PermMask::PUBLIC;
    }

    for (principal, entry) in graph.acls_of(object) {
        let applies = match principal {
            PrincipalKey::User(subject) => subject == user,
            PrincipalKey::Group(group) => groups.contains(group),
        };
        if applies {
            grant |= entry.grant;
            deny |= entry.deny;
        }
    }

    (grant, deny)
}

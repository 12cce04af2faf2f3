// SPDX-License-Identifier: MIT OR Apache-2.0

//! The document-graph engine: typed vertex collections and the named edge
//! relations of the catalog schema.

use std::collections::HashMap;

use magpie_core::{
    Account, AccountKey, AclEntry, AclState, Alias, AliasKey, Allocation, Collection, CollectionKey,
    Dependency, Group, GroupKey, LockMode, ObjectKey, OwnerKey, PrincipalKey, Project, ProjectKey,
    Record, RecordKey, Repo, RepoKey, ResourceKey, Task, TaskKey, User, UserKey, VertexKey,
};

use crate::edge_map::EdgeMap;
use crate::error::StoreError;

/// In-memory property graph over the catalog schema.
///
/// Cheap structural invariants (exactly one owner edge, 1:1 alias binding,
/// single containment parent, write-lock exclusivity) are enforced here at
/// mutation time; traversal-order policies live with the resolver and
/// scheduler that own them.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    users: HashMap<UserKey, User>,
    accounts: HashMap<AccountKey, Account>,
    groups: HashMap<GroupKey, Group>,
    projects: HashMap<ProjectKey, Project>,
    records: HashMap<RecordKey, Record>,
    collections: HashMap<CollectionKey, Collection>,
    aliases: HashMap<AliasKey, Alias>,
    repos: HashMap<RepoKey, Repo>,
    tasks: HashMap<TaskKey, Task>,

    owner: EdgeMap<VertexKey, OwnerKey>,
    admin: EdgeMap<ProjectKey, UserKey>,
    member: EdgeMap<GroupKey, UserKey>,
    item: EdgeMap<CollectionKey, ObjectKey>,
    acl: EdgeMap<ObjectKey, PrincipalKey, AclEntry>,
    alias: EdgeMap<AliasKey, ObjectKey>,
    identity: EdgeMap<UserKey, AccountKey>,
    allocation: EdgeMap<OwnerKey, RepoKey, Allocation>,
    location: EdgeMap<RecordKey, RepoKey>,
    dependency: EdgeMap<RecordKey, RecordKey, Dependency>,
    lock: EdgeMap<TaskKey, ResourceKey, LockMode>,
    block: EdgeMap<TaskKey, TaskKey>,

    task_seq: u64,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    // Vertex collections.

    pub fn insert_user(&mut self, user: User) {
        self.users.insert(user.key.clone(), user);
    }

    pub fn user(&self, key: &UserKey) -> Option<&User> {
        self.users.get(key)
    }

    pub fn insert_account(&mut self, account: Account) {
        self.accounts.insert(account.key.clone(), account);
    }

    pub fn account(&self, key: &AccountKey) -> Option<&Account> {
        self.accounts.get(key)
    }

    pub fn insert_group(&mut self, group: Group) {
        self.groups.insert(group.key.clone(), group);
    }

    pub fn group(&self, key: &GroupKey) -> Option<&Group> {
        self.groups.get(key)
    }

    pub fn insert_project(&mut self, project: Project) {
        self.projects.insert(project.key.clone(), project);
    }

    pub fn project(&self, key: &ProjectKey) -> Option<&Project> {
        self.projects.get(key)
    }

    pub fn insert_record(&mut self, record: Record) {
        self.records.insert(record.key.clone(), record);
    }

    pub fn record(&self, key: &RecordKey) -> Option<&Record> {
        self.records.get(key)
    }

    pub fn record_mut(&mut self, key: &RecordKey) -> Option<&mut Record> {
        self.records.get_mut(key)
    }

    pub fn insert_collection(&mut self, collection: Collection) {
        self.collections.insert(collection.key.clone(), collection);
    }

    pub fn collection(&self, key: &CollectionKey) -> Option<&Collection> {
        self.collections.get(key)
    }

    pub fn insert_repo(&mut self, repo: Repo) {
        self.repos.insert(repo.key.clone(), repo);
    }

    pub fn repo(&self, key: &RepoKey) -> Option<&Repo> {
        self.repos.get(key)
    }

    /// Whether an ACL-bearing object exists.
    pub fn has_object(&self, object: &ObjectKey) -> bool {
        match object {
            ObjectKey::Record(record) => self.records.contains_key(record),
            ObjectKey::Collection(collection) => self.collections.contains_key(collection),
        }
    }

    /// Whether a lockable resource exists.
    pub fn has_resource(&self, resource: &ResourceKey) -> bool {
        match resource {
            ResourceKey::Record(record) => self.records.contains_key(record),
            ResourceKey::Collection(collection) => self.collections.contains_key(collection),
            ResourceKey::Project(project) => self.projects.contains_key(project),
            ResourceKey::User(user) => self.users.contains_key(user),
            ResourceKey::Repo(repo) => self.repos.contains_key(repo),
        }
    }

    // Ownership and authority.

    /// Set the single `owner` edge of a vertex, replacing any previous one.
    pub fn set_owner(&mut self, from: impl Into<VertexKey>, owner: OwnerKey) {
        let from = from.into();
        self.owner.remove_outbound(&from);
        self.owner.insert(from, owner, ());
    }

    pub fn owner_of(&self, from: &VertexKey) -> Option<&OwnerKey> {
        self.owner.outbound(from).next().map(|(owner, _)| owner)
    }

    /// Every vertex owned by a principal.
    pub fn owned_by(&self, owner: &OwnerKey) -> impl Iterator<Item = &VertexKey> {
        self.owner.inbound(owner)
    }

    pub fn add_admin(&mut self, project: ProjectKey, user: UserKey) {
        self.admin.insert(project, user, ());
    }

    pub fn is_admin(&self, project: &ProjectKey, user: &UserKey) -> bool {
        self.admin.contains(project, user)
    }

    // Group membership.

    pub fn add_member(&mut self, group: GroupKey, user: UserKey) {
        self.member.insert(group, user, ());
    }

    pub fn remove_member(&mut self, group: &GroupKey, user: &UserKey) -> bool {
        self.member.remove(group, user).is_some()
    }

    pub fn is_member(&self, group: &GroupKey, user: &UserKey) -> bool {
        self.member.contains(group, user)
    }

    /// Groups the user belongs to.
    pub fn groups_of(&self, user: &UserKey) -> impl Iterator<Item = &GroupKey> {
        self.member.inbound(user)
    }

    // Containment.

    /// Link `child` under `parent`. Containment is a tree: an object may
    /// have at most one parent collection.
    ///
    /// Re-parenting changes what the child inherits, so its ACL revision
    /// moves like any other ACL mutation.
    pub fn link_item(&mut self, parent: &CollectionKey, child: ObjectKey) -> Result<(), StoreError> {
        if !self.collections.contains_key(parent) {
            return Err(StoreError::NotFound(parent.clone().into()));
        }
        if !self.has_object(&child) {
            return Err(StoreError::NotFound(child.into()));
        }
        if self.item.in_degree(&child) > 0 {
            return Err(StoreError::HasParent(child));
        }
        self.item.insert(parent.clone(), child.clone(), ());
        if let Some(state) = self.acl_state_mut(&child) {
            state.touch();
        }
        Ok(())
    }

    pub fn unlink_item(&mut self, parent: &CollectionKey, child: &ObjectKey) -> bool {
        let removed = self.item.remove(parent, child).is_some();
        if removed && let Some(state) = self.acl_state_mut(child) {
            state.touch();
        }
        removed
    }

    /// The parent collection of an object, if it is linked anywhere.
    pub fn parent_of(&self, child: &ObjectKey) -> Option<&CollectionKey> {
        self.item.inbound(child).next()
    }

    pub fn children_of(&self, parent: &CollectionKey) -> impl Iterator<Item = &ObjectKey> {
        self.item.outbound(parent).map(|(child, _)| child)
    }

    // ACLs.

    pub fn acl_state(&self, object: &ObjectKey) -> Option<&AclState> {
        match object {
            ObjectKey::Record(record) => self.records.get(record).map(|r| &r.acl),
            ObjectKey::Collection(collection) => self.collections.get(collection).map(|c| &c.acl),
        }
    }

    pub fn acl_state_mut(&mut self, object: &ObjectKey) -> Option<&mut AclState> {
        match object {
            ObjectKey::Record(record) => self.records.get_mut(record).map(|r| &mut r.acl),
            ObjectKey::Collection(collection) => {
                self.collections.get_mut(collection).map(|c| &mut c.acl)
            }
        }
    }

    /// Insert or replace the ACL entry for a principal and bump the object's
    /// ACL revision.
    pub fn set_acl(
        &mut self,
        object: &ObjectKey,
        principal: PrincipalKey,
        entry: AclEntry,
    ) -> Result<(), StoreError> {
        let state = self
            .acl_state_mut(object)
            .ok_or_else(|| StoreError::NotFound(object.clone().into()))?;
        state.touch();
        self.acl.insert(object.clone(), principal, entry);
        Ok(())
    }

    pub fn remove_acl(
        &mut self,
        object: &ObjectKey,
        principal: &PrincipalKey,
    ) -> Result<bool, StoreError> {
        let state = self
            .acl_state_mut(object)
            .ok_or_else(|| StoreError::NotFound(object.clone().into()))?;
        state.touch();
        Ok(self.acl.remove(object, principal).is_some())
    }

    pub fn acls_of(&self, object: &ObjectKey) -> impl Iterator<Item = (&PrincipalKey, &AclEntry)> {
        self.acl.outbound(object).map(|(principal, entry)| (principal, entry))
    }

    /// Publish or unpublish an object. Publication affects effective
    /// permissions, so the ACL revision moves.
    pub fn set_topic(&mut self, object: &ObjectKey, topic: Option<String>) -> Result<(), StoreError> {
        let state = self
            .acl_state_mut(object)
            .ok_or_else(|| StoreError::NotFound(object.clone().into()))?;
        state.topic = topic;
        state.touch();
        Ok(())
    }

    // Aliases.

    /// Bind an alias vertex 1:1 to an object.
    pub fn bind_alias(&mut self, alias: Alias, object: ObjectKey) -> Result<(), StoreError> {
        if self.aliases.contains_key(&alias.key) {
            return Err(StoreError::AliasBound(alias.key));
        }
        if !self.has_object(&object) {
            return Err(StoreError::NotFound(object.into()));
        }
        if self.alias.in_degree(&object) > 0 {
            return Err(StoreError::AliasExists(object));
        }
        self.alias.insert(alias.key.clone(), object, ());
        self.aliases.insert(alias.key.clone(), alias);
        Ok(())
    }

    pub fn unbind_alias(&mut self, key: &AliasKey) -> bool {
        self.alias.remove_outbound(key);
        self.aliases.remove(key).is_some()
    }

    pub fn alias_target(&self, key: &AliasKey) -> Option<&ObjectKey> {
        self.alias.outbound(key).next().map(|(object, _)| object)
    }

    pub fn alias_of(&self, object: &ObjectKey) -> Option<&AliasKey> {
        self.alias.inbound(object).next()
    }

    // Identities.

    pub fn link_identity(&mut self, user: UserKey, account: AccountKey) {
        self.identity.insert(user, account, ());
    }

    pub fn user_for_account(&self, account: &AccountKey) -> Option<&UserKey> {
        self.identity.inbound(account).next()
    }

    // Allocations and locations.

    pub fn set_allocation(&mut self, owner: OwnerKey, repo: RepoKey, allocation: Allocation) {
        self.allocation.insert(owner, repo, allocation);
    }

    pub fn allocation(&self, owner: &OwnerKey, repo: &RepoKey) -> Option<&Allocation> {
        self.allocation.get(owner, repo)
    }

    pub fn allocation_mut(&mut self, owner: &OwnerKey, repo: &RepoKey) -> Option<&mut Allocation> {
        self.allocation.get_mut(owner, repo)
    }

    pub fn set_location(&mut self, record: RecordKey, repo: RepoKey) {
        self.location.remove_outbound(&record);
        self.location.insert(record, repo, ());
    }

    pub fn location_of(&self, record: &RecordKey) -> Option<&RepoKey> {
        self.location.outbound(record).next().map(|(repo, _)| repo)
    }

    pub fn add_dependency(&mut self, from: RecordKey, to: RecordKey, kind: Dependency) {
        self.dependency.insert(from, to, kind);
    }

    pub fn dependencies_of(&self, record: &RecordKey) -> impl Iterator<Item = (&RecordKey, &Dependency)> {
        self.dependency.outbound(record).map(|(target, kind)| (target, kind))
    }

    // Object removal.

    /// Remove an object vertex together with every incident edge.
    pub fn remove_object(&mut self, object: &ObjectKey) -> Result<(), StoreError> {
        if !self.has_object(object) {
            return Err(StoreError::NotFound(object.clone().into()));
        }

        self.owner.remove_outbound(&object.clone().into());
        self.acl.remove_outbound(object);
        self.item.remove_inbound(object);
        for alias in self.alias.remove_inbound(object) {
            self.aliases.remove(&alias);
        }

        match object {
            ObjectKey::Record(record) => {
                self.location.remove_outbound(record);
                self.dependency.remove_outbound(record);
                self.dependency.remove_inbound(record);
                self.records.remove(record);
            }
            ObjectKey::Collection(collection) => {
                self.item.remove_outbound(collection);
                self.collections.remove(collection);
            }
        }
        Ok(())
    }

    // Tasks, locks and blocks.

    /// Next value of the monotonic task creation counter.
    pub fn next_task_seq(&mut self) -> u64 {
        self.task_seq += 1;
        self.task_seq
    }

    pub fn insert_task(&mut self, task: Task) {
        self.tasks.insert(task.key.clone(), task);
    }

    pub fn task(&self, key: &TaskKey) -> Option<&Task> {
        self.tasks.get(key)
    }

    pub fn task_mut(&mut self, key: &TaskKey) -> Option<&mut Task> {
        self.tasks.get_mut(key)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn remove_task(&mut self, key: &TaskKey) -> Option<Task> {
        self.lock.remove_outbound(key);
        self.block.remove_outbound(key);
        self.block.remove_inbound(key);
        self.tasks.remove(key)
    }

    /// Create a lock edge, enforcing write-lock exclusivity against every
    /// other holder of the resource.
    pub fn add_lock(
        &mut self,
        task: &TaskKey,
        resource: ResourceKey,
        mode: LockMode,
    ) -> Result<(), StoreError> {
        for holder in self.lock.inbound(&resource) {
            if holder == task {
                continue;
            }
            let held = self
                .lock
                .get(holder, &resource)
                .copied()
                .unwrap_or(LockMode::Write);
            if mode.conflicts_with(held) {
                return Err(StoreError::LockConflict {
                    resource,
                    mode,
                    holder: holder.clone(),
                });
            }
        }
        self.lock.insert(task.clone(), resource, mode);
        Ok(())
    }

    pub fn has_lock(&self, task: &TaskKey, resource: &ResourceKey) -> bool {
        self.lock.contains(task, resource)
    }

    /// Every lock currently held on a resource.
    pub fn locks_on(&self, resource: &ResourceKey) -> Vec<(TaskKey, LockMode)> {
        self.lock
            .inbound(resource)
            .filter_map(|task| {
                self.lock
                    .get(task, resource)
                    .map(|mode| (task.clone(), *mode))
            })
            .collect()
    }

    pub fn locks_of(&self, task: &TaskKey) -> impl Iterator<Item = (&ResourceKey, &LockMode)> {
        self.lock.outbound(task).map(|(resource, mode)| (resource, mode))
    }

    /// Drop every lock a task holds, returning the freed resources.
    pub fn remove_locks_of(&mut self, task: &TaskKey) -> Vec<ResourceKey> {
        self.lock
            .remove_outbound(task)
            .into_iter()
            .map(|(resource, _)| resource)
            .collect()
    }

    pub fn remove_lock(&mut self, task: &TaskKey, resource: &ResourceKey) -> bool {
        self.lock.remove(task, resource).is_some()
    }

    pub fn lock_edges(&self) -> impl Iterator<Item = (&TaskKey, &ResourceKey, &LockMode)> {
        self.lock.iter()
    }

    pub fn add_block(&mut self, from: TaskKey, to: TaskKey) {
        self.block.insert(from, to, ());
    }

    /// Tasks this task is waiting on.
    pub fn blocks_of(&self, task: &TaskKey) -> impl Iterator<Item = &TaskKey> {
        self.block.outbound(task).map(|(target, _)| target)
    }

    /// Tasks waiting on this task.
    pub fn blocked_by(&self, target: &TaskKey) -> impl Iterator<Item = &TaskKey> {
        self.block.inbound(target)
    }

    pub fn remove_blocks_of(&mut self, task: &TaskKey) -> Vec<TaskKey> {
        self.block
            .remove_outbound(task)
            .into_iter()
            .map(|(target, _)| target)
            .collect()
    }

    pub fn remove_blocks_to(&mut self, target: &TaskKey) -> Vec<TaskKey> {
        self.block.remove_inbound(target)
    }

    pub fn remove_block(&mut self, from: &TaskKey, to: &TaskKey) -> bool {
        self.block.remove(from, to).is_some()
    }

    pub fn block_edges(&self) -> impl Iterator<Item = (&TaskKey, &TaskKey)> {
        self.block.iter().map(|(from, to, _)| (from, to))
    }
}

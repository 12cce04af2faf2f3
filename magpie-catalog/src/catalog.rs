// SPDX-License-Identifier: MIT OR Apache-2.0

use magpie_auth::PermissionResolver;
use magpie_core::{
    Allocation, Group, GroupKey, ObjectKey, OwnerKey, PermMask, Project, ProjectKey, RepoKey,
    UserKey,
};
use magpie_store::{Graph, GraphStore, RetryPolicy};
use magpie_task::TaskManager;

use crate::error::CatalogError;

/// Facade over one graph store: the permission resolver, the task manager
/// and the catalog operations that tie them together.
///
/// Constructed per embedding (or per test) around an explicit store handle;
/// there is no global instance.
pub struct Catalog {
    pub(crate) store: GraphStore,
    pub(crate) resolver: PermissionResolver,
    pub(crate) tasks: TaskManager,
    pub(crate) retry: RetryPolicy,
}

impl Catalog {
    pub fn new(store: GraphStore) -> Self {
        let tasks = TaskManager::new(store.clone());
        Self {
            store,
            resolver: PermissionResolver::new(),
            tasks,
            retry: RetryPolicy::default(),
        }
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    /// The lifecycle manager; executors use it to claim and complete the
    /// tasks built by this catalog.
    pub fn tasks(&self) -> &TaskManager {
        &self.tasks
    }

    /// Create a project owned by the calling user.
    pub fn create_project(
        &mut self,
        client: &UserKey,
        title: &str,
    ) -> Result<ProjectKey, CatalogError> {
        let key = ProjectKey::random();
        let project = Project::new(key.clone(), title);
        let client = client.clone();
        self.store
            .transaction(&self.retry, |graph| -> Result<(), CatalogError> {
                graph.insert_project(project.clone());
                graph.set_owner(project.key.clone(), OwnerKey::User(client.clone()));
                Ok(())
            })?;
        Ok(key)
    }

    /// Add an admin to a project. Only the project owner may do this.
    pub fn add_project_admin(
        &mut self,
        client: &UserKey,
        project: &ProjectKey,
        admin: &UserKey,
    ) -> Result<(), CatalogError> {
        self.store.transaction(&self.retry, |graph| {
            let owner = graph.owner_of(&project.clone().into());
            if !matches!(owner, Some(OwnerKey::User(user)) if user == client) {
                return Err(CatalogError::PermissionDenied);
            }
            graph.add_admin(project.clone(), admin.clone());
            Ok(())
        })
    }

    /// Create a group owned by the calling user.
    pub fn create_group(
        &mut self,
        client: &UserKey,
        title: &str,
        members: &[UserKey],
    ) -> Result<GroupKey, CatalogError> {
        let key = GroupKey::random();
        let group = Group::new(key.clone(), title);
        self.store
            .transaction(&self.retry, |graph| -> Result<(), CatalogError> {
                graph.insert_group(group.clone());
                graph.set_owner(group.key.clone(), OwnerKey::User(client.clone()));
                for member in members {
                    graph.add_member(group.key.clone(), member.clone());
                }
                Ok(())
            })?;
        Ok(key)
    }

    /// Grant or resize an allocation out-of-band. Live resizes under load go
    /// through the allocation-change task instead.
    pub fn set_allocation(
        &mut self,
        owner: &OwnerKey,
        repo: &RepoKey,
        allocation: Allocation,
    ) -> Result<(), CatalogError> {
        self.store.transaction(&self.retry, |graph| {
            if graph.repo(repo).is_none() {
                return Err(CatalogError::Store(magpie_store::StoreError::NotFound(
                    repo.clone().into(),
                )));
            }
            graph.set_allocation(owner.clone(), repo.clone(), allocation);
            Ok(())
        })
    }
}

/// Enforce `required` on `object`, mapping every non-visible failure to the
/// uniform `PermissionDenied`.
pub(crate) fn gate(
    resolver: &mut PermissionResolver,
    graph: &Graph,
    client: &UserKey,
    object: &ObjectKey,
    required: PermMask,
) -> Result<(), CatalogError> {
    resolver
        .enforce(graph, client, object, required)
        .map_err(CatalogError::from)
}

/// Require full administrative control (owner, project owner or project
/// admin) over an object.
pub(crate) fn gate_admin(
    resolver: &mut PermissionResolver,
    graph: &Graph,
    client: &UserKey,
    object: &ObjectKey,
) -> Result<(), CatalogError> {
    let mask = resolver
        .resolve(graph, client, object)
        .map_err(CatalogError::from)?;
    if mask == PermMask::ALL {
        Ok(())
    } else {
        Err(CatalogError::PermissionDenied)
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0

//! Construction of transfer, deletion and ownership tasks.
//!
//! Each operation gates on the resolver, derives the lock-request set for
//! its kind and submits the spec to admission. Execution (the actual data
//! movement) happens externally; completion flows back through the task
//! manager.

use magpie_core::{
    ObjectKey, OwnerKey, PermMask, ProjectKey, RecordKey, RepoKey, TaskKind, UserKey, VertexKey,
};
use magpie_store::Graph;
use magpie_task::{Admission, TaskSpec};
use tracing::debug;

use crate::catalog::{Catalog, gate, gate_admin};
use crate::error::CatalogError;

impl Catalog {
    /// Stage a download of raw data. Requires `read-data` on every record;
    /// takes read locks so concurrent gets share, while puts and deletes
    /// queue behind.
    pub fn data_get(
        &mut self,
        client: &UserKey,
        records: &[RecordKey],
    ) -> Result<Admission, CatalogError> {
        let mut spec = TaskSpec::new(TaskKind::DataGet, client.clone());
        {
            let graph = self.store.read_graph();
            for record in records {
                let object = ObjectKey::Record(record.clone());
                gate(&mut self.resolver, &graph, client, &object, PermMask::READ_DATA)?;
                spec = spec.read(record.clone());
            }
        }
        let admission = self.tasks.admit(spec)?;
        debug!(task = %admission.task(), records = records.len(), "data get staged");
        Ok(admission)
    }

    /// Stage an upload into a record. Requires `write-data`; takes a write
    /// lock on the record.
    pub fn data_put(
        &mut self,
        client: &UserKey,
        record: &RecordKey,
    ) -> Result<Admission, CatalogError> {
        {
            let graph = self.store.read_graph();
            let object = ObjectKey::Record(record.clone());
            gate(&mut self.resolver, &graph, client, &object, PermMask::WRITE_DATA)?;
        }
        let spec = TaskSpec::new(TaskKind::DataPut, client.clone()).write(record.clone());
        Ok(self.tasks.admit(spec)?)
    }

    /// Stage deletion of records. Requires `delete` on each; write-locks the
    /// records and their owning principals (allocation counters change when
    /// the purge lands).
    pub fn delete_records(
        &mut self,
        client: &UserKey,
        records: &[RecordKey],
    ) -> Result<Admission, CatalogError> {
        let mut spec = TaskSpec::new(TaskKind::RecordDelete, client.clone());
        {
            let graph = self.store.read_graph();
            let mut owners: Vec<OwnerKey> = Vec::new();
            for record in records {
                let object = ObjectKey::Record(record.clone());
                gate(&mut self.resolver, &graph, client, &object, PermMask::DELETE)?;
                spec = spec.write(record.clone());
                if let Some(owner) = graph.owner_of(&object.into()) {
                    if !owners.contains(owner) {
                        owners.push(owner.clone());
                    }
                }
            }
            for owner in owners {
                spec = spec.write(owner);
            }
        }
        Ok(self.tasks.admit(spec)?)
    }

    /// Stage an ownership change. Requires administrative control over each
    /// record and an existing allocation for the new owner on the record's
    /// repo; write-locks the records and both principals.
    pub fn change_owner(
        &mut self,
        client: &UserKey,
        records: &[RecordKey],
        new_owner: &OwnerKey,
    ) -> Result<Admission, CatalogError> {
        let mut spec = TaskSpec::new(TaskKind::OwnerChange, client.clone());
        {
            let graph = self.store.read_graph();
            let mut owners: Vec<OwnerKey> = vec![new_owner.clone()];
            for record in records {
                let object = ObjectKey::Record(record.clone());
                gate_admin(&mut self.resolver, &graph, client, &object)?;

                let repo = graph
                    .location_of(record)
                    .cloned()
                    .ok_or(CatalogError::PermissionDenied)?;
                let allocation = graph.allocation(new_owner, &repo).copied().ok_or_else(|| {
                    CatalogError::NoAllocation {
                        owner: new_owner.clone(),
                        repo: repo.clone(),
                    }
                })?;
                let size = graph.record(record).map(|r| r.size).unwrap_or(0);
                if !allocation.fits(size) {
                    return Err(CatalogError::AllocationExceeded { repo });
                }

                spec = spec.write(record.clone());
                if let Some(owner) = graph.owner_of(&object.into()) {
                    if !owners.contains(owner) {
                        owners.push(owner.clone());
                    }
                }
            }
            for owner in owners {
                spec = spec.write(owner);
            }
        }
        Ok(self.tasks.admit(spec)?)
    }

    /// Stage an allocation resize for a principal on a repo. The caller must
    /// be that principal (or control it); write-locks both the principal and
    /// the repo so transfers charging the allocation queue behind.
    pub fn change_allocation(
        &mut self,
        client: &UserKey,
        owner: &OwnerKey,
        repo: &RepoKey,
    ) -> Result<Admission, CatalogError> {
        {
            let graph = self.store.read_graph();
            if !controls_principal(&graph, client, owner) {
                return Err(CatalogError::PermissionDenied);
            }
            if graph.allocation(owner, repo).is_none() {
                return Err(CatalogError::NoAllocation {
                    owner: owner.clone(),
                    repo: repo.clone(),
                });
            }
        }
        let spec = TaskSpec::new(TaskKind::AllocationChange, client.clone())
            .write(owner.clone())
            .write(repo.clone());
        Ok(self.tasks.admit(spec)?)
    }

    /// Stage deletion of a project and everything it owns. Owner or admin
    /// only; write-locks the project and each owned record or collection.
    pub fn delete_project(
        &mut self,
        client: &UserKey,
        project: &ProjectKey,
    ) -> Result<Admission, CatalogError> {
        let mut spec = TaskSpec::new(TaskKind::ProjectDelete, client.clone());
        {
            let graph = self.store.read_graph();
            if graph.project(project).is_none() {
                return Err(CatalogError::PermissionDenied);
            }
            let owner = OwnerKey::Project(project.clone());
            if !controls_principal(&graph, client, &owner) {
                return Err(CatalogError::PermissionDenied);
            }

            spec = spec.write(project.clone());
            for vertex in graph.owned_by(&owner) {
                match vertex {
                    VertexKey::Record(record) => spec = spec.write(record.clone()),
                    VertexKey::Collection(collection) => spec = spec.write(collection.clone()),
                    _ => {}
                }
            }
        }
        Ok(self.tasks.admit(spec)?)
    }
}

/// Whether `client` controls a principal: is that user, or owns/administers
/// that project.
fn controls_principal(graph: &Graph, client: &UserKey, owner: &OwnerKey) -> bool {
    match owner {
        OwnerKey::User(user) => user == client,
        OwnerKey::Project(project) => {
            if graph.is_admin(project, client) {
                return true;
            }
            matches!(
                graph.owner_of(&project.clone().into()),
                Some(OwnerKey::User(user)) if user == client
            )
        }
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record operations: creation, gated reads, sharing and publication.

use magpie_core::{
    AclEntry, CollectionKey, Dependency, ObjectKey, OwnerKey, PermMask, PrincipalKey, Record,
    RecordKey, RepoKey, UserKey,
};
use tracing::debug;

use crate::catalog::{Catalog, gate};
use crate::error::CatalogError;

impl Catalog {
    /// Create a record on `repo`, optionally linked under a parent
    /// collection.
    ///
    /// With a parent, the caller needs `create` capability there and the
    /// record inherits the parent's owner (items share their container's
    /// owner); without one it is owned by the caller. The owner's repo
    /// allocation is charged for the new record.
    pub fn create_record(
        &mut self,
        client: &UserKey,
        title: &str,
        repo: &RepoKey,
        parent: Option<&CollectionKey>,
    ) -> Result<RecordKey, CatalogError> {
        let resolver = &mut self.resolver;
        self.store.transaction(&self.retry, |graph| {
            let owner = match parent {
                Some(parent) => {
                    let container = ObjectKey::Collection(parent.clone());
                    gate(resolver, graph, client, &container, PermMask::CREATE)?;
                    graph
                        .owner_of(&container.clone().into())
                        .cloned()
                        .ok_or(CatalogError::PermissionDenied)?
                }
                None => OwnerKey::User(client.clone()),
            };

            let allocation =
                graph
                    .allocation(&owner, repo)
                    .copied()
                    .ok_or_else(|| CatalogError::NoAllocation {
                        owner: owner.clone(),
                        repo: repo.clone(),
                    })?;
            if !allocation.fits(0) {
                return Err(CatalogError::AllocationExceeded { repo: repo.clone() });
            }

            let key = RecordKey::random();
            graph.insert_record(Record::new(key.clone(), title));
            graph.set_owner(key.clone(), owner.clone());
            graph.set_location(key.clone(), repo.clone());
            if let Some(allocation) = graph.allocation_mut(&owner, repo) {
                allocation.rec_count += 1;
            }
            if let Some(parent) = parent {
                graph.link_item(parent, key.clone().into())?;
            }

            debug!(record = %key, %owner, "record created");
            Ok(key)
        })
    }

    /// Read a record document. Requires `read-record`.
    pub fn read_record(
        &mut self,
        client: &UserKey,
        record: &RecordKey,
    ) -> Result<Record, CatalogError> {
        let graph = self.store.read_graph();
        let object = ObjectKey::Record(record.clone());
        gate(&mut self.resolver, &graph, client, &object, PermMask::READ_RECORD)?;
        graph
            .record(record)
            .cloned()
            .ok_or(CatalogError::PermissionDenied)
    }

    /// Set or replace an ACL entry. Requires `share`.
    pub fn share(
        &mut self,
        client: &UserKey,
        object: &ObjectKey,
        principal: PrincipalKey,
        entry: AclEntry,
    ) -> Result<(), CatalogError> {
        let resolver = &mut self.resolver;
        self.store.transaction(&self.retry, |graph| {
            gate(resolver, graph, client, object, PermMask::SHARE)?;
            graph.set_acl(object, principal, entry)?;
            Ok(())
        })
    }

    /// Publish (or unpublish) an object under a topic. Requires `share`.
    pub fn publish(
        &mut self,
        client: &UserKey,
        object: &ObjectKey,
        topic: Option<String>,
    ) -> Result<(), CatalogError> {
        let resolver = &mut self.resolver;
        self.store.transaction(&self.retry, |graph| {
            gate(resolver, graph, client, object, PermMask::SHARE)?;
            graph.set_topic(object, topic)?;
            Ok(())
        })
    }

    /// Record a provenance relationship between two records. Requires
    /// `write-record` on the source and `read-record` on the referenced
    /// record.
    pub fn add_dependency(
        &mut self,
        client: &UserKey,
        from: &RecordKey,
        to: &RecordKey,
        kind: Dependency,
    ) -> Result<(), CatalogError> {
        let resolver = &mut self.resolver;
        self.store.transaction(&self.retry, |graph| {
            let source = ObjectKey::Record(from.clone());
            let target = ObjectKey::Record(to.clone());
            gate(resolver, graph, client, &source, PermMask::WRITE_RECORD)?;
            gate(resolver, graph, client, &target, PermMask::READ_RECORD)?;
            graph.add_dependency(from.clone(), to.clone(), kind);
            Ok(())
        })
    }

    /// Executor-side finalization of a successful delete task: drop the
    /// record vertices and release their allocation charges.
    pub fn purge_records(&mut self, records: &[RecordKey]) -> Result<(), CatalogError> {
        self.store.transaction(&self.retry, |graph| {
            for record in records {
                let object = ObjectKey::Record(record.clone());
                let owner = graph.owner_of(&object.clone().into()).cloned();
                let repo = graph.location_of(record).cloned();
                let size = graph.record(record).map(|r| r.size).unwrap_or(0);

                graph.remove_object(&object)?;

                if let (Some(owner), Some(repo)) = (owner, repo)
                    && let Some(allocation) = graph.allocation_mut(&owner, &repo)
                {
                    allocation.rec_count = allocation.rec_count.saturating_sub(1);
                    allocation.data_size = allocation.data_size.saturating_sub(size);
                }
            }
            Ok(())
        })
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0

//! Alias binding and lookup.
//!
//! Alias keys are namespaced by the owner of the aliased object, so two
//! owners can both call a record "thesis" without colliding. Lookup requires
//! `list` on the target; an unknown alias answers exactly like a hidden one.

use magpie_core::{Alias, AliasKey, ObjectKey, PermMask, UserKey};

use crate::catalog::{Catalog, gate};
use crate::error::CatalogError;

impl Catalog {
    /// Bind a human-readable alias to an object. Requires `write-record` on
    /// the target; the alias shares the target's owner namespace.
    pub fn bind_alias(
        &mut self,
        client: &UserKey,
        object: &ObjectKey,
        name: &str,
    ) -> Result<AliasKey, CatalogError> {
        let resolver = &mut self.resolver;
        self.store.transaction(&self.retry, |graph| {
            gate(resolver, graph, client, object, PermMask::WRITE_RECORD)?;
            let owner = graph
                .owner_of(&object.clone().into())
                .cloned()
                .ok_or(CatalogError::PermissionDenied)?;

            let key = AliasKey::namespaced(&owner, name);
            graph.bind_alias(Alias { key: key.clone() }, object.clone())?;
            Ok(key)
        })
    }

    /// Resolve an alias to its object. Requires `list` on the target.
    pub fn resolve_alias(
        &mut self,
        client: &UserKey,
        alias: &AliasKey,
    ) -> Result<ObjectKey, CatalogError> {
        let graph = self.store.read_graph();
        let target = graph
            .alias_target(alias)
            .cloned()
            .ok_or(CatalogError::PermissionDenied)?;
        gate(&mut self.resolver, &graph, client, &target, PermMask::LIST)?;
        Ok(target)
    }

    /// Remove an alias. Requires `write-record` on the target.
    pub fn unbind_alias(
        &mut self,
        client: &UserKey,
        alias: &AliasKey,
    ) -> Result<(), CatalogError> {
        let resolver = &mut self.resolver;
        self.store.transaction(&self.retry, |graph| {
            let target = graph
                .alias_target(alias)
                .cloned()
                .ok_or(CatalogError::PermissionDenied)?;
            gate(resolver, graph, client, &target, PermMask::WRITE_RECORD)?;
            graph.unbind_alias(alias);
            Ok(())
        })
    }
}

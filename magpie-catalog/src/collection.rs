// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collection operations: creation, listing and containment links.

use std::collections::HashSet;

use magpie_core::{Collection, CollectionKey, ObjectKey, OwnerKey, PermMask, UserKey};
use magpie_store::Graph;

use crate::catalog::{Catalog, gate};
use crate::error::CatalogError;

impl Catalog {
    /// Create a collection, optionally inside a parent collection (which
    /// requires `create` there and inherits its owner).
    pub fn create_collection(
        &mut self,
        client: &UserKey,
        title: &str,
        parent: Option<&CollectionKey>,
    ) -> Result<CollectionKey, CatalogError> {
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

            let key = CollectionKey::random();
            graph.insert_collection(Collection::new(key.clone(), title));
            graph.set_owner(key.clone(), owner);
            if let Some(parent) = parent {
                graph.link_item(parent, key.clone().into())?;
            }
            Ok(key)
        })
    }

    /// List the children of a collection. Requires `list`.
    pub fn list_children(
        &mut self,
        client: &UserKey,
        collection: &CollectionKey,
    ) -> Result<Vec<ObjectKey>, CatalogError> {
        let graph = self.store.read_graph();
        let container = ObjectKey::Collection(collection.clone());
        gate(&mut self.resolver, &graph, client, &container, PermMask::LIST)?;
        Ok(graph.children_of(collection).cloned().collect())
    }

    /// Link an object under a collection. Requires `link` on the container
    /// and rejects links that would close a containment loop.
    ///
    /// Items can only live in containers that share their owner.
    pub fn link(
        &mut self,
        client: &UserKey,
        parent: &CollectionKey,
        child: ObjectKey,
    ) -> Result<(), CatalogError> {
        let resolver = &mut self.resolver;
        self.store.transaction(&self.retry, |graph| {
            let container = ObjectKey::Collection(parent.clone());
            gate(resolver, graph, client, &container, PermMask::LINK)?;
            if !graph.has_object(&child) {
                return Err(CatalogError::PermissionDenied);
            }

            let parent_owner = graph.owner_of(&container.clone().into());
            let child_owner = graph.owner_of(&child.clone().into());
            if parent_owner != child_owner {
                return Err(CatalogError::InvalidLink(
                    "container and item must share an owner".to_string(),
                ));
            }
            if closes_containment_loop(graph, parent, &child) {
                return Err(CatalogError::InvalidLink(
                    "link would close a containment loop".to_string(),
                ));
            }

            graph.link_item(parent, child)?;
            Ok(())
        })
    }

    /// Unlink an object from its container. Requires `link` on the
    /// container.
    pub fn unlink(
        &mut self,
        client: &UserKey,
        parent: &CollectionKey,
        child: &ObjectKey,
    ) -> Result<(), CatalogError> {
        let resolver = &mut self.resolver;
        self.store.transaction(&self.retry, |graph| {
            let container = ObjectKey::Collection(parent.clone());
            gate(resolver, graph, client, &container, PermMask::LINK)?;
            if !graph.unlink_item(parent, child) {
                return Err(CatalogError::PermissionDenied);
            }
            Ok(())
        })
    }
}

/// Linking `child` under `parent` closes a loop iff `child` is a collection
/// on `parent`'s ancestor chain (or the chain is already corrupt).
fn closes_containment_loop(graph: &Graph, parent: &CollectionKey, child: &ObjectKey) -> bool {
    let ObjectKey::Collection(child) = child else {
        return false;
    };

    let mut visited: HashSet<CollectionKey> = HashSet::new();
    let mut current = Some(parent.clone());
    while let Some(collection) = current {
        if collection == *child {
            return true;
        }
        if !visited.insert(collection.clone()) {
            return true;
        }
        current = graph
            .parent_of(&ObjectKey::Collection(collection))
            .cloned();
    }
    false
}

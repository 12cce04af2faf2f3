// SPDX-License-Identifier: MIT OR Apache-2.0

//! Property-graph persistence for the magpie catalog.
//!
//! [`Graph`] is the document-graph engine: typed vertex collections plus the
//! named edge relations of the catalog schema, with point reads/writes and
//! one-hop traversal in both directions. [`GraphStore`] wraps a graph in a
//! clone-able shared handle and provides closure-scoped atomic transactions:
//! a transaction runs against a staged copy under the exclusive write guard
//! and is committed only when the closure succeeds, so a failing operation
//! never leaves partial state behind.
//!
//! The store enforces local structural invariants at edge-insertion time
//! (exactly one owner, alias 1:1 binding, single containment parent,
//! write-lock exclusivity); multi-edge policies such as block-graph
//! acyclicity belong to the callers that own those edges.

mod edge_map;
mod error;
mod graph;
mod store;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use edge_map::EdgeMap;
pub use error::StoreError;
pub use graph::Graph;
pub use store::{GraphStore, RetryPolicy};

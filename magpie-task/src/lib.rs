// SPDX-License-Identifier: MIT OR Apache-2.0

//! Task admission and lifecycle management over the catalog graph.
//!
//! A task declares the set of resources it must hold, each in read or write
//! mode. Admission grants lock edges for uncontended resources, records
//! block edges towards every conflicting task and assigns the initial
//! BLOCKED/READY state, all inside one atomic store transaction. Completion
//! removes the task's lock and block edges and re-evaluates waiting tasks in
//! creation order, promoting a waiter only once all of its claims can be
//! granted together.
//!
//! Blocking is a resource-ordering construct: a completed task's failure
//! never propagates to the tasks that waited on it.

mod admission;
mod cycles;
mod error;
mod lifecycle;
mod sweep;
#[cfg(test)]
mod tests;

pub use admission::{Admission, TaskSpec};
pub use error::TaskError;
pub use lifecycle::TaskManager;
pub use sweep::SweepReport;

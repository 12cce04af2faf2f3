// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared graph handle with closure-scoped atomic transactions.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError};
use std::thread;
use std::time::Duration;

use crate::error::StoreError;
use crate::graph::Graph;

/// Bounded retry with exponential backoff for write-guard contention.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 6,
            base_delay: Duration::from_millis(10),
        }
    }
}

impl RetryPolicy {
    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

/// Clone-able handle to a shared [`Graph`].
///
/// Every caller receives its own clone of the handle; there is no process
/// global, so isolated instances (one per test, one per embedded deployment)
/// are trivial to construct.
#[derive(Clone, Debug, Default)]
pub struct GraphStore {
    inner: Arc<RwLock<Graph>>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_graph(graph: Graph) -> Self {
        Self {
            inner: Arc::new(RwLock::new(graph)),
        }
    }

    /// Obtain a read guard on the graph.
    pub fn read_graph(&self) -> RwLockReadGuard<'_, Graph> {
        self.inner
            .read()
            .expect("acquire shared read access on graph store")
    }

    /// Obtain a write guard on the graph, bypassing the transaction staging.
    /// Intended for setup and test fixtures; operational mutations should go
    /// through [`transaction`](Self::transaction).
    pub fn write_graph(&self) -> RwLockWriteGuard<'_, Graph> {
        self.inner
            .write()
            .expect("acquire exclusive write access on graph store")
    }

    /// Run a read-only closure under the shared guard.
    pub fn with_read<T>(&self, f: impl FnOnce(&Graph) -> T) -> T {
        f(&self.read_graph())
    }

    /// Run a closure as one atomic transaction.
    ///
    /// The closure executes against a staged copy of the graph while the
    /// exclusive write guard is held; the copy replaces the live graph only
    /// when the closure returns `Ok`, so an error mid-closure rolls the whole
    /// transaction back. Guard contention is retried per `policy` before
    /// surfacing as [`StoreError::Busy`].
    pub fn transaction<T, E>(
        &self,
        policy: &RetryPolicy,
        f: impl FnOnce(&mut Graph) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut attempt = 0;
        let mut guard = loop {
            match self.inner.try_write() {
                Ok(guard) => break guard,
                Err(TryLockError::Poisoned(_)) => {
                    panic!("acquire exclusive write access on graph store")
                }
                Err(TryLockError::WouldBlock) => {
                    if attempt >= policy.attempts {
                        return Err(StoreError::Busy.into());
                    }
                    thread::sleep(policy.delay(attempt));
                    attempt += 1;
                }
            }
        };

        let mut staged = guard.clone();
        let value = f(&mut staged)?;
        *guard = staged;
        Ok(value)
    }
}

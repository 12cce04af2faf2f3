// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::HashMap;

use magpie_core::{
    LockMode, Outcome, ResourceKey, TaskKey, TaskKind, TaskStatus, UserKey,
};
use magpie_store::{Graph, GraphStore, test_utils};
use petgraph::algo::is_cyclic_directed;
use petgraph::prelude::DiGraphMap;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::admission::{Admission, TaskSpec};
use crate::error::TaskError;
use crate::lifecycle::TaskManager;

fn seeded_store(records: &[&str]) -> (GraphStore, UserKey, Vec<ResourceKey>) {
    let mut graph = Graph::new();
    let ada = test_utils::user(&mut graph, "ada");
    let resources = records
        .iter()
        .map(|id| ResourceKey::Record(test_utils::record(&mut graph, id, ada.clone())))
        .collect();
    (GraphStore::with_graph(graph), ada, resources)
}

fn spec(kind: TaskKind, client: &UserKey) -> TaskSpec {
    TaskSpec::new(kind, client.clone())
}

#[test]
fn uncontended_tasks_are_ready_immediately() {
    let (store, ada, resources) = seeded_store(&["x1", "x2"]);
    let manager = TaskManager::new(store.clone());

    let admission = manager
        .admit(
            spec(TaskKind::DataGet, &ada)
                .read(resources[0].clone())
                .read(resources[1].clone()),
        )
        .expect("admit");
    assert!(admission.is_ready());

    let graph = store.read_graph();
    assert!(graph.has_lock(admission.task(), &resources[0]));
    assert!(graph.has_lock(admission.task(), &resources[1]));
}

#[test]
fn write_lock_handoff_on_completion() {
    // Task A write-locks X and runs; task B requesting X blocks with an edge
    // towards A; completing A hands X over and readies B.
    let (store, ada, resources) = seeded_store(&["x1"]);
    let manager = TaskManager::new(store.clone());
    let x = resources[0].clone();

    let a = manager
        .admit(spec(TaskKind::DataPut, &ada).write(x.clone()))
        .expect("admit a");
    assert!(a.is_ready());

    let b = manager
        .admit(spec(TaskKind::DataPut, &ada).write(x.clone()))
        .expect("admit b");
    let Admission::Blocked { task: b_key, blocking } = b else {
        panic!("second writer must block");
    };
    assert_eq!(blocking, vec![a.task().clone()]);

    manager.claim(a.task()).expect("claim a");
    let promoted = manager.complete(a.task(), Outcome::Succeeded).expect("complete a");
    assert_eq!(promoted, vec![b_key.clone()]);
    assert_eq!(manager.status(&b_key), Ok(TaskStatus::Ready));

    let graph = store.read_graph();
    assert!(graph.has_lock(&b_key, &x));
    assert_eq!(graph.blocks_of(&b_key).count(), 0);
    // Invariant: the terminal task holds no outgoing lock or block edges.
    assert_eq!(graph.locks_of(a.task()).count(), 0);
}

#[test]
fn shared_reads_coexist_and_exclude_writers() {
    let (store, ada, resources) = seeded_store(&["x1"]);
    let manager = TaskManager::new(store);
    let x = resources[0].clone();

    let r1 = manager
        .admit(spec(TaskKind::DataGet, &ada).read(x.clone()))
        .expect("reader one");
    let r2 = manager
        .admit(spec(TaskKind::DataGet, &ada).read(x.clone()))
        .expect("reader two");
    assert!(r1.is_ready());
    assert!(r2.is_ready());

    let w = manager
        .admit(spec(TaskKind::DataPut, &ada).write(x.clone()))
        .expect("writer");
    let Admission::Blocked { task: w_key, blocking } = w else {
        panic!("writer must block behind readers");
    };
    assert_eq!(blocking.len(), 2);

    // The writer wakes only after both readers are done.
    manager.claim(r1.task()).expect("claim r1");
    assert!(manager.complete(r1.task(), Outcome::Succeeded).expect("complete r1").is_empty());
    assert_eq!(manager.status(&w_key), Ok(TaskStatus::Blocked));

    manager.claim(r2.task()).expect("claim r2");
    let promoted = manager.complete(r2.task(), Outcome::Succeeded).expect("complete r2");
    assert_eq!(promoted, vec![w_key]);
}

#[test]
fn waiters_are_served_in_creation_order() {
    // C arrives after B but must not overtake it, even though the block
    // edges of both point at the running holder A.
    let (store, ada, resources) = seeded_store(&["x1"]);
    let manager = TaskManager::new(store.clone());
    let x = resources[0].clone();

    let a = manager
        .admit(spec(TaskKind::DataPut, &ada).write(x.clone()))
        .expect("admit a");
    let b = manager
        .admit(spec(TaskKind::DataPut, &ada).write(x.clone()))
        .expect("admit b");
    let c = manager
        .admit(spec(TaskKind::DataPut, &ada).write(x.clone()))
        .expect("admit c");

    // C queues behind both the holder and the older waiter.
    let Admission::Blocked { task: c_key, blocking } = c else {
        panic!("c must block");
    };
    assert!(blocking.contains(a.task()));
    assert!(blocking.contains(b.task()));

    manager.claim(a.task()).expect("claim a");
    let promoted = manager.complete(a.task(), Outcome::Succeeded).expect("complete a");
    assert_eq!(promoted, vec![b.task().clone()]);
    assert_eq!(manager.status(&c_key), Ok(TaskStatus::Blocked));

    // After promotion the younger waiter is re-anchored to the new holder.
    {
        let graph = store.read_graph();
        let targets: Vec<_> = graph.blocks_of(&c_key).cloned().collect();
        assert_eq!(targets, vec![b.task().clone()]);
    }

    manager.claim(b.task()).expect("claim b");
    let promoted = manager.complete(b.task(), Outcome::Succeeded).expect("complete b");
    assert_eq!(promoted, vec![c_key]);
}

#[test]
fn promotion_requires_all_resources_at_once() {
    // D needs X and Y. X frees up first but Y is still held, so D must stay
    // blocked and must not hoard X in the meantime... it holds what it was
    // granted at admission and nothing more until both are free.
    let (store, ada, resources) = seeded_store(&["x1", "y1"]);
    let manager = TaskManager::new(store.clone());
    let x = resources[0].clone();
    let y = resources[1].clone();

    let holder_x = manager
        .admit(spec(TaskKind::DataPut, &ada).write(x.clone()))
        .expect("holder x");
    let holder_y = manager
        .admit(spec(TaskKind::DataPut, &ada).write(y.clone()))
        .expect("holder y");

    let d = manager
        .admit(spec(TaskKind::OwnerChange, &ada).write(x.clone()).write(y.clone()))
        .expect("admit d");
    let d_key = d.task().clone();
    assert_eq!(manager.status(&d_key), Ok(TaskStatus::Blocked));

    manager.claim(holder_x.task()).expect("claim x holder");
    let promoted = manager
        .complete(holder_x.task(), Outcome::Succeeded)
        .expect("complete x holder");
    assert!(promoted.is_empty());
    assert_eq!(manager.status(&d_key), Ok(TaskStatus::Blocked));
    // X stays unclaimed by D until Y frees too.
    assert!(!store.read_graph().has_lock(&d_key, &x));

    manager.claim(holder_y.task()).expect("claim y holder");
    let promoted = manager
        .complete(holder_y.task(), Outcome::Succeeded)
        .expect("complete y holder");
    assert_eq!(promoted, vec![d_key.clone()]);

    let graph = store.read_graph();
    assert!(graph.has_lock(&d_key, &x));
    assert!(graph.has_lock(&d_key, &y));
}

#[test]
fn failure_of_a_blocker_does_not_propagate() {
    let (store, ada, resources) = seeded_store(&["x1"]);
    let manager = TaskManager::new(store);
    let x = resources[0].clone();

    let a = manager
        .admit(spec(TaskKind::DataPut, &ada).write(x.clone()))
        .expect("admit a");
    let b = manager
        .admit(spec(TaskKind::DataPut, &ada).write(x.clone()))
        .expect("admit b");

    manager.claim(a.task()).expect("claim a");
    let promoted = manager.complete(a.task(), Outcome::Failed).expect("fail a");
    // Blocking orders resources; it is not a success dependency.
    assert_eq!(promoted, vec![b.task().clone()]);
    assert_eq!(manager.status(b.task()), Ok(TaskStatus::Ready));
}

#[test]
fn cancelled_waiter_releases_its_place_in_line() {
    let (store, ada, resources) = seeded_store(&["x1"]);
    let manager = TaskManager::new(store.clone());
    let x = resources[0].clone();

    let a = manager
        .admit(spec(TaskKind::DataPut, &ada).write(x.clone()))
        .expect("admit a");
    let b = manager
        .admit(spec(TaskKind::DataPut, &ada).write(x.clone()))
        .expect("admit b");
    let c = manager
        .admit(spec(TaskKind::DataPut, &ada).write(x.clone()))
        .expect("admit c");

    let promoted = manager.cancel(b.task()).expect("cancel b");
    assert!(promoted.is_empty());
    assert_eq!(manager.status(b.task()), Ok(TaskStatus::Failed));
    assert_eq!(store.read_graph().blocks_of(b.task()).count(), 0);

    manager.claim(a.task()).expect("claim a");
    let promoted = manager.complete(a.task(), Outcome::Succeeded).expect("complete a");
    assert_eq!(promoted, vec![c.task().clone()]);
}

#[test]
fn running_tasks_cannot_be_cancelled() {
    let (store, ada, resources) = seeded_store(&["x1"]);
    let manager = TaskManager::new(store);

    let a = manager
        .admit(spec(TaskKind::DataPut, &ada).write(resources[0].clone()))
        .expect("admit");
    manager.claim(a.task()).expect("claim");

    assert!(matches!(
        manager.cancel(a.task()),
        Err(TaskError::Transition(_))
    ));
    // The executor path still works.
    manager.complete(a.task(), Outcome::Failed).expect("complete");
}

#[test]
fn admission_rejects_unknown_resources() {
    let (store, ada, _) = seeded_store(&["x1"]);
    let manager = TaskManager::new(store.clone());

    let ghost = ResourceKey::Record(magpie_core::RecordKey::new("ghost"));
    let before: Vec<TaskKey> = store.read_graph().tasks().map(|t| t.key.clone()).collect();
    let result = manager.admit(spec(TaskKind::DataGet, &ada).read(ghost.clone()));
    assert_eq!(result, Err(TaskError::ResourceNotFound(ghost)));

    // Nothing was created by the failed admission.
    let after: Vec<TaskKey> = store.read_graph().tasks().map(|t| t.key.clone()).collect();
    assert_eq!(before, after);
}

#[test]
fn sweep_clears_orphaned_locks_and_promotes_waiters() {
    let (store, ada, resources) = seeded_store(&["x1"]);
    let manager = TaskManager::new(store.clone());
    let x = resources[0].clone();

    let a = manager
        .admit(spec(TaskKind::DataPut, &ada).write(x.clone()))
        .expect("admit a");
    let b = manager
        .admit(spec(TaskKind::DataPut, &ada).write(x.clone()))
        .expect("admit b");

    // Simulate a crash that marked A terminal without releasing its edges.
    {
        let mut graph = store.write_graph();
        let task = graph.task_mut(a.task()).expect("task a");
        task.status = TaskStatus::Failed;
    }

    let report = manager.sweep().expect("sweep");
    assert!(!report.is_clean());
    assert_eq!(report.orphaned_locks.len(), 1);
    assert_eq!(report.promoted, vec![b.task().clone()]);
    assert!(report.stuck_tasks.is_empty());
    assert_eq!(manager.status(b.task()), Ok(TaskStatus::Ready));

    // A second pass finds nothing.
    let report = manager.sweep().expect("second sweep");
    assert!(report.is_clean());
}

#[test]
fn sweep_reports_stuck_tasks() {
    let (store, ada, resources) = seeded_store(&["x1"]);
    let manager = TaskManager::new(store.clone());
    let x = resources[0].clone();

    let _holder = manager
        .admit(spec(TaskKind::DataPut, &ada).write(x.clone()))
        .expect("admit holder");
    let b = manager
        .admit(spec(TaskKind::DataPut, &ada).write(x.clone()))
        .expect("admit b");

    // Corrupt the graph: the waiter loses its block edge while the holder
    // keeps the lock. Nothing will ever re-evaluate B.
    {
        let mut graph = store.write_graph();
        graph.remove_blocks_of(b.task());
    }

    let report = manager.sweep().expect("sweep");
    assert_eq!(report.stuck_tasks, vec![b.task().clone()]);
}

fn assert_scheduler_invariants(graph: &Graph) {
    // Write locks are exclusive, and no lock belongs to a terminal task.
    let mut per_resource: HashMap<ResourceKey, Vec<(TaskKey, LockMode)>> = HashMap::new();
    for (task, resource, mode) in graph.lock_edges() {
        let owner = graph.task(task).expect("lock owner exists");
        assert!(
            !owner.status.is_terminal(),
            "terminal task {task} still holds a lock"
        );
        per_resource
            .entry(resource.clone())
            .or_default()
            .push((task.clone(), *mode));
    }
    for (resource, locks) in per_resource {
        let writers = locks.iter().filter(|(_, m)| *m == LockMode::Write).count();
        assert!(writers <= 1, "{resource} has {writers} writers");
        if writers == 1 {
            assert_eq!(locks.len(), 1, "{resource} mixes a writer with readers");
        }
    }

    // The block graph stays acyclic, and no block edge touches a terminal
    // task.
    let mut blocks: DiGraphMap<u64, ()> = DiGraphMap::new();
    for (from, to) in graph.block_edges() {
        let from = graph.task(from).expect("block source exists");
        let to = graph.task(to).expect("block target exists");
        assert!(!from.status.is_terminal());
        assert!(!to.status.is_terminal());
        blocks.add_edge(from.seq, to.seq, ());
    }
    assert!(!is_cyclic_directed(&blocks), "block graph has a cycle");
}

#[test]
fn randomized_workloads_preserve_invariants_and_drain() {
    // Deterministic random workload over a small resource pool: admissions
    // interleaved with claims and completions, checking the lock and block
    // invariants after every step, then drained to empty.
    let mut rng = ChaCha8Rng::seed_from_u64(0x6d61_6770_6965);

    for round in 0..20 {
        let (store, ada, resources) = seeded_store(&["r0", "r1", "r2", "r3", "r4"]);
        let manager = TaskManager::new(store.clone());
        let mut live: Vec<TaskKey> = Vec::new();

        for step in 0..60 {
            let admit_now = live.is_empty() || rng.gen_bool(0.6);
            if admit_now {
                let mut spec = TaskSpec::new(TaskKind::DataGet, ada.clone());
                let claims = rng.gen_range(1..=3);
                let mut picked = resources.clone();
                picked.shuffle(&mut rng);
                for resource in picked.into_iter().take(claims) {
                    if rng.gen_bool(0.5) {
                        spec = spec.write(resource);
                    } else {
                        spec = spec.read(resource);
                    }
                }
                let admission = manager
                    .admit(spec)
                    .unwrap_or_else(|err| panic!("round {round} step {step}: {err}"));
                live.push(admission.task().clone());
            } else {
                let index = rng.gen_range(0..live.len());
                let key = live[index].clone();
                if manager.status(&key) == Ok(TaskStatus::Ready) {
                    manager.claim(&key).expect("claim ready task");
                    let outcome = if rng.gen_bool(0.8) {
                        Outcome::Succeeded
                    } else {
                        Outcome::Failed
                    };
                    manager.complete(&key, outcome).expect("complete task");
                    live.remove(index);
                }
            }

            assert_scheduler_invariants(&store.read_graph());
        }

        // Drain: every remaining task must eventually become ready. If the
        // scheduler ever wedges with only blocked tasks left, that is a bug.
        let mut guard = 0;
        while !live.is_empty() {
            let ready: Vec<TaskKey> = live
                .iter()
                .filter(|key| manager.status(key) == Ok(TaskStatus::Ready))
                .cloned()
                .collect();
            assert!(
                !ready.is_empty(),
                "round {round}: no ready task among {} live tasks",
                live.len()
            );
            for key in ready {
                manager.claim(&key).expect("claim during drain");
                manager.complete(&key, Outcome::Succeeded).expect("complete during drain");
                live.retain(|k| k != &key);
                assert_scheduler_invariants(&store.read_graph());
            }
            guard += 1;
            assert!(guard < 1000, "drain did not converge");
        }

        assert!(manager.sweep().expect("final sweep").is_clean());
    }
}

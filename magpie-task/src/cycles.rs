// SPDX-License-Identifier: MIT OR Apache-2.0

//! Acyclicity enforcement for the block graph.
//!
//! Admission-order fairness means block edges always point at strictly older
//! tasks, so a cycle should be impossible by construction. The check runs
//! anyway, inside the same transaction as edge creation: a cycle in the block
//! graph is a deadlock and must never be committed.

use magpie_core::TaskKey;
use magpie_store::Graph;
use petgraph::prelude::DiGraphMap;
use petgraph::visit::Dfs;

/// Build the current block graph over task creation sequence numbers.
fn block_graph(graph: &Graph) -> DiGraphMap<u64, ()> {
    let mut edges = DiGraphMap::new();
    for (from, to) in graph.block_edges() {
        if let (Some(from), Some(to)) = (graph.task(from), graph.task(to)) {
            edges.add_edge(from.seq, to.seq, ());
        }
    }
    edges
}

/// Whether a path exists between two tasks in the block graph.
fn has_path(edges: &DiGraphMap<u64, ()>, from: u64, to: u64) -> bool {
    if from == to {
        return true;
    }
    if !edges.contains_node(from) {
        return false;
    }
    let mut dfs = Dfs::new(edges, from);
    while let Some(node) = dfs.next(edges) {
        if node == to {
            return true;
        }
    }
    false
}

/// Whether adding block edges from the task with sequence number `from_seq`
/// to every task in `targets` would close a cycle.
pub(crate) fn would_cycle(graph: &Graph, from_seq: u64, targets: &[&TaskKey]) -> bool {
    let edges = block_graph(graph);
    targets.iter().any(|target| {
        graph
            .task(target)
            .is_some_and(|task| has_path(&edges, task.seq, from_seq))
    })
}

#[cfg(test)]
mod tests {
    use magpie_core::{LockRequest, RecordKey, Task, TaskKind, TaskStatus, UserKey};
    use magpie_store::{Graph, test_utils};

    use super::*;

    fn seed_task(graph: &mut Graph, id: &str, record: &RecordKey) -> TaskKey {
        let key = TaskKey::new(id);
        let seq = graph.next_task_seq();
        graph.insert_task(Task::new(
            key.clone(),
            TaskKind::DataGet,
            UserKey::new("ada"),
            vec![LockRequest::write(record.clone())],
            seq,
            TaskStatus::Blocked,
        ));
        key
    }

    #[test]
    fn detects_a_would_be_cycle() {
        let mut graph = Graph::new();
        let ada = test_utils::user(&mut graph, "ada");
        let record = test_utils::record(&mut graph, "x1", ada);

        let t1 = seed_task(&mut graph, "t1", &record);
        let t2 = seed_task(&mut graph, "t2", &record);
        let t3 = seed_task(&mut graph, "t3", &record);

        graph.add_block(t1.clone(), t2.clone());
        graph.add_block(t2.clone(), t3.clone());

        let t1_seq = graph.task(&t1).map(|t| t.seq).unwrap_or_default();
        let t3_seq = graph.task(&t3).map(|t| t.seq).unwrap_or_default();

        // t3 -> t1 closes the loop; t1 -> t3 merely deepens the chain.
        assert!(would_cycle(&graph, t3_seq, &[&t1]));
        assert!(!would_cycle(&graph, t1_seq, &[&t3]));
    }

    #[test]
    fn self_reference_counts_as_cycle() {
        let mut graph = Graph::new();
        let ada = test_utils::user(&mut graph, "ada");
        let record = test_utils::record(&mut graph, "x1", ada);
        let t1 = seed_task(&mut graph, "t1", &record);

        let t1_seq = graph.task(&t1).map(|t| t.seq).unwrap_or_default();
        assert!(would_cycle(&graph, t1_seq, &[&t1]));
    }
}

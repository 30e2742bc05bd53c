//! Property-based tests for the topology checks.
//!
//! Random graphs are built from vertex counts and edge lists; the properties
//! hold for any shape proptest generates.

use proptest::prelude::*;
use solder_core::{
    GraphModel, SchedulerType, SolderType, check_for_cyclical_backpressure,
    find_cyclical_backpressure, find_unbound_input_wires,
};

fn name(i: usize) -> String {
    format!("unit_{i}")
}

fn blocking_graph(n: usize) -> GraphModel {
    let mut graph = GraphModel::new();
    for i in 0..n {
        graph
            .register_vertex(&name(i), SchedulerType::Sequential, true)
            .unwrap();
    }
    graph
}

fn solder_type(index: u8) -> SolderType {
    match index % 3 {
        0 => SolderType::Put,
        1 => SolderType::Offer,
        _ => SolderType::Inject,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Edges that only go from lower to higher index form a DAG, so no
    /// blocking cycle can exist however many there are.
    #[test]
    fn forward_only_graphs_are_acyclic(
        n in 2usize..24,
        pairs in prop::collection::vec((0usize..24, 0usize..24), 0..80),
    ) {
        let mut graph = blocking_graph(n);
        for (label, &(a, b)) in pairs.iter().enumerate() {
            let (a, b) = (a % n, b % n);
            if a == b {
                continue;
            }
            let (from, to) = (a.min(b), a.max(b));
            graph
                .register_edge(&name(from), &name(to), &format!("in_{label}"), SolderType::Put)
                .unwrap();
        }
        prop_assert!(!check_for_cyclical_backpressure(&graph));
    }

    /// A blocking chain closed by a PUT back edge is always one cycle
    /// containing every vertex on the chain.
    #[test]
    fn back_edge_on_a_chain_is_always_a_cycle(
        n in 2usize..24,
        start in 0usize..24,
        len in 1usize..24,
    ) {
        let mut graph = blocking_graph(n);
        for i in 0..n - 1 {
            graph
                .register_edge(&name(i), &name(i + 1), "in", SolderType::Put)
                .unwrap();
        }
        let start = start % (n - 1);
        let end = (start + len).min(n - 1);
        graph
            .register_edge(&name(end), &name(start), "back", SolderType::Put)
            .unwrap();

        let cycles = find_cyclical_backpressure(&graph);
        prop_assert_eq!(cycles.len(), 1);
        prop_assert_eq!(cycles[0].vertices.len(), end - start + 1);
    }

    /// Replacing the back edge with a non-blocking solder removes the cycle.
    #[test]
    fn non_put_back_edge_never_cycles(
        n in 2usize..16,
        kind in 1u8..3,
    ) {
        let mut graph = blocking_graph(n);
        for i in 0..n - 1 {
            graph
                .register_edge(&name(i), &name(i + 1), "in", SolderType::Put)
                .unwrap();
        }
        graph
            .register_edge(&name(n - 1), &name(0), "back", solder_type(kind))
            .unwrap();
        prop_assert!(find_cyclical_backpressure(&graph).is_empty());
    }

    /// The checks never change the graph and give the same answer twice.
    #[test]
    fn checks_are_idempotent(
        n in 1usize..12,
        edges in prop::collection::vec((0usize..12, 0usize..12, 0u8..3), 0..40),
    ) {
        let mut graph = blocking_graph(n);
        for (label, &(a, b, kind)) in edges.iter().enumerate() {
            graph
                .register_edge(&name(a % n), &name(b % n), &format!("in_{label}"), solder_type(kind))
                .unwrap();
        }
        let edge_count = graph.edge_count();
        let first = find_cyclical_backpressure(&graph);
        let second = find_cyclical_backpressure(&graph);
        prop_assert_eq!(first, second);
        prop_assert_eq!(graph.edge_count(), edge_count);
    }

    /// Exactly the created-but-unbound inputs are reported.
    #[test]
    fn unbound_inputs_are_exactly_created_minus_bound(
        bound_mask in prop::collection::vec(any::<bool>(), 1..20),
    ) {
        let mut graph = blocking_graph(1);
        for (i, &bound) in bound_mask.iter().enumerate() {
            let wire = format!("in_{i}");
            graph.register_input_wire_created(&name(0), &wire).unwrap();
            if bound {
                graph.register_input_wire_bound(&name(0), &wire).unwrap();
            }
        }
        let expected = bound_mask.iter().filter(|&&b| !b).count();
        prop_assert_eq!(find_unbound_input_wires(&graph).len(), expected);
    }
}

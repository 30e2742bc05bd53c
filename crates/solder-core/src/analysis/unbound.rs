//! Unbound input wire detection.

use crate::graph::{GraphModel, InputWireDescriptor};

/// `created \ bound`, in name order.
pub fn find_unbound_input_wires(graph: &GraphModel) -> Vec<InputWireDescriptor> {
    graph.unbound_input_wires()
}

pub(crate) fn log_unbound(unbound: &[InputWireDescriptor]) {
    for descriptor in unbound {
        tracing::error!("input wire {descriptor} was created but never bound to a handler");
    }
}

/// Returns true and logs each descriptor if any created wire is unbound.
pub fn check_for_unbound_input_wires(graph: &GraphModel) -> bool {
    let unbound = find_unbound_input_wires(graph);
    log_unbound(&unbound);
    !unbound.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::SchedulerType;

    #[test]
    fn fully_bound_model_is_clean() {
        let mut graph = GraphModel::new();
        graph
            .register_vertex("a", SchedulerType::Sequential, false)
            .unwrap();
        graph.register_input_wire_created("a", "in").unwrap();
        graph.register_input_wire_bound("a", "in").unwrap();
        assert!(!check_for_unbound_input_wires(&graph));
    }

    #[test]
    fn every_unbound_wire_reported() {
        let mut graph = GraphModel::new();
        graph
            .register_vertex("a", SchedulerType::Sequential, false)
            .unwrap();
        graph.register_input_wire_created("a", "x").unwrap();
        graph.register_input_wire_created("a", "y").unwrap();
        graph.register_input_wire_created("a", "z").unwrap();
        graph.register_input_wire_bound("a", "y").unwrap();

        let unbound = find_unbound_input_wires(&graph);
        assert_eq!(
            unbound,
            vec![
                InputWireDescriptor::new("a", "x"),
                InputWireDescriptor::new("a", "z"),
            ]
        );
        assert!(check_for_unbound_input_wires(&graph));
    }
}

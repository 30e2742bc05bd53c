//! Cyclical-backpressure detection.
//!
//! Only blocking edges can make an inserter wait, so only they can deadlock.
//! The check restricts the graph to edges with `is_blocking == true` and
//! runs Tarjan's strongly-connected-components algorithm over it. Every
//! component with more than one vertex, and every vertex with a blocking
//! self-loop, is a cycle in which each member may end up waiting on
//! itself.

use crate::graph::{GraphModel, VertexId};

/// One strongly connected set of vertices joined by blocking edges.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackpressureCycle {
    /// Members in ascending id order.
    pub vertices: Vec<VertexId>,
}

impl BackpressureCycle {
    /// True if `id` is part of the cycle.
    pub fn contains(&self, id: VertexId) -> bool {
        self.vertices.binary_search(&id).is_ok()
    }

    /// Member names joined for logging.
    pub fn describe(&self, graph: &GraphModel) -> String {
        self.vertices
            .iter()
            .map(|&id| graph.vertex(id).name())
            .collect::<Vec<_>>()
            .join(" <-> ")
    }
}

const UNVISITED: usize = usize::MAX;

/// Returns every blocking cycle, in Tarjan completion order.
pub fn find_cyclical_backpressure(graph: &GraphModel) -> Vec<BackpressureCycle> {
    let n = graph.vertex_count();
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
    for edge in graph.edges().iter().filter(|e| e.is_blocking()) {
        adjacency[edge.origin().slot()].push(edge.destination().slot());
    }

    let mut index = vec![UNVISITED; n];
    let mut lowlink = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut next_index = 0usize;
    let mut cycles = Vec::new();

    for root in 0..n {
        if index[root] != UNVISITED || adjacency[root].is_empty() {
            continue;
        }

        // Explicit call stack of (vertex, next child position).
        let mut call: Vec<(usize, usize)> = vec![(root, 0)];
        index[root] = next_index;
        lowlink[root] = next_index;
        next_index += 1;
        stack.push(root);
        on_stack[root] = true;

        while let Some(frame) = call.last_mut() {
            let v = frame.0;
            if frame.1 < adjacency[v].len() {
                let w = adjacency[v][frame.1];
                frame.1 += 1;
                if index[w] == UNVISITED {
                    index[w] = next_index;
                    lowlink[w] = next_index;
                    next_index += 1;
                    stack.push(w);
                    on_stack[w] = true;
                    call.push((w, 0));
                } else if on_stack[w] {
                    lowlink[v] = lowlink[v].min(index[w]);
                }
                continue;
            }

            call.pop();
            if let Some(&(parent, _)) = call.last() {
                lowlink[parent] = lowlink[parent].min(lowlink[v]);
            }
            if lowlink[v] != index[v] {
                continue;
            }

            let mut component = Vec::new();
            while let Some(w) = stack.pop() {
                on_stack[w] = false;
                component.push(w);
                if w == v {
                    break;
                }
            }
            let self_loop = component.len() == 1 && adjacency[v].contains(&v);
            if component.len() > 1 || self_loop {
                let mut vertices: Vec<VertexId> =
                    component.into_iter().map(|i| VertexId(i as u32)).collect();
                vertices.sort_unstable();
                cycles.push(BackpressureCycle { vertices });
            }
        }
    }

    cycles
}

/// Logs one line per cycle.
pub(crate) fn log_cycles(graph: &GraphModel, cycles: &[BackpressureCycle]) {
    for cycle in cycles {
        tracing::error!(
            "cyclical backpressure detected: blocking cycle {}",
            cycle.describe(graph)
        );
    }
}

/// Returns true and logs each cycle if any blocking cycle exists.
pub fn check_for_cyclical_backpressure(graph: &GraphModel) -> bool {
    let cycles = find_cyclical_backpressure(graph);
    log_cycles(graph, &cycles);
    !cycles.is_empty()
}

//! Graph model - registration API and read-only topology queries.
//!
//! [`GraphModel`] is the authoritative record of a wiring topology. Vertices
//! and edges live in arena vectors addressed by [`VertexId`] / [`EdgeId`];
//! the name index is only consulted while the topology is being built.
//! Once the owning [`WiringModel`](crate::WiringModel) starts, the graph is
//! moved behind an `Arc` and never mutated again.

use std::collections::{HashMap, HashSet};

use crate::error::{Result, WiringError};

use super::edge::{Edge, EdgeId, SolderType};
use super::input_wire::{InputWireDescriptor, InputWireRegistry};
use super::vertex::{SchedulerType, Vertex, VertexId, VertexOrigin, is_valid_name};

/// Vertices, edges, and input wire sets of one wiring topology.
///
/// # Usage
///
/// 1. Register vertices with [`register_vertex()`](Self::register_vertex)
/// 2. Declare inputs with [`register_input_wire_created()`](Self::register_input_wire_created)
///    and bind them with [`register_input_wire_bound()`](Self::register_input_wire_bound)
/// 3. Solder with [`register_edge()`](Self::register_edge)
/// 4. Run the [`analysis`](crate::analysis) checks
#[derive(Clone, Debug, Default)]
pub struct GraphModel {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    names: HashMap<String, VertexId>,
    edge_keys: HashSet<(VertexId, VertexId, String)>,
    input_wires: InputWireRegistry,
}

impl GraphModel {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    // --- Registration ---

    /// Registers a declared vertex.
    ///
    /// Fails if `name` is already present or violates the naming rule.
    pub fn register_vertex(
        &mut self,
        name: &str,
        scheduler_type: SchedulerType,
        insertion_is_blocking: bool,
    ) -> Result<VertexId> {
        if !is_valid_name(name) {
            return Err(WiringError::InvalidName(name.to_string()));
        }
        if self.names.contains_key(name) {
            return Err(WiringError::DuplicateVertex(name.to_string()));
        }
        let id = self.insert_vertex(
            name,
            scheduler_type,
            insertion_is_blocking,
            VertexOrigin::Declared,
        );
        tracing::debug!("wiring_register: vertex {name} ({scheduler_type}) as {id}");
        Ok(id)
    }

    /// Registers an edge from `origin`'s output to `destination`'s `label` input.
    ///
    /// Unknown endpoints are synthesized as non-blocking [`SchedulerType::Direct`]
    /// vertices tagged [`VertexOrigin::Synthesized`] so that analysis can run
    /// over a partially specified graph.
    pub fn register_edge(
        &mut self,
        origin: &str,
        destination: &str,
        label: &str,
        solder_type: SolderType,
    ) -> Result<EdgeId> {
        self.add_edge(origin, destination, label, solder_type, false)
    }

    /// Registers a placeholder edge on behalf of tooling.
    ///
    /// Auto-inserted edges never block and are rendered distinctly.
    pub fn register_auto_inserted_edge(
        &mut self,
        origin: &str,
        destination: &str,
        label: &str,
    ) -> Result<EdgeId> {
        self.add_edge(origin, destination, label, SolderType::Inject, true)
    }

    /// Declares that `wire_name` exists on `scheduler_name`.
    pub fn register_input_wire_created(
        &mut self,
        scheduler_name: &str,
        wire_name: &str,
    ) -> Result<()> {
        self.input_wires.register_created(scheduler_name, wire_name)?;
        tracing::debug!("wiring_register: input {scheduler_name}.{wire_name} created");
        Ok(())
    }

    /// Declares that a handler was bound to `wire_name` on `scheduler_name`.
    pub fn register_input_wire_bound(&mut self, scheduler_name: &str, wire_name: &str) -> Result<()> {
        self.input_wires.register_bound(scheduler_name, wire_name)?;
        tracing::debug!("wiring_register: input {scheduler_name}.{wire_name} bound");
        Ok(())
    }

    // --- Queries ---

    /// Returns the vertex with `id`.
    ///
    /// Ids are only minted by this graph, so every id it handed out is valid.
    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id.slot()]
    }

    /// Looks a vertex up by name.
    pub fn vertex_by_name(&self, name: &str) -> Option<&Vertex> {
        self.names.get(name).map(|&id| self.vertex(id))
    }

    /// Looks a vertex up by name, failing with `UnknownVertex`.
    pub fn require_vertex(&self, name: &str) -> Result<&Vertex> {
        self.vertex_by_name(name)
            .ok_or_else(|| WiringError::UnknownVertex(name.to_string()))
    }

    /// Returns the edge with `id`.
    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.slot()]
    }

    /// All vertices in registration order.
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// All edges in registration order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Edges arriving at `id`.
    pub fn incoming_edges(&self, id: VertexId) -> impl Iterator<Item = &Edge> {
        self.vertex(id).incoming.iter().map(|&e| self.edge(e))
    }

    /// Edges leaving `id`.
    pub fn outgoing_edges(&self, id: VertexId) -> impl Iterator<Item = &Edge> {
        self.vertex(id).outgoing.iter().map(|&e| self.edge(e))
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Input wire sets.
    pub fn input_wires(&self) -> &InputWireRegistry {
        &self.input_wires
    }

    /// `created \ bound`, in name order.
    pub fn unbound_input_wires(&self) -> Vec<InputWireDescriptor> {
        self.input_wires.unbound().cloned().collect()
    }

    /// `created \ soldered`, in name order.
    pub fn unsoldered_input_wires(&self) -> Vec<InputWireDescriptor> {
        self.input_wires.unsoldered().cloned().collect()
    }

    /// True if (origin, destination, label) is already registered.
    pub fn has_edge(&self, origin: &str, destination: &str, label: &str) -> bool {
        match (self.names.get(origin), self.names.get(destination)) {
            (Some(&o), Some(&d)) => self.edge_keys.contains(&(o, d, label.to_string())),
            _ => false,
        }
    }

    // --- Internal helpers ---

    /// Inserts a vertex without validation. Callers guarantee uniqueness.
    pub(crate) fn insert_vertex(
        &mut self,
        name: &str,
        scheduler_type: SchedulerType,
        insertion_is_blocking: bool,
        origin: VertexOrigin,
    ) -> VertexId {
        let id = VertexId(self.vertices.len() as u32);
        self.vertices.push(Vertex::new(
            id,
            name.to_string(),
            scheduler_type,
            insertion_is_blocking,
            origin,
        ));
        self.names.insert(name.to_string(), id);
        id
    }

    /// Resolves `name`, synthesizing a DIRECT vertex if it is unknown.
    ///
    /// Callers have already checked that an unknown `name` is valid.
    fn resolve_or_synthesize(&mut self, name: &str) -> VertexId {
        if let Some(&id) = self.names.get(name) {
            return id;
        }
        let id = self.insert_vertex(name, SchedulerType::Direct, false, VertexOrigin::Synthesized);
        tracing::debug!("wiring_register: synthesized vertex {name} for forward reference");
        id
    }

    fn add_edge(
        &mut self,
        origin: &str,
        destination: &str,
        label: &str,
        solder_type: SolderType,
        is_auto_inserted: bool,
    ) -> Result<EdgeId> {
        if self.has_edge(origin, destination, label) {
            return Err(WiringError::DuplicateEdge {
                origin: origin.to_string(),
                destination: destination.to_string(),
                label: label.to_string(),
            });
        }

        for name in [origin, destination] {
            if !self.names.contains_key(name) && !is_valid_name(name) {
                return Err(WiringError::InvalidName(name.to_string()));
            }
        }

        let origin_id = self.resolve_or_synthesize(origin);
        let destination_id = self.resolve_or_synthesize(destination);

        let is_blocking = !is_auto_inserted
            && solder_type == SolderType::Put
            && self.vertex(destination_id).insertion_is_blocking;

        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(Edge {
            id,
            origin: origin_id,
            destination: destination_id,
            label: label.to_string(),
            solder_type,
            is_blocking,
            is_auto_inserted,
        });
        self.edge_keys
            .insert((origin_id, destination_id, label.to_string()));
        self.vertices[origin_id.slot()].outgoing.push(id);
        self.vertices[destination_id.slot()].incoming.push(id);
        self.input_wires.register_soldered(destination, label);

        tracing::debug!(
            "wiring_register: edge {origin} → {destination} ({label}, {solder_type}{})",
            if is_blocking { ", blocking" } else { "" }
        );
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(graph: &mut GraphModel, name: &str, blocking: bool) -> VertexId {
        graph
            .register_vertex(name, SchedulerType::Sequential, blocking)
            .unwrap()
    }

    #[test]
    fn register_vertices() {
        let mut graph = GraphModel::new();
        let a = seq(&mut graph, "a", false);
        let b = seq(&mut graph, "b", true);
        assert_eq!(graph.vertex_count(), 2);
        assert_eq!(graph.vertex(a).name(), "a");
        assert!(graph.vertex(b).insertion_is_blocking());
        assert_eq!(graph.vertex(b).origin(), VertexOrigin::Declared);
    }

    #[test]
    fn duplicate_vertex_rejected() {
        let mut graph = GraphModel::new();
        seq(&mut graph, "a", false);
        let err = graph
            .register_vertex("a", SchedulerType::Concurrent, false)
            .unwrap_err();
        assert_eq!(err, WiringError::DuplicateVertex("a".to_string()));
        assert_eq!(graph.vertex_count(), 1);
    }

    #[test]
    fn invalid_vertex_name_rejected() {
        let mut graph = GraphModel::new();
        let err = graph
            .register_vertex("bad name", SchedulerType::Sequential, false)
            .unwrap_err();
        assert!(matches!(err, WiringError::InvalidName(_)));
    }

    #[test]
    fn duplicate_edge_rejected() {
        let mut graph = GraphModel::new();
        seq(&mut graph, "a", false);
        seq(&mut graph, "b", false);
        graph.register_edge("a", "b", "data", SolderType::Put).unwrap();
        let err = graph
            .register_edge("a", "b", "data", SolderType::Offer)
            .unwrap_err();
        assert!(matches!(err, WiringError::DuplicateEdge { .. }));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn same_pair_different_label_allowed() {
        let mut graph = GraphModel::new();
        seq(&mut graph, "a", false);
        seq(&mut graph, "b", false);
        graph.register_edge("a", "b", "data", SolderType::Put).unwrap();
        graph.register_edge("a", "b", "control", SolderType::Put).unwrap();
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn blocking_requires_put_and_blocking_destination() {
        let mut graph = GraphModel::new();
        seq(&mut graph, "src", false);
        seq(&mut graph, "bounded", true);
        seq(&mut graph, "unbounded", false);

        let put_bounded = graph
            .register_edge("src", "bounded", "a", SolderType::Put)
            .unwrap();
        let offer_bounded = graph
            .register_edge("src", "bounded", "b", SolderType::Offer)
            .unwrap();
        let inject_bounded = graph
            .register_edge("src", "bounded", "c", SolderType::Inject)
            .unwrap();
        let put_unbounded = graph
            .register_edge("src", "unbounded", "a", SolderType::Put)
            .unwrap();

        assert!(graph.edge(put_bounded).is_blocking());
        assert!(!graph.edge(offer_bounded).is_blocking());
        assert!(!graph.edge(inject_bounded).is_blocking());
        assert!(!graph.edge(put_unbounded).is_blocking());
    }

    #[test]
    fn unknown_endpoints_are_synthesized() {
        let mut graph = GraphModel::new();
        seq(&mut graph, "a", true);
        graph
            .register_edge("a", "ghost", "data", SolderType::Put)
            .unwrap();
        let ghost = graph.vertex_by_name("ghost").unwrap();
        assert_eq!(ghost.origin(), VertexOrigin::Synthesized);
        assert_eq!(ghost.scheduler_type(), SchedulerType::Direct);
        assert!(!ghost.insertion_is_blocking());

        graph
            .register_edge("phantom", "a", "data", SolderType::Put)
            .unwrap();
        assert_eq!(
            graph.vertex_by_name("phantom").unwrap().origin(),
            VertexOrigin::Synthesized
        );
        // Existing vertex is reused, not re-synthesized.
        assert_eq!(graph.vertex_count(), 3);
    }

    #[test]
    fn edges_are_recorded_on_both_endpoints() {
        let mut graph = GraphModel::new();
        let a = seq(&mut graph, "a", false);
        let b = seq(&mut graph, "b", false);
        let e1 = graph.register_edge("a", "b", "x", SolderType::Put).unwrap();
        let e2 = graph.register_edge("a", "b", "y", SolderType::Put).unwrap();
        assert_eq!(graph.vertex(a).outgoing_edges(), &[e1, e2]);
        assert_eq!(graph.vertex(b).incoming_edges(), &[e1, e2]);
        assert_eq!(graph.incoming_edges(b).count(), 2);
        assert_eq!(graph.outgoing_edges(b).count(), 0);
    }

    #[test]
    fn edge_marks_destination_input_soldered() {
        let mut graph = GraphModel::new();
        seq(&mut graph, "a", false);
        seq(&mut graph, "b", false);
        graph.register_input_wire_created("b", "x").unwrap();
        graph.register_input_wire_created("b", "y").unwrap();
        graph.register_edge("a", "b", "x", SolderType::Put).unwrap();
        assert_eq!(
            graph.unsoldered_input_wires(),
            vec![InputWireDescriptor::new("b", "y")]
        );
    }

    #[test]
    fn auto_inserted_edges_never_block() {
        let mut graph = GraphModel::new();
        seq(&mut graph, "a", false);
        seq(&mut graph, "b", true);
        let id = graph.register_auto_inserted_edge("a", "b", "hint").unwrap();
        assert!(graph.edge(id).is_auto_inserted());
        assert!(!graph.edge(id).is_blocking());
    }

    #[test]
    fn require_vertex_reports_unknown() {
        let graph = GraphModel::new();
        assert_eq!(
            graph.require_vertex("nope").unwrap_err(),
            WiringError::UnknownVertex("nope".to_string())
        );
    }
}

//! Mermaid flowchart rendering of a wiring graph.
//!
//! Node shapes encode the scheduler type:
//!
//! | Type | Shape |
//! |------|-------|
//! | `SEQUENTIAL` | rectangle |
//! | `DEDICATED_THREAD` | subroutine |
//! | `CONCURRENT` | parallelogram |
//! | `DIRECT` | rounded |
//! | `DIRECT_THREADSAFE` | stadium |
//! | `NO_OP` | hexagon |
//!
//! Blocking edges are thick (`==>`), other edges solid (`-->`), and
//! auto-inserted, manual and mystery edges dotted (`-.->`). Parallel edges
//! between the same pair of nodes are merged into one arrow with a joined
//! label.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::graph::{Edge, GraphModel, SchedulerType, Vertex, VertexOrigin};

/// A named set of vertices drawn as a subgraph, or as one node when collapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelGroup {
    /// Group name.
    pub name: String,
    /// Member vertex names.
    pub elements: BTreeSet<String>,
    /// Draw the whole group as a single node.
    pub collapse: bool,
}

/// Replaces edges leaving `source` on `label` with a symbol at each destination.
///
/// Useful for inputs fed from everywhere, such as heartbeats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelEdgeSubstitution {
    /// Origin vertex name.
    pub source: String,
    /// Edge label to match.
    pub label: String,
    /// Symbol text drawn in place of the edge.
    pub substitution: String,
}

/// An extra dotted edge that does not exist in the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelManualLink {
    /// Origin vertex or group name.
    pub source: String,
    /// Edge label.
    pub label: String,
    /// Destination vertex or group name.
    pub target: String,
}

/// Rendering options for [`generate_wiring_diagram`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagramOptions {
    /// Groups; a vertex belongs to the first group listing it.
    pub groups: Vec<ModelGroup>,
    /// Edge substitutions.
    pub substitutions: Vec<ModelEdgeSubstitution>,
    /// Manual links.
    pub manual_links: Vec<ModelManualLink>,
    /// Feed every unsoldered input from one shared `mystery_input` node
    /// instead of one mystery source per destination.
    pub more_mystery: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Stroke {
    Thick,
    Solid,
    Dotted,
}

impl Stroke {
    fn of(edge: &Edge) -> Self {
        if edge.is_auto_inserted() {
            Self::Dotted
        } else if edge.is_blocking() {
            Self::Thick
        } else {
            Self::Solid
        }
    }

    fn arrow(self) -> &'static str {
        match self {
            Self::Thick => "==>",
            Self::Solid => "-->",
            Self::Dotted => "-.->",
        }
    }
}

fn vertex_node(name: &str) -> String {
    format!("v_{name}")
}

fn group_node(name: &str) -> String {
    format!("g_{name}")
}

fn shape(scheduler_type: SchedulerType, label: &str) -> String {
    match scheduler_type {
        SchedulerType::Sequential => format!("[\"{label}\"]"),
        SchedulerType::DedicatedThread => format!("[[\"{label}\"]]"),
        SchedulerType::Concurrent => format!("[/\"{label}\"/]"),
        SchedulerType::Direct => format!("(\"{label}\")"),
        SchedulerType::DirectThreadsafe => format!("([\"{label}\"])"),
        SchedulerType::NoOp => format!("{{{{\"{label}\"}}}}"),
    }
}

struct Layout<'a> {
    graph: &'a GraphModel,
    options: &'a DiagramOptions,
    /// Vertex name to group index.
    membership: HashMap<&'a str, usize>,
}

impl<'a> Layout<'a> {
    fn new(graph: &'a GraphModel, options: &'a DiagramOptions) -> Self {
        let mut membership = HashMap::new();
        for (index, group) in options.groups.iter().enumerate() {
            for element in &group.elements {
                membership.entry(element.as_str()).or_insert(index);
            }
        }
        Self {
            graph,
            options,
            membership,
        }
    }

    /// Node id a vertex or group name is drawn as.
    fn node_for(&self, name: &str) -> String {
        if let Some(&index) = self.membership.get(name) {
            let group = &self.options.groups[index];
            if group.collapse {
                return group_node(&group.name);
            }
        }
        if self.options.groups.iter().any(|g| g.name == name && g.collapse) {
            return group_node(name);
        }
        vertex_node(name)
    }

    fn declare_vertex(&self, out: &mut String, indent: &str, vertex: &Vertex) {
        out.push_str(&format!(
            "{indent}{}{}\n",
            vertex_node(vertex.name()),
            shape(vertex.scheduler_type(), vertex.name())
        ));
    }

    fn nodes(&self, out: &mut String) {
        for (index, group) in self.options.groups.iter().enumerate() {
            let members: Vec<&Vertex> = self
                .graph
                .vertices()
                .iter()
                .filter(|v| self.membership.get(v.name()) == Some(&index))
                .collect();
            if group.collapse {
                out.push_str(&format!(
                    "    {}[(\"{}\")]\n    class {} collapsed\n",
                    group_node(&group.name),
                    group.name,
                    group_node(&group.name)
                ));
                continue;
            }
            out.push_str(&format!(
                "    subgraph {} [\"{}\"]\n",
                group_node(&group.name),
                group.name
            ));
            for vertex in members {
                self.declare_vertex(out, "        ", vertex);
            }
            out.push_str("    end\n");
        }

        for vertex in self.graph.vertices() {
            if !self.membership.contains_key(vertex.name()) {
                self.declare_vertex(out, "    ", vertex);
            }
        }

        for vertex in self.graph.vertices() {
            let node = vertex_node(vertex.name());
            if vertex.origin() == VertexOrigin::Synthesized && self.node_for(vertex.name()) == node {
                out.push_str(&format!("    class {node} synthesized\n"));
            }
        }
    }

    fn substitution_for(&self, origin: &str, label: &str) -> Option<usize> {
        self.options
            .substitutions
            .iter()
            .position(|s| s.source == origin && s.label == label)
    }

    fn edges(&self, out: &mut String) {
        let mut merged: BTreeMap<(String, String, Stroke), BTreeSet<&str>> = BTreeMap::new();
        let mut substituted: BTreeMap<(usize, String), BTreeSet<&str>> = BTreeMap::new();

        for edge in self.graph.edges() {
            let origin = self.graph.vertex(edge.origin()).name();
            let destination = self.graph.vertex(edge.destination()).name();
            let from = self.node_for(origin);
            let to = self.node_for(destination);
            if from == to && from.starts_with("g_") {
                continue;
            }
            if let Some(index) = self.substitution_for(origin, edge.label()) {
                substituted.entry((index, to)).or_default().insert(edge.label());
                continue;
            }
            merged
                .entry((from, to, Stroke::of(edge)))
                .or_default()
                .insert(edge.label());
        }

        for ((from, to, stroke), labels) in &merged {
            out.push_str(&format!(
                "    {from} {}|\"{}\"| {to}\n",
                stroke.arrow(),
                labels.iter().copied().collect::<Vec<_>>().join(", ")
            ));
        }

        for (counter, ((index, to), labels)) in substituted.iter().enumerate() {
            let symbol = format!("sub_{counter}");
            out.push_str(&format!(
                "    {symbol}((\"{}\"))\n    class {symbol} substitution\n    {symbol} -->|\"{}\"| {to}\n",
                self.options.substitutions[*index].substitution,
                labels.iter().copied().collect::<Vec<_>>().join(", ")
            ));
        }

        for link in &self.options.manual_links {
            out.push_str(&format!(
                "    {} -.->|\"{}\"| {}\n",
                self.node_for(&link.source),
                link.label,
                self.node_for(&link.target)
            ));
        }
    }

    fn mystery(&self, out: &mut String) {
        let mut by_destination: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();
        for descriptor in self.graph.input_wires().unsoldered() {
            by_destination
                .entry(self.node_for(&descriptor.scheduler_name))
                .or_default()
                .insert(&descriptor.wire_name);
        }
        if by_destination.is_empty() {
            return;
        }

        if self.options.more_mystery {
            out.push_str("    mystery_input((\"?\"))\n    class mystery_input mystery\n");
        }
        for (to, wires) in &by_destination {
            let from = if self.options.more_mystery {
                "mystery_input".to_string()
            } else {
                let node = format!("mystery_{to}");
                out.push_str(&format!(
                    "    {node}((\"?\"))\n    class {node} mystery\n"
                ));
                node
            };
            out.push_str(&format!(
                "    {from} -.->|\"{}\"| {to}\n",
                wires.iter().copied().collect::<Vec<_>>().join(", ")
            ));
        }
    }
}

/// Renders `graph` as a Mermaid `flowchart TD`. The graph is not modified.
pub fn generate_wiring_diagram(graph: &GraphModel, options: &DiagramOptions) -> String {
    let layout = Layout::new(graph, options);
    let mut out = String::from("flowchart TD\n");
    out.push_str("    classDef synthesized stroke-dasharray: 5 5\n");
    out.push_str("    classDef collapsed fill:#ddd\n");
    out.push_str("    classDef substitution fill:#ffd\n");
    out.push_str("    classDef mystery fill:#fdd\n");
    layout.nodes(&mut out);
    layout.edges(&mut out);
    layout.mystery(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::SolderType;

    fn sample() -> GraphModel {
        let mut graph = GraphModel::new();
        graph
            .register_vertex("source", SchedulerType::Sequential, false)
            .unwrap();
        graph
            .register_vertex("hasher", SchedulerType::Concurrent, true)
            .unwrap();
        graph
            .register_vertex("sink", SchedulerType::DedicatedThread, false)
            .unwrap();
        graph
            .register_vertex("heartbeat", SchedulerType::Sequential, false)
            .unwrap();
        graph
            .register_edge("source", "hasher", "events", SolderType::Put)
            .unwrap();
        graph
            .register_edge("hasher", "sink", "hashed", SolderType::Put)
            .unwrap();
        graph
            .register_edge("heartbeat", "sink", "tick", SolderType::Put)
            .unwrap();
        graph
            .register_edge("heartbeat", "hasher", "tick", SolderType::Put)
            .unwrap();
        graph
    }

    #[test]
    fn every_vertex_is_drawn() {
        let graph = sample();
        let diagram = generate_wiring_diagram(&graph, &DiagramOptions::default());
        assert!(diagram.starts_with("flowchart TD\n"));
        for vertex in graph.vertices() {
            assert!(diagram.contains(&vertex_node(vertex.name())), "{}", vertex.name());
        }
        assert!(diagram.contains("v_hasher[/\"hasher\"/]"));
        assert!(diagram.contains("v_sink[[\"sink\"]]"));
    }

    #[test]
    fn blocking_edges_are_thick() {
        let diagram = generate_wiring_diagram(&sample(), &DiagramOptions::default());
        assert!(diagram.contains("v_source ==>|\"events\"| v_hasher"));
        assert!(diagram.contains("v_hasher -->|\"hashed\"| v_sink"));
    }

    #[test]
    fn collapsed_group_hides_internal_edges() {
        let graph = sample();
        let options = DiagramOptions {
            groups: vec![ModelGroup {
                name: "pipeline".to_string(),
                elements: ["hasher", "sink"].iter().map(|s| s.to_string()).collect(),
                collapse: true,
            }],
            ..DiagramOptions::default()
        };
        let diagram = generate_wiring_diagram(&graph, &options);
        assert!(diagram.contains("g_pipeline[(\"pipeline\")]"));
        assert!(!diagram.contains("v_hasher"));
        assert!(!diagram.contains("hashed"));
        // One blocking and one non-blocking heartbeat edge into the group.
        assert_eq!(diagram.matches("v_heartbeat -->").count(), 1);
        assert_eq!(diagram.matches("v_heartbeat ==>").count(), 1);
    }

    #[test]
    fn expanded_group_is_a_subgraph() {
        let options = DiagramOptions {
            groups: vec![ModelGroup {
                name: "pipeline".to_string(),
                elements: ["hasher".to_string()].into_iter().collect(),
                collapse: false,
            }],
            ..DiagramOptions::default()
        };
        let diagram = generate_wiring_diagram(&sample(), &options);
        assert!(diagram.contains("subgraph g_pipeline [\"pipeline\"]"));
        assert!(diagram.contains("        v_hasher"));
    }

    #[test]
    fn substitution_replaces_edges() {
        let options = DiagramOptions {
            substitutions: vec![ModelEdgeSubstitution {
                source: "heartbeat".to_string(),
                label: "tick".to_string(),
                substitution: "♡".to_string(),
            }],
            ..DiagramOptions::default()
        };
        let diagram = generate_wiring_diagram(&sample(), &options);
        assert!(!diagram.contains("v_heartbeat -->"));
        assert_eq!(diagram.matches("((\"♡\"))").count(), 2);
    }

    #[test]
    fn manual_links_are_dotted() {
        let options = DiagramOptions {
            manual_links: vec![ModelManualLink {
                source: "sink".to_string(),
                label: "feedback".to_string(),
                target: "source".to_string(),
            }],
            ..DiagramOptions::default()
        };
        let diagram = generate_wiring_diagram(&sample(), &options);
        assert!(diagram.contains("v_sink -.->|\"feedback\"| v_source"));
    }

    #[test]
    fn mystery_sources() {
        let mut graph = sample();
        graph.register_input_wire_created("sink", "orphan").unwrap();
        graph.register_input_wire_created("hasher", "lost").unwrap();

        let per_destination = generate_wiring_diagram(&graph, &DiagramOptions::default());
        assert!(per_destination.contains("mystery_v_sink -.->|\"orphan\"| v_sink"));
        assert!(per_destination.contains("mystery_v_hasher -.->|\"lost\"| v_hasher"));
        assert!(!per_destination.contains("mystery_input"));

        let shared = generate_wiring_diagram(
            &graph,
            &DiagramOptions {
                more_mystery: true,
                ..DiagramOptions::default()
            },
        );
        assert_eq!(shared.matches("mystery_input -.->").count(), 2);
        assert!(!shared.contains("mystery_v_"));
    }

    #[test]
    fn synthesized_vertices_are_styled() {
        let mut graph = GraphModel::new();
        graph
            .register_edge("ghost", "phantom", "in", SolderType::Put)
            .unwrap();
        let diagram = generate_wiring_diagram(&graph, &DiagramOptions::default());
        assert!(diagram.contains("class v_ghost synthesized"));
        assert!(diagram.contains("class v_phantom synthesized"));
    }

    #[test]
    fn rendering_does_not_mutate() {
        let graph = sample();
        let before = graph.edge_count();
        generate_wiring_diagram(&graph, &DiagramOptions::default());
        assert_eq!(graph.edge_count(), before);
    }
}

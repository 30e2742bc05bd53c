//! Topology description files.
//!
//! A topology file lists the schedulers of a wiring, their named inputs, and
//! the edges between them. Applying it to a [`GraphModel`] lets the analyzers
//! and the diagram generator run without constructing a live model.
//!
//! ```toml
//! name = "ingest"
//!
//! [[schedulers]]
//! name = "parser"
//! type = "SEQUENTIAL"
//! capacity = 500
//!
//! [[schedulers]]
//! name = "store"
//! type = "DEDICATED_THREAD"
//! external_back_pressure = true
//!
//! [[inputs]]
//! scheduler = "store"
//! name = "records"
//!
//! [[edges]]
//! from = "parser"
//! to = "store"
//! input = "records"
//! solder = "put"
//! ```
//!
//! Edges may name vertices no scheduler declares; those are synthesized as
//! DIRECT vertices by the graph.

use std::path::Path;

use serde::{Deserialize, Serialize};
use solder_core::{GraphModel, SchedulerType, SolderType, VertexOrigin};

use crate::error::ConfigError;
use crate::file::{read_toml, write_toml};

fn default_scheduler_type() -> String {
    SchedulerType::Sequential.as_str().to_string()
}

fn default_solder() -> String {
    SolderType::Put.as_str().to_string()
}

fn default_true() -> bool {
    true
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

/// One declared scheduling unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerSpec {
    /// Unique vertex name.
    pub name: String,
    /// Scheduler type name, e.g. `"SEQUENTIAL"` (case-insensitive).
    #[serde(rename = "type", default = "default_scheduler_type")]
    pub scheduler_type: String,
    /// Unhandled task capacity. Setting it makes insertion blocking.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<usize>,
    /// Insertion blocks for reasons outside the task count.
    #[serde(default, skip_serializing_if = "is_false")]
    pub external_back_pressure: bool,
}

impl SchedulerSpec {
    /// A SEQUENTIAL scheduler with no capacity.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scheduler_type: default_scheduler_type(),
            capacity: None,
            external_back_pressure: false,
        }
    }

    /// Parsed scheduler type.
    pub fn parsed_type(&self) -> Result<SchedulerType, ConfigError> {
        SchedulerType::parse(&self.scheduler_type)
            .ok_or_else(|| ConfigError::UnknownSchedulerType(self.scheduler_type.clone()))
    }

    /// Whether PUT insertions into this scheduler can block.
    pub fn insertion_is_blocking(&self) -> bool {
        self.capacity.is_some() || self.external_back_pressure
    }
}

/// One named input wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSpec {
    /// Owning scheduler.
    pub scheduler: String,
    /// Input wire name.
    pub name: String,
    /// Whether a handler is bound. Defaults to true.
    #[serde(default = "default_true")]
    pub bound: bool,
}

/// One soldered connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeSpec {
    /// Origin vertex.
    pub from: String,
    /// Destination vertex.
    pub to: String,
    /// Destination input name, used as the edge label.
    pub input: String,
    /// `"put"`, `"offer"` or `"inject"`. Defaults to `"put"`.
    #[serde(default = "default_solder")]
    pub solder: String,
    /// Placeholder edge added by tooling. Never blocks.
    #[serde(default, skip_serializing_if = "is_false")]
    pub auto_inserted: bool,
}

impl EdgeSpec {
    /// A PUT edge.
    pub fn new(from: impl Into<String>, to: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            input: input.into(),
            solder: default_solder(),
            auto_inserted: false,
        }
    }

    /// Parsed solder type.
    pub fn parsed_solder(&self) -> Result<SolderType, ConfigError> {
        SolderType::parse(&self.solder)
            .ok_or_else(|| ConfigError::UnknownSolderType(self.solder.clone()))
    }
}

/// A complete topology description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologySpec {
    /// Optional display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Declared schedulers, registered in order.
    #[serde(default)]
    pub schedulers: Vec<SchedulerSpec>,
    /// Declared input wires.
    #[serde(default)]
    pub inputs: Vec<InputSpec>,
    /// Edges, registered after every scheduler.
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
}

impl TopologySpec {
    /// Load a topology from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        read_toml(path.as_ref())
    }

    /// Parse a topology from a TOML string.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Save the topology to a TOML file, creating the parent directory if needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        write_toml(self, path.as_ref())
    }

    /// Serialize the topology to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Looks up a declared scheduler by name.
    pub fn scheduler(&self, name: &str) -> Option<&SchedulerSpec> {
        self.schedulers.iter().find(|s| s.name == name)
    }

    /// Registers every scheduler, input and edge onto a fresh graph.
    ///
    /// Schedulers go first so that edges only synthesize the vertices no
    /// scheduler declares.
    pub fn apply(&self) -> Result<GraphModel, ConfigError> {
        let mut graph = GraphModel::new();
        for scheduler in &self.schedulers {
            graph.register_vertex(
                &scheduler.name,
                scheduler.parsed_type()?,
                scheduler.insertion_is_blocking(),
            )?;
        }
        for input in &self.inputs {
            graph.register_input_wire_created(&input.scheduler, &input.name)?;
            if input.bound {
                graph.register_input_wire_bound(&input.scheduler, &input.name)?;
            }
        }
        for edge in &self.edges {
            if edge.auto_inserted {
                graph.register_auto_inserted_edge(&edge.from, &edge.to, &edge.input)?;
            } else {
                graph.register_edge(&edge.from, &edge.to, &edge.input, edge.parsed_solder()?)?;
            }
        }
        tracing::debug!(
            "topology_apply: {} vertices, {} edges",
            graph.vertex_count(),
            graph.edge_count()
        );
        Ok(graph)
    }

    /// Describes an existing graph.
    ///
    /// Capacities are not recorded by the graph, so blocking vertices are
    /// written with `external_back_pressure`. Synthesized vertices are left
    /// out and come back when the edges are applied.
    pub fn from_graph(graph: &GraphModel) -> Self {
        let schedulers = graph
            .vertices()
            .iter()
            .filter(|v| v.origin() == VertexOrigin::Declared)
            .map(|v| SchedulerSpec {
                name: v.name().to_string(),
                scheduler_type: v.scheduler_type().as_str().to_string(),
                capacity: None,
                external_back_pressure: v.insertion_is_blocking(),
            })
            .collect();

        let wires = graph.input_wires();
        let inputs = wires
            .created()
            .iter()
            .map(|d| InputSpec {
                scheduler: d.scheduler_name.clone(),
                name: d.wire_name.clone(),
                bound: wires.bound().contains(d),
            })
            .collect();

        let edges = graph
            .edges()
            .iter()
            .map(|e| EdgeSpec {
                from: graph.vertex(e.origin()).name().to_string(),
                to: graph.vertex(e.destination()).name().to_string(),
                input: e.label().to_string(),
                solder: e.solder_type().as_str().to_string(),
                auto_inserted: e.is_auto_inserted(),
            })
            .collect();

        Self {
            name: None,
            schedulers,
            inputs,
            edges,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solder_core::{WiringError, check_for_cyclical_backpressure};

    const PIPELINE: &str = r#"
name = "ingest"

[[schedulers]]
name = "parser"
type = "sequential"
capacity = 500

[[schedulers]]
name = "store"
type = "DEDICATED_THREAD"
external_back_pressure = true

[[inputs]]
scheduler = "store"
name = "records"

[[inputs]]
scheduler = "parser"
name = "raw"
bound = false

[[edges]]
from = "parser"
to = "store"
input = "records"

[[edges]]
from = "store"
to = "audit"
input = "rows"
solder = "offer"
"#;

    #[test]
    fn parses_with_defaults() {
        let spec = TopologySpec::from_toml(PIPELINE).unwrap();
        assert_eq!(spec.name.as_deref(), Some("ingest"));
        assert_eq!(spec.schedulers.len(), 2);
        assert_eq!(spec.edges[0].solder, "put");
        assert!(spec.inputs[0].bound);
        assert!(!spec.inputs[1].bound);
        assert!(spec.scheduler("parser").unwrap().insertion_is_blocking());
    }

    #[test]
    fn scheduler_type_defaults_to_sequential() {
        let spec = TopologySpec::from_toml("[[schedulers]]\nname = \"a\"").unwrap();
        assert_eq!(
            spec.schedulers[0].parsed_type().unwrap(),
            SchedulerType::Sequential
        );
    }

    #[test]
    fn apply_builds_the_graph() {
        let graph = TopologySpec::from_toml(PIPELINE).unwrap().apply().unwrap();
        assert_eq!(graph.vertex_count(), 3);
        assert_eq!(graph.edge_count(), 2);

        let store = graph.vertex_by_name("store").unwrap();
        assert_eq!(store.scheduler_type(), SchedulerType::DedicatedThread);
        assert!(store.insertion_is_blocking());

        let audit = graph.vertex_by_name("audit").unwrap();
        assert_eq!(audit.origin(), VertexOrigin::Synthesized);

        assert_eq!(graph.unbound_input_wires().len(), 1);
        assert!(graph.edges()[0].is_blocking());
        assert!(!graph.edges()[1].is_blocking());
    }

    #[test]
    fn apply_rejects_unknown_scheduler_type() {
        let spec = TopologySpec::from_toml("[[schedulers]]\nname = \"a\"\ntype = \"FAST\"").unwrap();
        assert!(matches!(
            spec.apply(),
            Err(ConfigError::UnknownSchedulerType(t)) if t == "FAST"
        ));
    }

    #[test]
    fn apply_rejects_unknown_solder() {
        let mut spec = TopologySpec::default();
        spec.edges.push(EdgeSpec {
            solder: "shove".into(),
            ..EdgeSpec::new("a", "b", "in")
        });
        assert!(matches!(spec.apply(), Err(ConfigError::UnknownSolderType(_))));
    }

    #[test]
    fn apply_surfaces_graph_errors() {
        let mut spec = TopologySpec::default();
        spec.schedulers.push(SchedulerSpec::new("dup"));
        spec.schedulers.push(SchedulerSpec::new("dup"));
        assert!(matches!(
            spec.apply(),
            Err(ConfigError::Wiring(WiringError::DuplicateVertex(_)))
        ));
    }

    #[test]
    fn auto_inserted_edges_never_block() {
        let mut spec = TopologySpec::default();
        for name in ["a", "b"] {
            spec.schedulers.push(SchedulerSpec {
                capacity: Some(1),
                ..SchedulerSpec::new(name)
            });
        }
        spec.edges.push(EdgeSpec::new("a", "b", "in"));
        spec.edges.push(EdgeSpec {
            auto_inserted: true,
            ..EdgeSpec::new("b", "a", "back")
        });
        let graph = spec.apply().unwrap();
        assert!(!check_for_cyclical_backpressure(&graph));
    }

    #[test]
    fn toml_round_trip_preserves_document() {
        let spec = TopologySpec::from_toml(PIPELINE).unwrap();
        let text = spec.to_toml().unwrap();
        assert_eq!(TopologySpec::from_toml(&text).unwrap(), spec);
    }

    #[test]
    fn from_graph_reapplies_to_the_same_shape() {
        let original = TopologySpec::from_toml(PIPELINE).unwrap().apply().unwrap();
        let described = TopologySpec::from_graph(&original);
        assert_eq!(described.schedulers.len(), 2);

        let rebuilt = described.apply().unwrap();
        assert_eq!(rebuilt.vertex_count(), original.vertex_count());
        assert_eq!(rebuilt.edge_count(), original.edge_count());
        for edge in original.edges() {
            let from = original.vertex(edge.origin()).name();
            let to = original.vertex(edge.destination()).name();
            assert!(rebuilt.has_edge(from, to, edge.label()));
        }
        assert_eq!(rebuilt.unbound_input_wires(), original.unbound_input_wires());
    }
}

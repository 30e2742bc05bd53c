//! Loading shared by the commands.

use std::path::Path;

use anyhow::Context;
use solder_config::{TopologySpec, validate_topology};
use solder_core::GraphModel;

/// Loads and validates a topology file.
pub fn load_topology(path: &Path) -> anyhow::Result<TopologySpec> {
    let spec = TopologySpec::load(path)
        .with_context(|| format!("failed to load topology {}", path.display()))?;
    validate_topology(&spec).with_context(|| format!("invalid topology {}", path.display()))?;
    Ok(spec)
}

/// Loads a topology file and applies it to a fresh graph.
pub fn load_graph(path: &Path) -> anyhow::Result<(TopologySpec, GraphModel)> {
    let spec = load_topology(path)?;
    let graph = spec
        .apply()
        .with_context(|| format!("failed to apply topology {}", path.display()))?;
    Ok((spec, graph))
}

/// Display name for a topology: its `name` key or the file stem.
pub fn topology_name(spec: &TopologySpec, path: &Path) -> String {
    spec.name.clone().unwrap_or_else(|| {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "topology".to_string())
    })
}

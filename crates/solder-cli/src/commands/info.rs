//! Summarize a topology file.

use std::path::PathBuf;

use clap::Args;
use solder_core::{GraphModel, SchedulerType, SolderType, VertexOrigin};

use super::common::{load_graph, topology_name};

/// Display vertex and edge counts of a topology.
#[derive(Args)]
pub struct InfoArgs {
    /// Topology file (TOML)
    pub topology: PathBuf,
}

/// Run the info command.
pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let (spec, graph) = load_graph(&args.topology)?;

    println!("Topology:    {}", topology_name(&spec, &args.topology));
    println!("File:        {}", args.topology.display());
    print_counts(&graph);
    Ok(())
}

fn print_counts(graph: &GraphModel) {
    let synthesized = graph
        .vertices()
        .iter()
        .filter(|v| v.origin() == VertexOrigin::Synthesized)
        .count();
    println!(
        "Vertices:    {} ({synthesized} synthesized)",
        graph.vertex_count()
    );
    for scheduler_type in SchedulerType::ALL {
        let count = graph
            .vertices()
            .iter()
            .filter(|v| v.scheduler_type() == scheduler_type)
            .count();
        if count > 0 {
            println!("  {:<18} {count}", scheduler_type.as_str());
        }
    }

    let blocking = graph.edges().iter().filter(|e| e.is_blocking()).count();
    let auto_inserted = graph.edges().iter().filter(|e| e.is_auto_inserted()).count();
    println!(
        "Edges:       {} ({blocking} blocking, {auto_inserted} auto-inserted)",
        graph.edge_count()
    );
    for solder_type in [SolderType::Put, SolderType::Offer, SolderType::Inject] {
        let count = graph
            .edges()
            .iter()
            .filter(|e| e.solder_type() == solder_type && !e.is_auto_inserted())
            .count();
        if count > 0 {
            println!("  {:<18} {count}", solder_type.as_str());
        }
    }

    let wires = graph.input_wires();
    println!(
        "Inputs:      {} created, {} bound, {} soldered",
        wires.created().len(),
        wires.bound().len(),
        wires.soldered().len()
    );
}

//! Run the topology checks over a topology file.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde_json::json;
use solder_config::{WiringConfig, find_config, validate_config};
use solder_core::{GraphModel, TopologyReport, VertexId, analyze};

use super::common::{load_graph, topology_name};

/// Check a topology for backpressure cycles, direct-scheduler misuse and unbound inputs.
#[derive(Args)]
pub struct CheckArgs {
    /// Topology file (TOML)
    pub topology: PathBuf,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Runtime settings file to validate alongside the topology
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Run the check command. Fails if any check finds a problem.
pub fn run(args: CheckArgs) -> anyhow::Result<()> {
    if let Some(explicit) = &args.config {
        let path = find_config(Some(explicit))
            .with_context(|| format!("settings file {} not found", explicit.display()))?;
        let config = WiringConfig::load(&path)?;
        validate_config(&config).with_context(|| format!("invalid settings {}", path.display()))?;
        tracing::info!("settings {} are valid", path.display());
    }

    let (spec, graph) = load_graph(&args.topology)?;
    let report = analyze(&graph);
    let name = topology_name(&spec, &args.topology);

    if args.json {
        let value = report_json(&name, &graph, &report);
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print_report(&name, &graph, &report);
    }

    if report.has_problems() {
        anyhow::bail!("topology '{name}' failed its checks");
    }
    Ok(())
}

fn names(graph: &GraphModel, ids: &[VertexId]) -> Vec<String> {
    ids.iter()
        .map(|&id| graph.vertex(id).name().to_string())
        .collect()
}

fn report_json(name: &str, graph: &GraphModel, report: &TopologyReport) -> serde_json::Value {
    let cycles: Vec<_> = report
        .cyclical_backpressure
        .iter()
        .map(|c| names(graph, &c.vertices))
        .collect();
    let fan_in: Vec<_> = report
        .direct_scheduler_usage
        .fan_in
        .iter()
        .map(|f| {
            json!({
                "vertex": graph.vertex(f.vertex).name(),
                "origins": names(graph, &f.origins),
            })
        })
        .collect();
    let in_cycles: Vec<_> = report
        .direct_scheduler_usage
        .in_blocking_cycles
        .iter()
        .map(|d| json!({ "vertex": graph.vertex(d.vertex).name(), "cycle": d.cycle }))
        .collect();
    let unbound: Vec<_> = report
        .unbound_input_wires
        .iter()
        .map(|w| json!({ "scheduler": w.scheduler_name, "input": w.wire_name }))
        .collect();

    json!({
        "topology": name,
        "vertices": graph.vertex_count(),
        "edges": graph.edge_count(),
        "passed": !report.has_problems(),
        "cyclical_backpressure": cycles,
        "direct_fan_in": fan_in,
        "direct_in_blocking_cycles": in_cycles,
        "unbound_input_wires": unbound,
    })
}

fn print_report(name: &str, graph: &GraphModel, report: &TopologyReport) {
    println!(
        "Topology:    {name} ({} vertices, {} edges)",
        graph.vertex_count(),
        graph.edge_count()
    );

    let status = |failed: bool| if failed { "FAIL" } else { "ok" };

    println!(
        "Backpressure: {}",
        status(report.has_cyclical_backpressure())
    );
    for cycle in &report.cyclical_backpressure {
        println!("  cycle: {}", names(graph, &cycle.vertices).join(" -> "));
    }

    println!(
        "Direct:       {}",
        status(report.has_illegal_direct_scheduler_usage())
    );
    for fan_in in &report.direct_scheduler_usage.fan_in {
        println!(
            "  {} is fed by {}",
            graph.vertex(fan_in.vertex).name(),
            names(graph, &fan_in.origins).join(", ")
        );
    }
    for member in &report.direct_scheduler_usage.in_blocking_cycles {
        println!(
            "  note: {} is inside cycle {}",
            graph.vertex(member.vertex).name(),
            member.cycle
        );
    }

    println!(
        "Unbound:      {}",
        status(report.has_unbound_input_wires())
    );
    for wire in &report.unbound_input_wires {
        println!("  {wire}");
    }
}

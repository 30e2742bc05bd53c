//! Render a topology file as a Mermaid flowchart.

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Args;
use solder_core::{DiagramOptions, ModelEdgeSubstitution, ModelGroup, generate_wiring_diagram};

use super::common::load_graph;

/// Write the wiring diagram of a topology.
#[derive(Args)]
pub struct DiagramArgs {
    /// Topology file (TOML)
    pub topology: PathBuf,

    /// Feed every unsoldered input from one shared mystery node
    #[arg(long)]
    pub more_mystery: bool,

    /// Group vertices: NAME=a,b,c (repeatable)
    #[arg(long = "group", value_name = "NAME=MEMBERS")]
    pub groups: Vec<String>,

    /// Draw a group as a single node (repeatable)
    #[arg(long = "collapse", value_name = "NAME")]
    pub collapse: Vec<String>,

    /// Replace edges leaving SOURCE on LABEL with SYMBOL: SOURCE:LABEL=SYMBOL (repeatable)
    #[arg(long = "substitute", value_name = "SOURCE:LABEL=SYMBOL")]
    pub substitutions: Vec<String>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Run the diagram command.
pub fn run(args: DiagramArgs) -> anyhow::Result<()> {
    let (_, graph) = load_graph(&args.topology)?;
    let options = build_options(&args)?;
    let diagram = generate_wiring_diagram(&graph, &options);

    match &args.output {
        Some(path) => {
            std::fs::write(path, &diagram)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Wrote diagram to {}", path.display());
        }
        None => print!("{diagram}"),
    }
    Ok(())
}

fn build_options(args: &DiagramArgs) -> anyhow::Result<DiagramOptions> {
    let mut groups = args
        .groups
        .iter()
        .map(|g| parse_group(g))
        .collect::<anyhow::Result<Vec<_>>>()?;

    for name in &args.collapse {
        let Some(group) = groups.iter_mut().find(|g| &g.name == name) else {
            bail!("--collapse {name}: no such group");
        };
        group.collapse = true;
    }

    let substitutions = args
        .substitutions
        .iter()
        .map(|s| parse_substitution(s))
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(DiagramOptions {
        groups,
        substitutions,
        manual_links: Vec::new(),
        more_mystery: args.more_mystery,
    })
}

/// Parse `NAME=a,b,c`.
fn parse_group(text: &str) -> anyhow::Result<ModelGroup> {
    let Some((name, members)) = text.split_once('=') else {
        bail!("invalid group '{text}': expected NAME=a,b,c");
    };
    let elements: BTreeSet<String> = members
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
        .collect();
    if name.trim().is_empty() || elements.is_empty() {
        bail!("invalid group '{text}': expected NAME=a,b,c");
    }
    Ok(ModelGroup {
        name: name.trim().to_string(),
        elements,
        collapse: false,
    })
}

/// Parse `SOURCE:LABEL=SYMBOL`.
fn parse_substitution(text: &str) -> anyhow::Result<ModelEdgeSubstitution> {
    let parsed = text.split_once('=').and_then(|(edge, symbol)| {
        edge.split_once(':')
            .map(|(source, label)| (source.trim(), label.trim(), symbol.trim()))
    });
    match parsed {
        Some((source, label, symbol))
            if !source.is_empty() && !label.is_empty() && !symbol.is_empty() =>
        {
            Ok(ModelEdgeSubstitution {
                source: source.to_string(),
                label: label.to_string(),
                substitution: symbol.to_string(),
            })
        }
        _ => bail!("invalid substitution '{text}': expected SOURCE:LABEL=SYMBOL"),
    }
}

//! Drive a topology file through a deterministic model.
//!
//! Every vertex becomes a scheduler of `u64` values. A value is its hop
//! count: each delivery logs it and forwards `value + 1`, and values past
//! `--max-hops` are dropped so that cycles terminate. Vertices with no
//! incoming edge are fed from a heartbeat on their `beat` input.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Args;
use solder_config::TopologySpec;
use solder_core::{
    GraphModel, InputWire, SchedulerType, SimulatedClock, SolderType, TaskScheduler, WiringModel,
};

use super::common::{load_graph, topology_name};

/// Input added to source vertices.
const BEAT_INPUT: &str = "beat";

/// Simulate a topology tick by tick.
#[derive(Args)]
pub struct SimulateArgs {
    /// Topology file (TOML)
    pub topology: PathBuf,

    /// Number of ticks to run
    #[arg(short = 'n', long, default_value_t = 10)]
    pub ticks: usize,

    /// Simulated milliseconds per tick
    #[arg(long, default_value_t = 10)]
    pub tick_ms: u64,

    /// Heartbeat period feeding source vertices, in milliseconds
    #[arg(long, default_value_t = 20)]
    pub period_ms: u64,

    /// Drop values after this many hops
    #[arg(long, default_value_t = 32)]
    pub max_hops: u64,
}

/// Counts for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickStats {
    /// Handlers run during the tick, source beats included.
    pub deliveries: u64,
    /// Work queued for the next tick.
    pub pending: usize,
}

/// A started deterministic model built from a topology.
pub struct Simulation {
    model: WiringModel,
    clock: Arc<SimulatedClock>,
    step: Duration,
    deliveries: Arc<AtomicU64>,
}

impl Simulation {
    /// Builds and starts the model.
    pub fn build(
        spec: &TopologySpec,
        graph: &GraphModel,
        step: Duration,
        period: Duration,
        max_hops: u64,
    ) -> anyhow::Result<Self> {
        let clock = Arc::new(SimulatedClock::new());
        let model = WiringModel::deterministic(Arc::clone(&clock));
        let deliveries = Arc::new(AtomicU64::new(0));

        let mut schedulers: BTreeMap<String, TaskScheduler<u64>> = BTreeMap::new();
        for vertex in graph.vertices() {
            let mut builder = model
                .new_scheduler_builder::<u64>(vertex.name())?
                .with_type(vertex.scheduler_type());
            if let Some(declared) = spec.scheduler(vertex.name()) {
                if let Some(capacity) = declared.capacity {
                    builder = builder.with_unhandled_task_capacity(capacity);
                }
                builder = builder.with_external_back_pressure(declared.external_back_pressure);
            }
            schedulers.insert(vertex.name().to_string(), builder.build()?);
        }

        let mut inputs: BTreeMap<(String, String), InputWire<u64, u64>> = BTreeMap::new();
        let declared = spec
            .inputs
            .iter()
            .map(|i| (i.scheduler.as_str(), i.name.as_str(), i.bound));
        let from_edges = spec
            .edges
            .iter()
            .filter(|e| !e.auto_inserted)
            .map(|e| (e.to.as_str(), e.input.as_str(), true));
        for (scheduler_name, input_name, bound) in declared.chain(from_edges) {
            let key = (scheduler_name.to_string(), input_name.to_string());
            if inputs.contains_key(&key) {
                continue;
            }
            let scheduler = schedulers
                .get(scheduler_name)
                .with_context(|| format!("input {input_name} on unknown vertex {scheduler_name}"))?;
            let wire = scheduler.build_input_wire::<u64>(input_name)?;
            if bound {
                wire.bind(delivery_handler(
                    format!("{scheduler_name}.{input_name}"),
                    Arc::clone(&deliveries),
                    max_hops,
                ))?;
            }
            inputs.insert(key, wire);
        }

        for edge in spec.edges.iter().filter(|e| !e.auto_inserted) {
            let origin = schedulers
                .get(&edge.from)
                .with_context(|| format!("edge from unknown vertex {}", edge.from))?;
            let input = inputs
                .get(&(edge.to.clone(), edge.input.clone()))
                .with_context(|| format!("edge into unknown input {}.{}", edge.to, edge.input))?;
            origin.output_wire().solder_to(input, edge.parsed_solder()?)?;
        }

        let sources: Vec<&str> = graph
            .vertices()
            .iter()
            .filter(|v| v.scheduler_type() != SchedulerType::NoOp)
            .filter(|v| graph.incoming_edges(v.id()).next().is_none())
            .map(|v| v.name())
            .collect();
        if !sources.is_empty() {
            let heartbeat = model.build_heartbeat_wire(period)?;
            for name in sources {
                if inputs.contains_key(&(name.to_string(), BEAT_INPUT.to_string())) {
                    tracing::warn!("{name} already has a '{BEAT_INPUT}' input, not feeding it");
                    continue;
                }
                let Some(scheduler) = schedulers.get(name) else {
                    continue;
                };
                let beat = scheduler.build_input_wire::<Instant>(BEAT_INPUT)?;
                let counter = Arc::clone(&deliveries);
                let label = format!("{name}.{BEAT_INPUT}");
                beat.bind(move |_now: Instant| {
                    counter.fetch_add(1, Ordering::Relaxed);
                    tracing::info!("simulate_deliver: {label} <- beat");
                    Some(0)
                })?;
                heartbeat.solder_to(&beat, SolderType::Put)?;
            }
        }

        let report = model.start()?;
        if report.has_problems() {
            tracing::warn!("simulating a topology that failed its checks");
        }

        Ok(Self {
            model,
            clock,
            step,
            deliveries,
        })
    }

    /// Advances the clock by one step and runs one tick.
    pub fn tick(&self) -> anyhow::Result<TickStats> {
        self.clock.advance(self.step);
        self.model.tick()?;
        Ok(TickStats {
            deliveries: self.deliveries.swap(0, Ordering::Relaxed),
            pending: self.model.pending_work(),
        })
    }

    /// Stops the model.
    pub fn stop(&self) -> anyhow::Result<()> {
        Ok(self.model.stop()?)
    }
}

fn delivery_handler(
    label: String,
    deliveries: Arc<AtomicU64>,
    max_hops: u64,
) -> impl Fn(u64) -> Option<u64> + Send + Sync + 'static {
    move |value| {
        deliveries.fetch_add(1, Ordering::Relaxed);
        tracing::info!("simulate_deliver: {label} <- {value}");
        (value < max_hops).then_some(value + 1)
    }
}

/// Run the simulate command.
pub fn run(args: SimulateArgs) -> anyhow::Result<()> {
    let (spec, graph) = load_graph(&args.topology)?;
    let simulation = Simulation::build(
        &spec,
        &graph,
        Duration::from_millis(args.tick_ms),
        Duration::from_millis(args.period_ms.max(1)),
        args.max_hops,
    )?;

    println!(
        "Simulating {} for {} ticks ({} ms each)",
        topology_name(&spec, &args.topology),
        args.ticks,
        args.tick_ms
    );
    let mut total = 0;
    for tick in 1..=args.ticks {
        let stats = simulation.tick()?;
        total += stats.deliveries;
        println!(
            "tick {tick:>4}: {:>6} deliveries, {:>6} pending",
            stats.deliveries, stats.pending
        );
    }
    println!("Total:       {total} deliveries");
    simulation.stop()
}

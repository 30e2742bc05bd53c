//! Solder Core - statically verified wiring of scheduling units
//!
//! This crate lets independent processing stages ("scheduling units") be
//! composed into a directed dataflow graph, and checks that graph before it
//! runs for deadlock-prone backpressure cycles, misuse of direct schedulers,
//! and inputs nobody feeds.
//!
//! # Core Abstractions
//!
//! ## Graph
//!
//! - [`GraphModel`] - Arena of vertices, edges and input wire sets
//! - [`Vertex`], [`Edge`], [`InputWireDescriptor`] - Topology records
//! - [`SchedulerType`] - How a unit executes its tasks
//! - [`SolderType`] - How an edge treats capacity (PUT / OFFER / INJECT)
//!
//! ## Analysis
//!
//! - [`check_for_cyclical_backpressure`] - Tarjan SCC over blocking edges
//! - [`check_for_illegal_direct_scheduler_usage`] - DIRECT fan-in
//! - [`check_for_unbound_input_wires`] - Created but unbound inputs
//! - [`analyze`] - All three as a [`TopologyReport`]
//!
//! ## Model and Runtimes
//!
//! - [`WiringModel`] - Registration, lifecycle, and runtime selection
//! - [`TaskScheduler`], [`SchedulerBuilder`] - Scheduling units
//! - [`InputWire`], [`OutputWire`] - Typed connections
//! - [`ConcurrentSettings`] - Worker pool, health monitor, keep-alive
//! - [`SimulatedClock`] - Time source for the deterministic runtime
//! - [`HealthMonitor`] - Backlog tracking over monitored units
//!
//! ## Rendering
//!
//! - [`generate_wiring_diagram`] - Mermaid flowchart of a graph
//!
//! # Example
//!
//! ```rust,ignore
//! use solder_core::{SchedulerType, SolderType, WiringModel, ConcurrentSettings};
//!
//! let model = WiringModel::concurrent(ConcurrentSettings::default())?;
//!
//! let hasher: TaskScheduler<u64> = model
//!     .new_scheduler_builder("hasher")?
//!     .with_type(SchedulerType::Concurrent)
//!     .with_unhandled_task_capacity(500)
//!     .build()?;
//! let events = hasher.build_input_wire::<Vec<u8>>("events")?;
//! events.bind(|bytes| Some(hash(&bytes)))?;
//!
//! hasher.output_wire().solder_consumer("printer", |h| println!("{h:x}"))?;
//!
//! let report = model.start()?;
//! assert!(!report.has_problems());
//! events.put(b"hello".to_vec());
//! ```
//!
//! # Design Principles
//!
//! - **Verify before running**: topology checks run once at `start()` over a frozen graph
//! - **Findings are not errors**: checks log and report, the caller decides
//! - **No globals**: worker pools are injected, several models may coexist
//! - **Same semantics, two clocks**: concurrent and deterministic runtimes share the graph

pub mod analysis;
pub mod clock;
pub mod diagram;
pub mod error;
pub mod graph;
pub mod health;
pub mod model;
pub mod runtime;
pub mod scheduler;
pub mod wire;

// Re-export main types at crate root
pub use analysis::{
    BackpressureCycle, DirectFanIn, DirectInBlockingCycle, DirectSchedulerUsage, TopologyReport,
    analyze, check_for_cyclical_backpressure, check_for_illegal_direct_scheduler_usage,
    check_for_unbound_input_wires, find_cyclical_backpressure,
    find_illegal_direct_scheduler_usage, find_unbound_input_wires, run_checks,
};
pub use clock::SimulatedClock;
pub use diagram::{
    DiagramOptions, ModelEdgeSubstitution, ModelGroup, ModelManualLink, generate_wiring_diagram,
};
pub use error::{Result, WiringError};
pub use graph::{
    Edge, EdgeId, GraphModel, InputWireDescriptor, InputWireRegistry, SchedulerType, SolderType,
    Vertex, VertexId, VertexOrigin, is_valid_name,
};
pub use health::HealthMonitor;
pub use model::{HEALTH_MONITOR_VERTEX, ModelState, WiringModel};
pub use runtime::ConcurrentSettings;
pub use scheduler::{SchedulerBuilder, TaskScheduler};
pub use wire::{InputWire, OutputWire};

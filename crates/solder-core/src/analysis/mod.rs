//! Static topology checks.
//!
//! Three read-only, idempotent checks over a [`GraphModel`]:
//!
//! 1. [`check_for_cyclical_backpressure`] - cycles made only of blocking edges
//! 2. [`check_for_illegal_direct_scheduler_usage`] - DIRECT fan-in from
//!    several origins
//! 3. [`check_for_unbound_input_wires`] - inputs that never got a handler
//!
//! Each returns `true` when it found a problem and logs one `error` line per
//! finding. None of them fail or halt startup; deciding whether a finding is
//! fatal is left to the caller. The `find_*` variants return the findings
//! without logging.

pub mod backpressure;
pub mod direct;
pub mod unbound;

pub use backpressure::{
    BackpressureCycle, check_for_cyclical_backpressure, find_cyclical_backpressure,
};
pub use direct::{
    DirectFanIn, DirectInBlockingCycle, DirectSchedulerUsage,
    check_for_illegal_direct_scheduler_usage, find_illegal_direct_scheduler_usage,
};
pub use unbound::{check_for_unbound_input_wires, find_unbound_input_wires};

use crate::graph::{GraphModel, InputWireDescriptor};

/// Findings of all three checks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TopologyReport {
    /// Blocking cycles.
    pub cyclical_backpressure: Vec<BackpressureCycle>,
    /// Direct-scheduler findings.
    pub direct_scheduler_usage: DirectSchedulerUsage,
    /// Created but unbound inputs.
    pub unbound_input_wires: Vec<InputWireDescriptor>,
}

impl TopologyReport {
    /// Whether the backpressure check found a problem.
    pub fn has_cyclical_backpressure(&self) -> bool {
        !self.cyclical_backpressure.is_empty()
    }

    /// Whether the direct-scheduler check found a problem.
    pub fn has_illegal_direct_scheduler_usage(&self) -> bool {
        self.direct_scheduler_usage.has_violations()
    }

    /// Whether the unbound-input check found a problem.
    pub fn has_unbound_input_wires(&self) -> bool {
        !self.unbound_input_wires.is_empty()
    }

    /// True if any check found a problem.
    pub fn has_problems(&self) -> bool {
        self.has_cyclical_backpressure()
            || self.has_illegal_direct_scheduler_usage()
            || self.has_unbound_input_wires()
    }
}

/// Runs all three checks without logging.
pub fn analyze(graph: &GraphModel) -> TopologyReport {
    let cyclical_backpressure = find_cyclical_backpressure(graph);
    let direct_scheduler_usage = find_illegal_direct_scheduler_usage(graph, &cyclical_backpressure);
    TopologyReport {
        cyclical_backpressure,
        direct_scheduler_usage,
        unbound_input_wires: find_unbound_input_wires(graph),
    }
}

/// Runs all three checks in order, logging every finding.
pub fn run_checks(graph: &GraphModel) -> TopologyReport {
    let report = analyze(graph);
    backpressure::log_cycles(graph, &report.cyclical_backpressure);
    direct::log_direct_usage(
        graph,
        &report.cyclical_backpressure,
        &report.direct_scheduler_usage,
    );
    unbound::log_unbound(&report.unbound_input_wires);
    if report.has_problems() {
        tracing::warn!(
            cycles = report.cyclical_backpressure.len(),
            direct_fan_in = report.direct_scheduler_usage.fan_in.len(),
            unbound = report.unbound_input_wires.len(),
            "wiring topology has problems"
        );
    } else {
        tracing::info!(
            vertices = graph.vertex_count(),
            edges = graph.edge_count(),
            "wiring topology passed all checks"
        );
    }
    report
}

//! Illegal direct-scheduler usage.
//!
//! A [`Direct`](SchedulerType::Direct) vertex runs its handler on whichever
//! thread inserted the data and is not reentrant, so it may only be fed by
//! one upstream vertex. Several edges from that one origin are fine.
//! [`DirectThreadsafe`](SchedulerType::DirectThreadsafe) lifts the
//! single-origin rule.
//!
//! Either direct type sitting inside a blocking cycle is also reported,
//! referencing the cycle found by the backpressure check. That
//! cross-report is informational: the cycle itself is already a finding.

use std::collections::BTreeSet;

use crate::graph::{GraphModel, SchedulerType, VertexId};

use super::backpressure::{BackpressureCycle, find_cyclical_backpressure};

/// A DIRECT vertex fed by more than one distinct origin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectFanIn {
    /// The DIRECT vertex.
    pub vertex: VertexId,
    /// Distinct origins, ascending.
    pub origins: Vec<VertexId>,
}

/// A direct vertex that is a member of a blocking cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectInBlockingCycle {
    /// The direct vertex.
    pub vertex: VertexId,
    /// Index into the cycles the backpressure check returned.
    pub cycle: usize,
}

/// Findings of the direct-scheduler check.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DirectSchedulerUsage {
    /// Single-origin violations. These make the check fail.
    pub fan_in: Vec<DirectFanIn>,
    /// Cross-references into blocking cycles.
    pub in_blocking_cycles: Vec<DirectInBlockingCycle>,
}

impl DirectSchedulerUsage {
    /// True if any single-origin violation was found.
    pub fn has_violations(&self) -> bool {
        !self.fan_in.is_empty()
    }
}

/// Computes direct-scheduler findings against already-found `cycles`.
pub fn find_illegal_direct_scheduler_usage(
    graph: &GraphModel,
    cycles: &[BackpressureCycle],
) -> DirectSchedulerUsage {
    let mut usage = DirectSchedulerUsage::default();

    for vertex in graph.vertices() {
        let id = vertex.id();
        match vertex.scheduler_type() {
            SchedulerType::Direct => {
                let origins: BTreeSet<VertexId> =
                    graph.incoming_edges(id).map(|e| e.origin()).collect();
                if origins.len() > 1 {
                    usage.fan_in.push(DirectFanIn {
                        vertex: id,
                        origins: origins.into_iter().collect(),
                    });
                }
            }
            SchedulerType::DirectThreadsafe => {}
            _ => continue,
        }

        if let Some(cycle) = cycles.iter().position(|c| c.contains(id)) {
            usage
                .in_blocking_cycles
                .push(DirectInBlockingCycle { vertex: id, cycle });
        }
    }

    usage
}

pub(crate) fn log_direct_usage(
    graph: &GraphModel,
    cycles: &[BackpressureCycle],
    usage: &DirectSchedulerUsage,
) {
    for finding in &usage.fan_in {
        let origins: Vec<&str> = finding
            .origins
            .iter()
            .map(|&o| graph.vertex(o).name())
            .collect();
        tracing::error!(
            "illegal direct scheduler usage: {} is DIRECT but is fed by {} origins [{}]",
            graph.vertex(finding.vertex).name(),
            origins.len(),
            origins.join(", ")
        );
    }
    for finding in &usage.in_blocking_cycles {
        let vertex = graph.vertex(finding.vertex);
        tracing::error!(
            "direct scheduler {} ({}) is part of blocking cycle {}",
            vertex.name(),
            vertex.scheduler_type(),
            cycles[finding.cycle].describe(graph)
        );
    }
}

/// Returns true and logs each finding if a DIRECT vertex has several origins.
pub fn check_for_illegal_direct_scheduler_usage(graph: &GraphModel) -> bool {
    let cycles = find_cyclical_backpressure(graph);
    let usage = find_illegal_direct_scheduler_usage(graph, &cycles);
    log_direct_usage(graph, &cycles, &usage);
    usage.has_violations()
}

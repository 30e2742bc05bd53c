//! Input wire bookkeeping.
//!
//! Every named input slot goes through up to three states: *created* (the
//! scheduler declared it), *bound* (a handler was attached), *soldered* (an
//! edge targets it). The registry enforces that a slot is created once and
//! bound at most once; "bound at least once" is checked at start by the
//! unbound-input analyzer.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::{Result, WiringError};

/// Identity of one named input on one scheduler.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InputWireDescriptor {
    /// Owning scheduler name.
    pub scheduler_name: String,
    /// Input wire name.
    pub wire_name: String,
}

impl InputWireDescriptor {
    /// Create a descriptor from borrowed names.
    pub fn new(scheduler_name: impl Into<String>, wire_name: impl Into<String>) -> Self {
        Self {
            scheduler_name: scheduler_name.into(),
            wire_name: wire_name.into(),
        }
    }
}

impl fmt::Display for InputWireDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.scheduler_name, self.wire_name)
    }
}

/// The created / bound / soldered descriptor sets.
///
/// Ordered sets keep every report in a stable, name-sorted order.
#[derive(Clone, Debug, Default)]
pub struct InputWireRegistry {
    created: BTreeSet<InputWireDescriptor>,
    bound: BTreeSet<InputWireDescriptor>,
    soldered: BTreeSet<InputWireDescriptor>,
}

impl InputWireRegistry {
    /// Records that `wire_name` exists on `scheduler_name`.
    pub fn register_created(&mut self, scheduler_name: &str, wire_name: &str) -> Result<()> {
        let descriptor = InputWireDescriptor::new(scheduler_name, wire_name);
        if !self.created.insert(descriptor) {
            return Err(WiringError::DuplicateInputWire {
                scheduler: scheduler_name.to_string(),
                wire: wire_name.to_string(),
            });
        }
        Ok(())
    }

    /// Records that a handler was attached to an already-created wire.
    pub fn register_bound(&mut self, scheduler_name: &str, wire_name: &str) -> Result<()> {
        let descriptor = InputWireDescriptor::new(scheduler_name, wire_name);
        if !self.created.contains(&descriptor) {
            return Err(WiringError::UnknownInputWire {
                scheduler: scheduler_name.to_string(),
                wire: wire_name.to_string(),
            });
        }
        if !self.bound.insert(descriptor) {
            return Err(WiringError::already_bound(scheduler_name, wire_name));
        }
        Ok(())
    }

    /// Records that an edge targets this input. Idempotent.
    pub fn register_soldered(&mut self, scheduler_name: &str, wire_name: &str) {
        self.soldered
            .insert(InputWireDescriptor::new(scheduler_name, wire_name));
    }

    /// Descriptors declared to exist.
    pub fn created(&self) -> &BTreeSet<InputWireDescriptor> {
        &self.created
    }

    /// Descriptors with a handler.
    pub fn bound(&self) -> &BTreeSet<InputWireDescriptor> {
        &self.bound
    }

    /// Descriptors targeted by at least one edge.
    pub fn soldered(&self) -> &BTreeSet<InputWireDescriptor> {
        &self.soldered
    }

    /// `created \ bound`, in sorted order.
    pub fn unbound(&self) -> impl Iterator<Item = &InputWireDescriptor> {
        self.created.difference(&self.bound)
    }

    /// `created \ soldered`: inputs fed from outside the graph.
    pub fn unsoldered(&self) -> impl Iterator<Item = &InputWireDescriptor> {
        self.created.difference(&self.soldered)
    }
}

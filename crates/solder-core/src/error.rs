//! Configuration errors raised while building a wiring model.
//!
//! Every variant here is a programmer error: it is returned from the call
//! that caused it and is never retried. Topology-quality findings (cycles,
//! direct-scheduler misuse, unbound inputs) are not errors; see
//! [`analysis`](crate::analysis).

use thiserror::Error;

use crate::model::ModelState;

/// Errors returned by graph registration and model lifecycle operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WiringError {
    /// A vertex with this name was already registered.
    #[error("vertex '{0}' is already registered")]
    DuplicateVertex(String),

    /// The (origin, destination, label) triple was already registered.
    #[error("edge {origin} -> {destination} ({label}) is already registered")]
    DuplicateEdge {
        /// Name of the origin vertex.
        origin: String,
        /// Name of the destination vertex.
        destination: String,
        /// Destination input name.
        label: String,
    },

    /// No vertex with this name exists.
    #[error("unknown vertex '{0}'")]
    UnknownVertex(String),

    /// Vertex names must be non-empty and only contain `[A-Za-z0-9_]`.
    #[error("invalid name '{0}': only alphanumeric characters and underscores are allowed")]
    InvalidName(String),

    /// The input wire was already declared on this scheduler.
    #[error("input wire '{wire}' on '{scheduler}' was already created")]
    DuplicateInputWire {
        /// Owning scheduler name.
        scheduler: String,
        /// Input wire name.
        wire: String,
    },

    /// Binding was attempted on an input wire that was never created.
    #[error("input wire '{wire}' on '{scheduler}' was never created")]
    UnknownInputWire {
        /// Owning scheduler name.
        scheduler: String,
        /// Input wire name.
        wire: String,
    },

    /// The input wire already has a handler.
    #[error("input wire '{wire}' on '{scheduler}' is already bound")]
    InputWireAlreadyBound {
        /// Owning scheduler name.
        scheduler: String,
        /// Input wire name.
        wire: String,
    },

    /// The operation is not legal in the model's current lifecycle state.
    #[error("cannot {operation} while the model is {state}")]
    IllegalState {
        /// The attempted operation.
        operation: &'static str,
        /// State the model was in.
        state: ModelState,
    },

    /// The operation only exists on the other runtime.
    #[error("{operation} is not supported by the {runtime} runtime")]
    UnsupportedOperation {
        /// The attempted operation.
        operation: &'static str,
        /// Runtime the model was built with.
        runtime: &'static str,
    },

    /// Heartbeat period or frequency is zero, negative, or not finite.
    #[error("invalid heartbeat: {0}")]
    InvalidHeartbeat(String),

    /// The shared worker pool could not be built.
    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),

    /// A dedicated scheduler thread could not be spawned.
    #[error("failed to spawn thread for '{name}': {reason}")]
    ThreadSpawn {
        /// Scheduler name.
        name: String,
        /// OS error text.
        reason: String,
    },
}

impl WiringError {
    /// Builds an [`InputWireAlreadyBound`](Self::InputWireAlreadyBound) from borrowed names.
    pub(crate) fn already_bound(scheduler: &str, wire: &str) -> Self {
        Self::InputWireAlreadyBound {
            scheduler: scheduler.to_string(),
            wire: wire.to_string(),
        }
    }

    /// True for errors caused by calling an operation in the wrong lifecycle state.
    pub fn is_state_error(&self) -> bool {
        matches!(self, Self::IllegalState { .. })
    }
}

/// Result alias for wiring operations.
pub type Result<T> = std::result::Result<T, WiringError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_edge_display() {
        let err = WiringError::DuplicateEdge {
            origin: "a".to_string(),
            destination: "b".to_string(),
            label: "data".to_string(),
        };
        assert_eq!(err.to_string(), "edge a -> b (data) is already registered");
    }

    #[test]
    fn illegal_state_display_names_state() {
        let err = WiringError::IllegalState {
            operation: "register a vertex",
            state: ModelState::Started,
        };
        let msg = err.to_string();
        assert!(msg.contains("register a vertex"), "got: {msg}");
        assert!(msg.contains("started"), "got: {msg}");
        assert!(err.is_state_error());
    }

    #[test]
    fn already_bound_factory() {
        let err = WiringError::already_bound("sched", "in");
        assert!(matches!(
            err,
            WiringError::InputWireAlreadyBound { ref scheduler, ref wire }
                if scheduler == "sched" && wire == "in"
        ));
        assert!(!err.is_state_error());
    }
}

//! Vertex types for the wiring graph.
//!
//! Each registered scheduling unit becomes a [`Vertex`] with a [`VertexId`].
//! Vertices are never removed, so ids are dense indices into the model's
//! vertex arena and stay valid for the model's lifetime.

use core::fmt;

use super::edge::EdgeId;

/// Unique identifier for a vertex in the wiring graph.
///
/// Ids are assigned sequentially in registration order and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VertexId(pub(crate) u32);

impl VertexId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) fn slot(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VertexId({})", self.0)
    }
}

/// How a scheduling unit executes the work handed to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SchedulerType {
    /// Tasks run one at a time, in order, on a worker pool.
    Sequential,
    /// Tasks run one at a time, in order, on a thread owned by the unit.
    DedicatedThread,
    /// Tasks run in parallel on a worker pool with no ordering.
    Concurrent,
    /// Tasks run synchronously on the inserting thread. Not reentrant.
    Direct,
    /// Like [`Direct`](Self::Direct) but safe to call from several threads.
    DirectThreadsafe,
    /// Tasks are discarded.
    NoOp,
}

impl SchedulerType {
    /// All scheduler types, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Sequential,
        Self::DedicatedThread,
        Self::Concurrent,
        Self::Direct,
        Self::DirectThreadsafe,
        Self::NoOp,
    ];

    /// Canonical upper-snake name (e.g. `"DEDICATED_THREAD"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sequential => "SEQUENTIAL",
            Self::DedicatedThread => "DEDICATED_THREAD",
            Self::Concurrent => "CONCURRENT",
            Self::Direct => "DIRECT",
            Self::DirectThreadsafe => "DIRECT_THREADSAFE",
            Self::NoOp => "NO_OP",
        }
    }

    /// Parses a canonical name, ignoring ASCII case.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(name))
    }

    /// True for the two types that execute on the caller's thread.
    pub fn is_direct(self) -> bool {
        matches!(self, Self::Direct | Self::DirectThreadsafe)
    }
}

impl fmt::Display for SchedulerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a vertex was registered by its owner or inferred from an edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexOrigin {
    /// Registered explicitly through `register_vertex`.
    Declared,
    /// Created on demand because an edge named an unknown endpoint.
    Synthesized,
}

/// One scheduling unit in the wiring graph.
#[derive(Clone, Debug)]
pub struct Vertex {
    pub(crate) id: VertexId,
    pub(crate) name: String,
    pub(crate) scheduler_type: SchedulerType,
    pub(crate) insertion_is_blocking: bool,
    pub(crate) origin: VertexOrigin,
    /// Edges leaving this vertex, in registration order.
    pub(crate) outgoing: Vec<EdgeId>,
    /// Edges arriving at this vertex, in registration order.
    pub(crate) incoming: Vec<EdgeId>,
}

impl Vertex {
    pub(crate) fn new(
        id: VertexId,
        name: String,
        scheduler_type: SchedulerType,
        insertion_is_blocking: bool,
        origin: VertexOrigin,
    ) -> Self {
        Self {
            id,
            name,
            scheduler_type,
            insertion_is_blocking,
            origin,
            outgoing: Vec::new(),
            incoming: Vec::new(),
        }
    }

    /// Arena id of this vertex.
    pub fn id(&self) -> VertexId {
        self.id
    }

    /// Unique vertex name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Execution discipline of the scheduling unit.
    pub fn scheduler_type(&self) -> SchedulerType {
        self.scheduler_type
    }

    /// Whether inserting into this vertex may suspend the inserter.
    pub fn insertion_is_blocking(&self) -> bool {
        self.insertion_is_blocking
    }

    /// Declared or synthesized.
    pub fn origin(&self) -> VertexOrigin {
        self.origin
    }

    /// Outgoing edge ids in registration order.
    pub fn outgoing_edges(&self) -> &[EdgeId] {
        &self.outgoing
    }

    /// Incoming edge ids in registration order.
    pub fn incoming_edges(&self) -> &[EdgeId] {
        &self.incoming
    }
}

/// True if `name` is non-empty and only contains `[A-Za-z0-9_]`.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduler_type_round_trips_through_name() {
        for t in SchedulerType::ALL {
            assert_eq!(SchedulerType::parse(t.as_str()), Some(t));
        }
        assert_eq!(
            SchedulerType::parse("direct_threadsafe"),
            Some(SchedulerType::DirectThreadsafe)
        );
        assert_eq!(SchedulerType::parse("threaded"), None);
    }

    #[test]
    fn name_rule() {
        assert!(is_valid_name("event_intake_2"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("event intake"));
        assert!(!is_valid_name("event-intake"));
    }
}

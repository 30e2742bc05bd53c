//! Edge types for the wiring graph.
//!
//! An [`Edge`] records that an output wire of one vertex was soldered to a
//! named input of another. Whether the edge can apply backpressure is fixed
//! at registration: only [`SolderType::Put`] into an insertion-blocking
//! destination is blocking.

use core::fmt;

use super::vertex::VertexId;

/// Unique identifier for an edge in the wiring graph.
///
/// Edge ids are assigned sequentially and never reused within a model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeId(pub(crate) u32);

impl EdgeId {
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

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdgeId({})", self.0)
    }
}

/// How data crosses a soldered connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum SolderType {
    /// Respect the destination's capacity, waiting for room if needed.
    #[default]
    Put,
    /// Drop the data if the destination is at capacity.
    Offer,
    /// Ignore the destination's capacity.
    Inject,
}

impl SolderType {
    /// Lowercase name used in topology files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Put => "put",
            Self::Offer => "offer",
            Self::Inject => "inject",
        }
    }

    /// Parses a lowercase name, ignoring ASCII case.
    pub fn parse(name: &str) -> Option<Self> {
        [Self::Put, Self::Offer, Self::Inject]
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for SolderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed connection from an origin's output to a destination's input.
#[derive(Clone, Debug)]
pub struct Edge {
    pub(crate) id: EdgeId,
    pub(crate) origin: VertexId,
    pub(crate) destination: VertexId,
    pub(crate) label: String,
    pub(crate) solder_type: SolderType,
    pub(crate) is_blocking: bool,
    pub(crate) is_auto_inserted: bool,
}

impl Edge {
    /// Arena id of this edge.
    pub fn id(&self) -> EdgeId {
        self.id
    }

    /// Origin vertex.
    pub fn origin(&self) -> VertexId {
        self.origin
    }

    /// Destination vertex.
    pub fn destination(&self) -> VertexId {
        self.destination
    }

    /// Name of the destination input.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Transfer discipline used when the edge was soldered.
    pub fn solder_type(&self) -> SolderType {
        self.solder_type
    }

    /// True if inserting along this edge may block the origin.
    pub fn is_blocking(&self) -> bool {
        self.is_blocking
    }

    /// True for placeholder edges added by tooling rather than by a wire.
    pub fn is_auto_inserted(&self) -> bool {
        self.is_auto_inserted
    }
}

//! Arena-backed topology record for the wiring model.
//!
//! The graph module holds everything the analyzers need and nothing the
//! runtimes need:
//!
//! - [`Vertex`] - one scheduling unit: name, [`SchedulerType`], whether
//!   insertion can block, and whether it was declared or synthesized.
//! - [`Edge`] - one soldered connection, with its [`SolderType`] and derived
//!   `is_blocking` flag.
//! - [`InputWireRegistry`] - the created / bound / soldered descriptor sets.
//!
//! Vertices and edges are stored in vectors and referenced by integer ids.
//! Name lookups exist for registration only; every walk the analyzers do is
//! index arithmetic over a frozen [`GraphModel`].

pub mod edge;
pub mod input_wire;
mod model;
pub mod vertex;

pub use edge::{Edge, EdgeId, SolderType};
pub use input_wire::{InputWireDescriptor, InputWireRegistry};
pub use model::GraphModel;
pub use vertex::{SchedulerType, Vertex, VertexId, VertexOrigin, is_valid_name};

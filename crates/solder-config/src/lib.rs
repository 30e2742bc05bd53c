//! Solder Config - settings and topology files for wiring models
//!
//! This crate reads and writes the two TOML documents the tooling works with:
//!
//! - **Runtime settings** ([`WiringConfig`]) - worker pool size, health
//!   monitor cadence, keep-alive. Converts into
//!   [`ConcurrentSettings`](solder_core::ConcurrentSettings).
//! - **Topology descriptions** ([`TopologySpec`]) - schedulers, input wires
//!   and edges, applied onto a [`GraphModel`](solder_core::GraphModel) so the
//!   analyzers and the diagram generator can run without building a model.
//!
//! # Example
//!
//! ```rust,ignore
//! use solder_config::{TopologySpec, validate_topology};
//!
//! let spec = TopologySpec::load("pipeline.toml")?;
//! validate_topology(&spec)?;
//! let graph = spec.apply()?;
//! let report = solder_core::analyze(&graph);
//! ```
//!
//! # File Locations
//!
//! - Linux: `~/.config/solder/solder.toml`
//! - macOS: `~/Library/Application Support/solder/solder.toml`
//! - Windows: `%APPDATA%\solder\solder.toml`

pub mod error;
mod file;
pub mod paths;
pub mod topology;
pub mod validation;
pub mod wiring_config;

pub use error::ConfigError;
pub use paths::{
    APP_NAME, CONFIG_FILE_NAME, default_config_path, ensure_user_config_dir, find_config,
    user_config_dir,
};
pub use topology::{EdgeSpec, InputSpec, SchedulerSpec, TopologySpec};
pub use validation::{
    ValidationError, ValidationResult, topology_problems, validate_config, validate_topology,
};
pub use wiring_config::WiringConfig;

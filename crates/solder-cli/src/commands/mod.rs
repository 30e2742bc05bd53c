//! CLI command implementations.

pub mod check;
pub mod common;
pub mod diagram;
pub mod info;
pub mod simulate;

//! Container control
//!
//! Brings the managed Pangolin containers down and back up through the
//! compose CLI.

pub mod controller;

pub use controller::{compose_command, ContainerController};

//! Port-rotating restart of the Pangolin deployment

pub mod orchestrator;

pub use orchestrator::{RestartOrchestrator, RestartOutcome};

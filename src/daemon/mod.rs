//! Restart Daemon - HTTP control surface
//!
//! Exposes `/restart`, `/health` and `/config` over HTTP and hands restart
//! requests to the [`RestartOrchestrator`](crate::restart::RestartOrchestrator).

mod api;
mod server;

pub use api::{router, ApiState, HealthConfig, HealthResponse, RESTART_COMMAND, SERVICE_NAME};
pub use server::{shutdown_signal, RestartDaemon};

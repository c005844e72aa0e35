//! Pangolin Restart Service
//!
//! A small HTTP service that restarts a Pangolin deployment on demand and
//! moves its gerbil tunnel endpoint to a freshly drawn random port:
//!
//! - Compose project stop/start through the compose CLI
//! - Gerbil port rewrite in `docker-compose.yml`
//! - Gerbil start port update in the Pangolin `config.yml`
//! - One restart at a time, with a per-step failure message
//! - Live configuration inspection and update

pub mod command;
pub mod compose;
pub mod config;
pub mod container;
pub mod daemon;
pub mod error;
pub mod logging;
pub mod port;
pub mod restart;

pub use error::{EditError, Result, ServiceError};

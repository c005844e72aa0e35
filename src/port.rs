//! Random port allocation

use crate::error::{Result, ServiceError};
use rand::Rng;

/// Pick a port uniformly from `[min, max]`.
///
/// Not cryptographically secure and with no memory of earlier picks; the same
/// port may come back on consecutive calls.
pub fn allocate(min: u16, max: u16) -> Result<u16> {
    if min > max {
        return Err(ServiceError::Configuration(format!(
            "port range min ({}) must not exceed max ({})",
            min, max
        )));
    }

    let port = rand::thread_rng().gen_range(min..=max);
    tracing::info!("Generated random port: {}", port);
    Ok(port)
}

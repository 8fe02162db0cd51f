//! Set command implementation.

use lastvalue_core::{record_key, LastValueService};
use lastvalue_storage::Store;
use tracing::info;

/// Runs the set command: stores `payload` as the last value of `device.service`.
pub fn run(
    service: &LastValueService,
    device: &str,
    service_key: &str,
    payload: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let key = record_key(device, service_key);
    info!("Storing {} bytes under {}", payload.len(), key);
    service.store().set(&key, payload.as_bytes())?;
    Ok(())
}

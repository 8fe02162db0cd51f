//! Ingest command implementation.

use lastvalue_core::LastValueService;
use tracing::info;

/// Runs the ingest command: handles one bus message as the transport would.
pub fn run(
    service: &LastValueService,
    topic: &str,
    payload: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Ingesting message on {}", topic);
    service.ingestor().handle(topic, payload.as_bytes())?;
    Ok(())
}

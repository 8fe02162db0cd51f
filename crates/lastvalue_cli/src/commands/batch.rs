//! Batch command implementation.

use lastvalue_core::LastValueService;
use std::path::Path;
use tracing::info;

/// Runs the batch command: resolves a `/last-values` style request file.
///
/// The file holds a JSON array of `{"DeviceId", "ServiceId", "ColumnName"}`
/// objects; `-` reads from stdin. The response array is printed as JSON.
pub fn run(service: &LastValueService, input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let body = if input == Path::new("-") {
        let mut buf = Vec::new();
        std::io::Read::read_to_end(&mut std::io::stdin(), &mut buf)?;
        buf
    } else {
        std::fs::read(input)?
    };
    info!("Resolving batch from {:?}", input);

    let response = service.last_values().resolve_json(&body).map_err(|e| {
        format!("batch failed with status {}: {}", e.status(), e)
    })?;
    println!("{}", String::from_utf8_lossy(&response));
    Ok(())
}

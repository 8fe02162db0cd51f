//! Get command implementation.

use lastvalue_core::{LastValueRequest, LastValueService};

/// Runs the get command: prints the value at `path` and its write time.
pub fn run(
    service: &LastValueService,
    device: &str,
    service_key: &str,
    path: &str,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let request = LastValueRequest::new(device, service_key, path);
    let mut responses = service.last_values().resolve(&[request])?;
    let response = responses.pop().ok_or("empty response")?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&response)?),
        _ => {
            println!("value: {}", response.value);
            println!("time:  {}", response.time.as_deref().unwrap_or("-"));
        }
    }
    Ok(())
}

//! Weight scale example
//!
//! Scans for a FORA TNG scale, waits for one reading and prints it in both
//! units.
//!
//! Run with: cargo run --example weigh
//!
//! To power the scale off after the reading:
//!   cargo run --example weigh -- --power-off

use ble_health_session::{
    DecoderRegistry, DeviceType, Error, Result, SessionConfig, SessionManager, WeightUnit,
};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,ble_health_session=debug".into()),
        )
        .init();

    println!("Weight Scale");
    println!("============\n");

    let power_off = std::env::args().any(|arg| arg == "--power-off");

    let registry = DecoderRegistry::with_defaults();
    let config = SessionConfig::default()
        .with_scan_timeout(Some(Duration::from_secs(60)))
        .with_power_off_after_measurement(power_off);

    let manager = SessionManager::with_btleplug(&registry, DeviceType::Weight, config).await?;

    let _status = manager.on_status_changed(|status| {
        println!("Bluetooth: {}", status);
    });

    match manager.start_scanning() {
        Ok(()) => println!("Step on the scale...\n"),
        Err(Error::AdapterUnavailable { status }) => {
            println!("Bluetooth is {}, waiting for it to power on...\n", status);
        }
        Err(e) => return Err(e),
    }

    let batch = tokio::time::timeout(Duration::from_secs(120), manager.next_measurements())
        .await
        .map_err(|_| Error::Internal("no reading within two minutes".to_string()))??;

    println!("Reading at {}", batch.received_at.format("%H:%M:%S"));
    if let Some(kg) = batch.weight(WeightUnit::Kilograms) {
        println!("  {:.1} kg", kg);
    }
    if let Some(lb) = batch.weight(WeightUnit::Pounds) {
        println!("  {:.1} lb", lb);
    }

    manager.shutdown().await?;
    Ok(())
}

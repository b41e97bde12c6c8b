//! Example: Discovering Nearby Devices
//!
//! Runs one bounded discovery session over the BLE scanner backed by
//! btleplug. The classic inquiry path is host-specific, so the mock
//! adapter stands in for it here; on a desktop the BLE path is the one
//! that produces results.
//!
//! Run with: `cargo run --example discover_devices`

use std::sync::Arc;

use dualscan_core::mock::{MockPermissions, MockRadio};
use dualscan_core::{BtleScanner, DiscoveryCoordinator, DiscoveryOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    println!("Discovering devices for 12 seconds...");
    println!();

    let coordinator = DiscoveryCoordinator::new(Arc::new(MockRadio::new()))
        .with_scanner(Arc::new(BtleScanner::new().await?))
        .with_permissions(Arc::new(MockPermissions::fully_granted()));

    let on_device = Box::new(|record: &dualscan_core::DeviceRecord| {
        let name = record.display_name.as_deref().unwrap_or("Unknown");
        println!("  found {} ({})", record.address, name);
    });

    let devices = coordinator
        .discover(DiscoveryOptions::default(), Some(on_device))
        .await;

    println!();
    if devices.is_empty() {
        println!("No devices found.");
        println!();
        println!("Make sure:");
        println!("  - Bluetooth is enabled on this computer");
        println!("  - There are advertising devices within range");
    } else {
        println!("Found {} device(s):", devices.len());
        println!();
        for device in &devices {
            let name = device.display_name.as_deref().unwrap_or("Unknown");
            let rssi = device
                .signal_strength
                .map(|r| format!("{} dBm", r))
                .unwrap_or_else(|| "N/A".to_string());
            println!("  {} [{}]", name, device.address);
            println!("    RSSI: {}", rssi);
            println!();
        }
    }

    Ok(())
}

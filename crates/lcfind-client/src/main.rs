//! LC-FIND scanner entry point.
//!
//! Broadcasts a discovery request on every usable interface and prints the
//! devices that answered. `RUST_LOG=debug` shows the raw traffic decisions.

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let devices = lcfind_client::scan().await;

    if devices.is_empty() {
        println!("No devices answered.");
        return Ok(());
    }

    println!(
        "{:<12} {:<18} {:<16} {:<8} {:<20} {:<10} {:<5} via",
        "SN", "MAC", "IP", "Mode", "Status", "Name", "Ping"
    );
    for device in &devices {
        println!(
            "{:<12} {:<18} {:<16} {:<8} {:<20} {:<10} {:<5} {} ({})",
            device.serial_number,
            device.mac_address,
            device.ip_address,
            device.network_mode.to_string(),
            device.status.to_string(),
            device.device_name,
            if device.is_reachable { "ok" } else { "-" },
            device.looker_interface_name,
            device.looker_ip_address,
        );
    }
    Ok(())
}

//! LC-FIND demo host entry point.
//!
//! Runs a discoverable device on this machine: answers `FINDReq` broadcasts
//! with the identity from the config file and stages reconfiguration
//! requests against an in-memory configuration. A real device embeds
//! [`lcfind_host::HostService`] with a delegate that programs the NIC; this
//! binary exists so the protocol can be exercised end-to-end with the
//! `lcfind-client` scanner.
//!
//! Usage:
//! ```bash
//! lcfind-host [path/to/host.toml]
//! ```

use std::path::PathBuf;

use tracing::info;
use tracing_subscriber::EnvFilter;

use lcfind_host::config::load_config;
use lcfind_host::{HostConfig, HostService, MemoryConfigurationDelegate};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging. Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => load_config(&path)?,
        None => HostConfig::default(),
    };

    info!(
        serial = %config.device.serial_number,
        name = %config.device.device_name,
        "LC-FIND host starting"
    );

    let delegate = Box::new(MemoryConfigurationDelegate::new(config.network.clone()));
    let mut service = HostService::start(&config, delegate)?;

    // The demo host is immediately reconfigurable; embedding applications
    // decide this themselves (e.g. only while a front-panel menu is open).
    service.enable_reconfiguration();

    info!("LC-FIND host ready. Press Ctrl-C to exit.");
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    service.shutdown();
    info!("LC-FIND host stopped");
    Ok(())
}

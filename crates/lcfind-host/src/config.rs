//! TOML-based host configuration.
//!
//! Every field carries a serde default so a partial file (or no file at
//! all) yields a working host. The identity defaults use a fresh UUID per
//! process (`Unknown-<uuid>`) so unprovisioned devices are still
//! distinguishable in a scan.

use std::path::{Path, PathBuf};

use lcfind_core::{NetworkConfiguration, PROTOCOL_PORT};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level host configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostConfig {
    #[serde(default)]
    pub device: DeviceIdentity,
    #[serde(default)]
    pub protocol: ProtocolConfig,
    /// Initial network configuration handed to the in-memory delegate by the
    /// demo binary. A real embedding application supplies its own delegate
    /// and ignores this section.
    #[serde(default = "default_network")]
    pub network: NetworkConfiguration,
}

/// Identity the host advertises in FIND replies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceIdentity {
    #[serde(default = "default_serial_number")]
    pub serial_number: String,
    #[serde(default = "default_device_name")]
    pub device_name: String,
}

/// Protocol behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProtocolConfig {
    /// UDP port to bind; all LC-FIND traffic uses 50022.
    #[serde(default = "default_port")]
    pub port: u16,
    /// When `true`, an accepted proposal waits for a local `confirm()` call
    /// before it is applied.
    #[serde(default)]
    pub confirmation_enabled: bool,
    /// Seconds an unconfirmed proposal is held before it is abandoned.
    #[serde(default = "default_timeout_secs")]
    pub confirmation_timeout_secs: u64,
    /// Seconds after an applied change before the next proposal is admitted.
    #[serde(default = "default_timeout_secs")]
    pub cooldown_timeout_secs: u64,
    /// Bound of the inbound message queue; overflow sheds the oldest entry.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_serial_number() -> String {
    format!("Unknown-{}", Uuid::new_v4())
}
fn default_device_name() -> String {
    format!("Unknown-{}", Uuid::new_v4())
}
fn default_port() -> u16 {
    PROTOCOL_PORT
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_queue_capacity() -> usize {
    10
}
fn default_network() -> NetworkConfiguration {
    NetworkConfiguration::dhcp("00-00-00-00-00-00")
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            device: DeviceIdentity::default(),
            protocol: ProtocolConfig::default(),
            network: default_network(),
        }
    }
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self {
            serial_number: default_serial_number(),
            device_name: default_device_name(),
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            confirmation_enabled: false,
            confirmation_timeout_secs: default_timeout_secs(),
            cooldown_timeout_secs: default_timeout_secs(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Loads a [`HostConfig`] from `path`, returning the defaults if the file
/// does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found"
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<HostConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HostConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

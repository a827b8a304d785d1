//! Proposed network configuration, as parsed from a `CONFReq` message.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a device obtains its address: from a DHCP server or from a static
/// assignment.
///
/// Wire spellings are `DHCP` and `Static`; parsing accepts any case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkMode {
    Dhcp,
    Static,
}

/// A `NetworkMode` field value that is neither `dhcp` nor `static`.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown network mode value")]
pub struct UnknownNetworkMode;

impl fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NetworkMode::Dhcp => "DHCP",
            NetworkMode::Static => "Static",
        };
        f.write_str(s)
    }
}

impl FromStr for NetworkMode {
    type Err = UnknownNetworkMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dhcp" => Ok(NetworkMode::Dhcp),
            "static" => Ok(NetworkMode::Static),
            _ => Err(UnknownNetworkMode),
        }
    }
}

/// A network configuration as proposed in a `CONFReq` or reported by the
/// embedding application.
///
/// This is a *proposal*, not applied state: the host records one of these as
/// its pending request and hands it to the embedding application's
/// set-configuration delegate when the change is finally committed.
///
/// For `Dhcp` mode the three address fields are absent; for `Static` mode
/// the codec guarantees all three are present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfiguration {
    pub mac_address: String,
    pub mode: NetworkMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<Ipv4Addr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet_mask: Option<Ipv4Addr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_address: Option<Ipv4Addr>,
}

impl NetworkConfiguration {
    /// A DHCP configuration for the device with the given MAC address.
    pub fn dhcp(mac_address: impl Into<String>) -> Self {
        Self {
            mac_address: mac_address.into(),
            mode: NetworkMode::Dhcp,
            ip_address: None,
            subnet_mask: None,
            gateway_address: None,
        }
    }

    /// A static configuration for the device with the given MAC address.
    pub fn static_addressing(
        mac_address: impl Into<String>,
        ip_address: Ipv4Addr,
        subnet_mask: Ipv4Addr,
        gateway_address: Ipv4Addr,
    ) -> Self {
        Self {
            mac_address: mac_address.into(),
            mode: NetworkMode::Static,
            ip_address: Some(ip_address),
            subnet_mask: Some(subnet_mask),
            gateway_address: Some(gateway_address),
        }
    }

    pub fn is_dhcp_enabled(&self) -> bool {
        self.mode == NetworkMode::Dhcp
    }
}

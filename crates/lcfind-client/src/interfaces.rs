//! Enumeration of the local interfaces a scan should go out of.

use std::net::{IpAddr, Ipv4Addr};

use pnet::datalink;
use tracing::debug;

/// One local network interface usable for scanning: its name and the IPv4
/// address a scan socket binds to. Recorded as "looker" metadata on every
/// device the scan finds, so follow-up requests leave through the interface
/// that can actually see the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookerInterface {
    pub name: String,
    pub ip_address: Ipv4Addr,
}

/// Returns every up, non-loopback interface carrying an IPv4 address.
///
/// An interface with several IPv4 addresses contributes its first one; a
/// scan out of one address per interface is how deployed operator tools
/// behave.
pub fn usable_interfaces() -> Vec<LookerInterface> {
    datalink::interfaces()
        .into_iter()
        .filter_map(|interface| {
            if !interface.is_up() || interface.is_loopback() {
                debug!(name = %interface.name, "skipping interface");
                return None;
            }
            let ip_address = interface.ips.iter().find_map(|network| match network.ip() {
                IpAddr::V4(v4) => Some(v4),
                IpAddr::V6(_) => None,
            })?;
            Some(LookerInterface {
                name: interface.name,
                ip_address,
            })
        })
        .collect()
}

//! Snapshot of one discovered device, as assembled by a client scan.

use std::net::Ipv4Addr;

use crate::domain::config::NetworkMode;
use crate::domain::status::Status;

/// One device found during a scan.
///
/// Built once from a decoded `FIND` reply and the metadata of the scan that
/// saw it. `ip_address` is the datagram's source address, not the `IP` field
/// of the reply: the source address is what the operator can actually reach,
/// and the two can disagree while a device is mid-reconfiguration.
///
/// The `looker_*` fields record which local interface and address the scan
/// used, so a follow-up `CONFReq` can be sent out of the interface that can
/// see the device. Immutable after construction except for the post-hoc
/// reachability probe result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescription {
    pub serial_number: String,
    pub mac_address: String,
    pub device_name: String,
    pub network_mode: NetworkMode,
    pub ip_address: Ipv4Addr,
    pub subnet_mask: Ipv4Addr,
    pub gateway_address: Ipv4Addr,
    pub status: Status,
    /// Result of the ICMP echo probe; stays `false` when the probe fails or
    /// is unavailable.
    pub is_reachable: bool,
    pub looker_interface_name: String,
    pub looker_ip_address: Ipv4Addr,
}

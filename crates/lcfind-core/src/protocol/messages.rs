//! Typed representations of the four LC-FIND message kinds.
//!
//! On the wire every message is a single UDP datagram: ASCII/UTF-8
//! `Key=Value;` pairs terminated by exactly one NUL byte. The kind is
//! declared by a marker pair (`FINDReq=1`, `FIND=1`, `CONFReq=1`, `CONF=1`).
//! Keys are case-insensitive and decoders must not rely on pair order.

use std::net::Ipv4Addr;

use crate::domain::config::{NetworkConfiguration, NetworkMode};
use crate::domain::status::Status;

/// UDP port all LC-FIND traffic uses, for both broadcast and unicast.
pub const PROTOCOL_PORT: u16 = 50022;

/// One LC-FIND message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Discovery request, broadcast by a client. Carries no parameters.
    FindRequest,
    /// A host's discovery reply: identity plus current network settings.
    Find(FindReply),
    /// A reconfiguration proposal targeted at one device by MAC address.
    ConfRequest(NetworkConfiguration),
    /// A host's verdict on a reconfiguration proposal.
    Conf(ConfReply),
}

/// Marker discriminating the four message kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    FindRequest,
    Find,
    ConfRequest,
    Conf,
}

impl MessageKind {
    /// The lowercased marker key declaring this kind on the wire.
    pub(crate) fn marker_key(self) -> &'static str {
        match self {
            MessageKind::FindRequest => "findreq",
            MessageKind::Find => "find",
            MessageKind::ConfRequest => "confreq",
            MessageKind::Conf => "conf",
        }
    }

    /// The marker pair as it is emitted, e.g. `FINDReq=1;`.
    pub(crate) fn marker_pair(self) -> &'static str {
        match self {
            MessageKind::FindRequest => "FINDReq=1;",
            MessageKind::Find => "FIND=1;",
            MessageKind::ConfRequest => "CONFReq=1;",
            MessageKind::Conf => "CONF=1;",
        }
    }
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::FindRequest => MessageKind::FindRequest,
            Message::Find(_) => MessageKind::Find,
            Message::ConfRequest(_) => MessageKind::ConfRequest,
            Message::Conf(_) => MessageKind::Conf,
        }
    }
}

/// Payload of a `FIND` reply. All fields are mandatory; a DHCP device still
/// reports its current mask and gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindReply {
    pub ip_address: Ipv4Addr,
    pub mac_address: String,
    pub device_name: String,
    pub serial_number: String,
    pub status: Status,
    pub network_mode: NetworkMode,
    pub subnet_mask: Ipv4Addr,
    pub gateway_address: Ipv4Addr,
}

/// Payload of a `CONF` reply.
///
/// `result` is `Ok` or `Error-<reason>`. The optional fields echo the
/// device's configuration as of the reply; a host omits them entirely when
/// it cannot obtain its own configuration, and omits the addresses when the
/// device runs DHCP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfReply {
    pub mac_address: String,
    pub status: Status,
    pub result: String,
    pub network_mode: Option<NetworkMode>,
    pub ip_address: Option<Ipv4Addr>,
    pub subnet_mask: Option<Ipv4Addr>,
    pub gateway_address: Option<Ipv4Addr>,
}

//! The one-shot broadcast scan.

use std::collections::HashSet;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, info, warn};

use lcfind_core::{decode_message, encode_message, DeviceDescription, Message, PROTOCOL_PORT};

use crate::interfaces::{usable_interfaces, LookerInterface};
use crate::probe;

/// How long each interface's socket collects replies after the broadcast.
const LISTEN_WINDOW: Duration = Duration::from_secs(1);

/// Scans all usable local interfaces and returns the devices found,
/// deduplicated by serial number across interfaces (first sighting wins).
///
/// A bind failure on one interface (typically another program holding the
/// protocol port without the reuse-address option) is logged and costs
/// only that interface's devices; the scan itself always completes.
pub async fn scan() -> Vec<DeviceDescription> {
    let mut collector = DeviceCollector::new();

    for looker in usable_interfaces() {
        info!(interface = %looker.name, address = %looker.ip_address, "scanning");
        if let Err(e) = scan_interface(&looker, &mut collector).await {
            warn!(
                interface = %looker.name,
                error = %e,
                "interface contributed no devices"
            );
        }
    }

    collector.into_devices()
}

/// Broadcasts one `FINDReq` out of `looker` and absorbs the replies that
/// arrive within the listen window.
async fn scan_interface(
    looker: &LookerInterface,
    collector: &mut DeviceCollector,
) -> io::Result<()> {
    // Binding to the interface's own address (not 0.0.0.0) pins the
    // broadcast to this adapter; an unbound socket lets the OS pick an
    // arbitrary one and miss every other segment.
    let socket = bind_scan_socket(looker.ip_address)?;

    let request = encode_message(&Message::FindRequest);
    let broadcast = SocketAddr::from((Ipv4Addr::BROADCAST, PROTOCOL_PORT));
    socket.send_to(request.as_bytes(), broadcast)?;

    // Allow some time for replies to come, then drain without blocking.
    tokio::time::sleep(LISTEN_WINDOW).await;

    let mut buf = [0u8; 0x10000];
    loop {
        let (len, sender) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) => return Err(e),
        };
        let payload = String::from_utf8_lossy(&buf[..len]);
        let new_device = collector
            .absorb(&payload, sender, looker)
            .map(|device| device.ip_address);
        if let Some(address) = new_device {
            let reachable = probe::is_reachable(address).await;
            collector.mark_reachable(&address, reachable);
        }
    }
    Ok(())
}

fn bind_scan_socket(local_address: Ipv4Addr) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_broadcast(true)?;
    socket.bind(&SocketAddr::from((local_address, PROTOCOL_PORT)).into())?;
    let socket: UdpSocket = socket.into();
    socket.set_nonblocking(true)?;
    Ok(socket)
}

/// Accumulates devices across interfaces, enforcing the serial-number dedup.
struct DeviceCollector {
    seen_serials: HashSet<String>,
    devices: Vec<DeviceDescription>,
}

impl DeviceCollector {
    fn new() -> Self {
        Self {
            seen_serials: HashSet::new(),
            devices: Vec::new(),
        }
    }

    /// Turns one datagram into a device entry, if it is a decodable `FIND`
    /// with a serial number this scan has not recorded yet. Returns the new
    /// entry so the caller can probe it.
    fn absorb(
        &mut self,
        payload: &str,
        sender: SocketAddr,
        looker: &LookerInterface,
    ) -> Option<&DeviceDescription> {
        let reply = match decode_message(payload) {
            Ok(Message::Find(reply)) => reply,
            Ok(_) => return None, // our own FINDReq echoed back, or a CONF
            Err(reason) => {
                debug!(%sender, %reason, "ignoring undecodable datagram");
                return None;
            }
        };

        if reply.serial_number.is_empty() {
            debug!(%sender, "ignoring FIND reply without a serial number");
            return None;
        }
        let IpAddr::V4(sender_ip) = sender.ip() else {
            return None;
        };
        if !self.seen_serials.insert(reply.serial_number.clone()) {
            // Already recorded via another interface; first sighting wins.
            return None;
        }

        info!(
            serial = %reply.serial_number,
            address = %sender_ip,
            interface = %looker.name,
            "device found"
        );
        self.devices.push(DeviceDescription {
            serial_number: reply.serial_number,
            mac_address: reply.mac_address,
            device_name: reply.device_name,
            network_mode: reply.network_mode,
            // The datagram's source address is what we can actually reach;
            // the reply's own IP field can lag a reconfiguration.
            ip_address: sender_ip,
            subnet_mask: reply.subnet_mask,
            gateway_address: reply.gateway_address,
            status: reply.status,
            is_reachable: false,
            looker_interface_name: looker.name.clone(),
            looker_ip_address: looker.ip_address,
        });
        self.devices.last()
    }

    fn mark_reachable(&mut self, address: &Ipv4Addr, reachable: bool) {
        if let Some(device) = self
            .devices
            .iter_mut()
            .find(|device| device.ip_address == *address)
        {
            device.is_reachable = reachable;
        }
    }

    fn into_devices(self) -> Vec<DeviceDescription> {
        self.devices
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use lcfind_core::{FindReply, NetworkMode, Status};

    fn looker(name: &str, octet: u8) -> LookerInterface {
        LookerInterface {
            name: name.to_string(),
            ip_address: Ipv4Addr::new(192, 168, octet, 10),
        }
    }

    fn find_reply(serial: &str) -> String {
        encode_message(&Message::Find(FindReply {
            ip_address: Ipv4Addr::new(192, 168, 1, 77),
            mac_address: "00-11-22-33-44-55".to_string(),
            device_name: "CARBIDE".to_string(),
            serial_number: serial.to_string(),
            status: Status::Ready,
            network_mode: NetworkMode::Dhcp,
            subnet_mask: Ipv4Addr::new(255, 255, 255, 0),
            gateway_address: Ipv4Addr::new(192, 168, 1, 1),
        }))
    }

    fn sender(octet: u8) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::new(192, 168, octet, 77), PROTOCOL_PORT))
    }

    #[test]
    fn test_absorb_builds_a_device_from_a_find_reply() {
        let mut collector = DeviceCollector::new();
        let device = collector
            .absorb(&find_reply("CB5678"), sender(1), &looker("eth0", 1))
            .expect("device");

        assert_eq!(device.serial_number, "CB5678");
        // Source address wins over the advertised IP field.
        assert_eq!(device.ip_address, Ipv4Addr::new(192, 168, 1, 77));
        assert_eq!(device.looker_interface_name, "eth0");
        assert!(!device.is_reachable);
    }

    #[test]
    fn test_same_serial_via_two_interfaces_is_one_device() {
        let mut collector = DeviceCollector::new();
        assert!(collector
            .absorb(&find_reply("CB5678"), sender(1), &looker("eth0", 1))
            .is_some());
        assert!(collector
            .absorb(&find_reply("CB5678"), sender(2), &looker("eth1", 2))
            .is_none());

        let devices = collector.into_devices();
        assert_eq!(devices.len(), 1);
        // First sighting wins, including its looker metadata.
        assert_eq!(devices[0].looker_interface_name, "eth0");
    }

    #[test]
    fn test_distinct_serials_are_distinct_devices() {
        let mut collector = DeviceCollector::new();
        collector.absorb(&find_reply("CB0001"), sender(1), &looker("eth0", 1));
        collector.absorb(&find_reply("CB0002"), sender(1), &looker("eth0", 1));
        assert_eq!(collector.into_devices().len(), 2);
    }

    #[test]
    fn test_empty_serial_is_ignored() {
        let mut collector = DeviceCollector::new();
        assert!(collector
            .absorb(&find_reply(""), sender(1), &looker("eth0", 1))
            .is_none());
        assert!(collector.into_devices().is_empty());
    }

    #[test]
    fn test_non_find_datagrams_are_ignored() {
        let mut collector = DeviceCollector::new();
        // Our own request echoed back by the broadcast.
        assert!(collector
            .absorb("FINDReq=1;\0", sender(1), &looker("eth0", 1))
            .is_none());
        assert!(collector
            .absorb("garbage", sender(1), &looker("eth0", 1))
            .is_none());
        assert!(collector.into_devices().is_empty());
    }

    #[test]
    fn test_mark_reachable_updates_the_right_device() {
        let mut collector = DeviceCollector::new();
        collector.absorb(&find_reply("CB0001"), sender(1), &looker("eth0", 1));
        collector.absorb(&find_reply("CB0002"), sender(2), &looker("eth0", 1));

        collector.mark_reachable(&Ipv4Addr::new(192, 168, 2, 77), true);

        let devices = collector.into_devices();
        assert!(!devices[0].is_reachable);
        assert!(devices[1].is_reachable);
    }
}

//! Sending reconfiguration requests.
//!
//! A `CONFReq` is broadcast, not unicast: the whole point of reconfiguring
//! a device is usually that its current address is wrong for this subnet,
//! so it is addressed by MAC and shouted at everyone. The request leaves
//! through the interface that discovered the device (the looker address
//! recorded in its [`lcfind_core::DeviceDescription`]).

use std::io;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};

use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tracing::info;

use lcfind_core::{encode_message, Message, NetworkConfiguration, PROTOCOL_PORT};

/// Error type for request transmission.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The request socket could not be bound to the looker address.
    #[error("failed to bind request socket on {address}: {source}")]
    BindFailed {
        address: Ipv4Addr,
        #[source]
        source: io::Error,
    },

    /// The broadcast itself failed.
    #[error("failed to broadcast the request: {0}")]
    SendFailed(#[source] io::Error),
}

/// Broadcasts a request to switch the device with `mac_address` to a static
/// configuration.
///
/// # Errors
///
/// Returns [`RequestError`] when the looker socket cannot be bound or the
/// broadcast fails. The device's verdict arrives separately as a `CONF`
/// broadcast; this function does not wait for it.
pub fn send_static_reconfiguration(
    mac_address: &str,
    looker_address: Ipv4Addr,
    ip_address: Ipv4Addr,
    subnet_mask: Ipv4Addr,
    gateway_address: Ipv4Addr,
) -> Result<(), RequestError> {
    let configuration = NetworkConfiguration::static_addressing(
        mac_address,
        ip_address,
        subnet_mask,
        gateway_address,
    );
    broadcast_request(looker_address, &configuration)
}

/// Broadcasts a request to switch the device with `mac_address` to DHCP.
///
/// # Errors
///
/// Same failure modes as [`send_static_reconfiguration`].
pub fn send_dhcp_reconfiguration(
    mac_address: &str,
    looker_address: Ipv4Addr,
) -> Result<(), RequestError> {
    broadcast_request(looker_address, &NetworkConfiguration::dhcp(mac_address))
}

fn broadcast_request(
    looker_address: Ipv4Addr,
    configuration: &NetworkConfiguration,
) -> Result<(), RequestError> {
    let message = encode_message(&Message::ConfRequest(configuration.clone()));

    let socket = bind_request_socket(looker_address).map_err(|source| RequestError::BindFailed {
        address: looker_address,
        source,
    })?;

    info!(
        target = %configuration.mac_address,
        mode = %configuration.mode,
        via = %looker_address,
        "broadcasting reconfiguration request"
    );
    let broadcast = SocketAddr::from((Ipv4Addr::BROADCAST, PROTOCOL_PORT));
    socket
        .send_to(message.as_bytes(), broadcast)
        .map_err(RequestError::SendFailed)?;
    Ok(())
}

fn bind_request_socket(local_address: Ipv4Addr) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_broadcast(true)?;
    socket.bind(&SocketAddr::from((local_address, PROTOCOL_PORT)).into())?;
    Ok(socket.into())
}

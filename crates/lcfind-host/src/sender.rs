//! Reply transmission: unicast to the requester plus a rebroadcast on the
//! protocol port.
//!
//! Every reply goes out twice. The unicast copy reaches the requester
//! directly; the broadcast copy covers the case where host and operator sit
//! on mismatched subnets after a reconfiguration, where unicast routing is
//! exactly what just broke. Unreachable-destination errors on either copy
//! are expected operating conditions (subnet mismatch, NIC without an
//! address yet) and are logged and swallowed; anything else is returned to
//! the caller and treated as fatal.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};

use thiserror::Error;
use tracing::{debug, trace};

#[cfg(test)]
use mockall::automock;

/// A send failure that is not an expected unreachable condition.
#[derive(Debug, Error)]
#[error("failed to send a reply to {destination}: {source}")]
pub struct SendError {
    pub destination: SocketAddr,
    #[source]
    pub source: io::Error,
}

/// Capability to deliver one reply message to a requester.
#[cfg_attr(test, automock)]
pub trait ResponseSender {
    /// Sends `message` unicast to `destination` and rebroadcasts it on the
    /// protocol port.
    ///
    /// # Errors
    ///
    /// Returns [`SendError`] only for failures that are not
    /// host/network-unreachable conditions; those are logged and swallowed.
    fn send_response(&self, message: &str, destination: SocketAddr) -> Result<(), SendError>;
}

/// [`ResponseSender`] backed by the host's own UDP socket.
pub struct UdpResponseSender {
    socket: UdpSocket,
    broadcast_port: u16,
}

impl UdpResponseSender {
    pub fn new(socket: UdpSocket, broadcast_port: u16) -> Self {
        Self {
            socket,
            broadcast_port,
        }
    }

    fn send_to(&self, message: &str, destination: SocketAddr) -> Result<(), SendError> {
        trace!(%destination, "sending reply: {}", message.trim_end_matches('\0'));
        match self.socket.send_to(message.as_bytes(), destination) {
            Ok(_) => Ok(()),
            Err(e) if is_unreachable(&e) => {
                debug!(%destination, error = %e, "destination unreachable, reply dropped");
                Ok(())
            }
            Err(source) => Err(SendError {
                destination,
                source,
            }),
        }
    }
}

impl ResponseSender for UdpResponseSender {
    fn send_response(&self, message: &str, destination: SocketAddr) -> Result<(), SendError> {
        self.send_to(message, destination)?;
        let broadcast = SocketAddr::from((Ipv4Addr::BROADCAST, self.broadcast_port));
        self.send_to(message, broadcast)
    }
}

/// Returns `true` for send errors that mean "this destination cannot be
/// reached right now" rather than "the socket is broken".
fn is_unreachable(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::HostUnreachable | io::ErrorKind::NetworkUnreachable
    )
}

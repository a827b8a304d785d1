//! # lcfind-client
//!
//! Operator-side implementation of the LC-FIND protocol: scans the local
//! subnets for devices and sends them reconfiguration requests.
//!
//! A scan is one-shot. For every usable local interface the client binds a
//! socket to that interface's address, broadcasts a single `FINDReq`, waits
//! a fixed listen window, and drains whatever `FIND` replies arrived.
//! Replies are deduplicated by serial number across all interfaces (the
//! same device is often visible through several NICs) and each device is
//! given a short ICMP echo to report whether it is actually reachable,
//! because a device mid-reconfiguration answers broadcasts long before it
//! is routable again.

pub mod interfaces;
pub mod probe;
pub mod request;
pub mod scan;

pub use interfaces::LookerInterface;
pub use request::{send_dhcp_reconfiguration, send_static_reconfiguration, RequestError};
pub use scan::scan;

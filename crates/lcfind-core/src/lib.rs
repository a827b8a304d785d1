//! # lcfind-core
//!
//! Shared library for LC-FIND containing the wire codec, the address
//! acceptance policy, and the domain model used by both the host and the
//! client side of the protocol.
//!
//! This crate is used by both the device-side host and the operator-side
//! client. It has zero dependencies on OS APIs or network sockets.
//!
//! # Protocol overview
//!
//! LC-FIND is a plaintext UDP protocol for finding embedded devices on the
//! local subnet and staging a network-configuration change on them. Four
//! message kinds travel over port 50022, each a NUL-terminated string of
//! `Key=Value;` pairs:
//!
//! - **`FINDReq`** – broadcast by a client looking for devices.
//! - **`FIND`** – a host's identity reply (IP, MAC, name, serial, status).
//! - **`CONFReq`** – a reconfiguration proposal targeted at one MAC.
//! - **`CONF`** – the host's verdict on a proposal (`Ok` or `Error-…`).
//!
//! This crate defines:
//!
//! - **`protocol`** – the typed message structs and the text codec that
//!   encodes/decodes them.
//! - **`domain`** – the status and network-mode enums, the proposed
//!   [`NetworkConfiguration`], the scan-result [`DeviceDescription`], and
//!   the address acceptance predicates.

pub mod domain;
pub mod protocol;

// Re-export the most-used items at the crate root so callers can write
// `lcfind_core::Status` instead of `lcfind_core::domain::status::Status`.
pub use domain::address::{is_contiguous_prefix_mask, is_usable_unicast_ipv4};
pub use domain::config::{NetworkConfiguration, NetworkMode};
pub use domain::device::DeviceDescription;
pub use domain::status::Status;
pub use protocol::codec::{decode_message, encode_message, DecodeError};
pub use protocol::messages::{ConfReply, FindReply, Message, PROTOCOL_PORT};

//! Address acceptance policy for proposed static configurations.
//!
//! Both checks are deliberately coarse. The unicast filter answers
//! "could a device plausibly bind and be reached on this address on a flat
//! LAN", not "is this RFC-precise"; two reserved ranges are approximated by
//! their whole /8. The exact ranges are part of the protocol's observable
//! behaviour and must not be tightened without coordinating with deployed
//! firmware.

use std::net::Ipv4Addr;

/// Returns `true` when `address` is plausible as a bindable unicast IPv4
/// address for a LAN device.
///
/// Rejected ranges: 0.0.0.0/8, 127.0.0.0/8 (loopback), 169.254.0.0/16
/// (link-local), 192.0.0.0/24, 192.88.99.0/24 (6to4 relay), 198.0.0.0/8
/// (benchmarking, approximated), 203.0.0.0/8 (documentation, approximated),
/// 224.0.0.0/4 (multicast), 240.0.0.0/4 (reserved), and the limited
/// broadcast address. Everything else is accepted, including all private
/// ranges.
pub fn is_usable_unicast_ipv4(address: Ipv4Addr) -> bool {
    let o = address.octets();

    let not_this_network = o[0] != 0;
    let not_loopback = o[0] != 127;
    let not_link_local = !(o[0] == 169 && o[1] == 254);
    let not_ietf_reserved = !(o[0] == 192 && o[1] == 0 && o[2] == 0);
    let not_6to4_relay = !(o[0] == 192 && o[1] == 88 && o[2] == 99);
    let not_benchmarking = o[0] != 198;
    let not_documentation = o[0] != 203;
    let not_multicast = !(224..=239).contains(&o[0]);
    let not_reserved = o[0] < 240;
    let not_broadcast = address != Ipv4Addr::BROADCAST;

    not_this_network
        && not_loopback
        && not_link_local
        && not_ietf_reserved
        && not_6to4_relay
        && not_benchmarking
        && not_documentation
        && not_multicast
        && not_reserved
        && not_broadcast
}

/// Returns `true` when `mask` is a contiguous-prefix subnet mask: a run of
/// 1 bits followed only by 0 bits.
///
/// Checked by shifting left while the top bit is set; anything left after
/// the run of ones means a stray 1 bit after a 0.
pub fn is_contiguous_prefix_mask(mask: Ipv4Addr) -> bool {
    let mut value = u32::from(mask);
    while value & 0x8000_0000 != 0 {
        value <<= 1;
    }
    value == 0
}

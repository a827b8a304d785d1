//! Text codec for encoding and decoding LC-FIND messages.
//!
//! Wire format:
//! ```text
//! MARKER=1;Key=Value;Key=Value;…\0
//! ```
//! The whole message is terminated by exactly one NUL byte. Keys are
//! case-insensitive; pair order is fixed on encode for reproducibility but
//! never relied upon on decode. Unknown keys are ignored so newer firmware
//! can add fields without breaking older tools.
//!
//! Decoding happens in two steps: the pairs are first collected into a
//! lowercased key→value map (a duplicated key keeps its **last** value, the
//! behaviour deployed firmware exhibits), and the map is then projected into
//! the typed message structs with explicit errors for anything missing or
//! malformed.
//!
//! The `Display` strings of [`DecodeError`] are part of the protocol: a host
//! embeds them verbatim in the `Result` field of its `CONF` reply, so they
//! must stay stable.

use std::collections::HashMap;
use std::net::Ipv4Addr;

use thiserror::Error;

use crate::domain::address::is_contiguous_prefix_mask;
use crate::domain::config::{NetworkConfiguration, NetworkMode};
use crate::domain::status::Status;
use crate::protocol::messages::{ConfReply, FindReply, Message, MessageKind};

/// Errors that can occur while decoding a message.
///
/// The `Display` text doubles as the human-readable reason a host reports
/// back on the wire.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The message does not end in exactly one NUL byte.
    #[error("Should be nul-terminated.")]
    NotTerminated,

    /// A `;`-separated segment did not split on `=` into exactly two parts.
    #[error("Invalid key-value pair")]
    InvalidPair,

    /// No known kind marker (`FINDReq=1` etc.) was present.
    #[error("Unrecognized message type")]
    UnknownKind,

    /// A required field was absent.
    #[error("Missing {0} setting")]
    MissingField(&'static str),

    /// `NetworkMode` was neither `dhcp` nor `static`.
    #[error("Unrecognized network mode setting")]
    UnknownNetworkMode,

    /// `Status` was not one of the four known status names.
    #[error("Unrecognized status setting")]
    UnknownStatus,

    /// The `IP` field did not parse as an IPv4 address.
    #[error("Malformed IP address setting")]
    MalformedIp,

    /// The `Mask` field did not parse, or is not a contiguous-prefix mask.
    #[error("Malformed mask setting")]
    MalformedMask,

    /// The `Gateway` field did not parse as an IPv4 address.
    #[error("Malformed gateway address setting")]
    MalformedGateway,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a [`Message`] into its NUL-terminated wire string.
pub fn encode_message(message: &Message) -> String {
    let mut out = String::from(message.kind().marker_pair());
    match message {
        Message::FindRequest => {}
        Message::Find(reply) => encode_find(&mut out, reply),
        Message::ConfRequest(config) => encode_conf_request(&mut out, config),
        Message::Conf(reply) => encode_conf(&mut out, reply),
    }
    out.push('\0');
    out
}

/// Decodes one [`Message`] from a datagram's text.
///
/// # Errors
///
/// Returns a [`DecodeError`] when the text is not NUL-terminated, contains a
/// malformed pair, carries no known kind marker, or a required field is
/// missing or unparsable.
pub fn decode_message(text: &str) -> Result<Message, DecodeError> {
    let fields = strict_fields(text)?;
    match kind_of(&fields).ok_or(DecodeError::UnknownKind)? {
        MessageKind::FindRequest => Ok(Message::FindRequest),
        MessageKind::Find => decode_find(&fields).map(Message::Find),
        MessageKind::ConfRequest => decode_conf_request(&fields).map(Message::ConfRequest),
        MessageKind::Conf => decode_conf(&fields).map(Message::Conf),
    }
}

/// Determines the kind of a datagram without validating it.
///
/// Used by the host to route traffic: a discovery request is answered even
/// when sloppily terminated, and a reconfiguration request must be
/// attributable to a target before a strict decode decides its fate.
pub fn classify(text: &str) -> Option<MessageKind> {
    kind_of(&lenient_fields(text))
}

/// Extracts the `HWADDR` value from a datagram without validating it.
///
/// Lets the host decide whether a malformed `CONFReq` was addressed to it
/// (and so deserves an error reply) or is another device's problem.
pub fn peek_hardware_address(text: &str) -> Option<String> {
    lenient_fields(text).remove("hwaddr")
}

// ── Pair collection ───────────────────────────────────────────────────────────

/// Collects `Key=Value;` pairs into a lowercased-key map, rejecting anything
/// malformed. A duplicated key keeps its last value. Empty segments (as left
/// by a trailing `;`) are skipped.
fn strict_fields(text: &str) -> Result<HashMap<String, String>, DecodeError> {
    let body = text.strip_suffix('\0').ok_or(DecodeError::NotTerminated)?;
    if body.contains('\0') {
        return Err(DecodeError::NotTerminated);
    }

    let mut fields = HashMap::new();
    for segment in body.split(';').filter(|s| !s.is_empty()) {
        let mut parts = segment.split('=');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(key), Some(value), None) => {
                fields.insert(key.to_ascii_lowercase(), value.to_string());
            }
            _ => return Err(DecodeError::InvalidPair),
        }
    }
    Ok(fields)
}

/// Best-effort variant of [`strict_fields`]: no termination requirement,
/// malformed segments are skipped instead of failing the whole message.
fn lenient_fields(text: &str) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    for segment in text.trim_end_matches('\0').split(';').filter(|s| !s.is_empty()) {
        let mut parts = segment.split('=');
        if let (Some(key), Some(value), None) = (parts.next(), parts.next(), parts.next()) {
            fields.insert(key.to_ascii_lowercase(), value.to_string());
        }
    }
    fields
}

/// Looks the kind marker up in a field map. `FINDReq` and `CONFReq` are
/// checked before their reply counterparts; a marker only counts with the
/// literal value `1`.
fn kind_of(fields: &HashMap<String, String>) -> Option<MessageKind> {
    [
        MessageKind::FindRequest,
        MessageKind::ConfRequest,
        MessageKind::Find,
        MessageKind::Conf,
    ]
    .into_iter()
    .find(|kind| fields.get(kind.marker_key()).map(String::as_str) == Some("1"))
}

// ── Per-kind decode ───────────────────────────────────────────────────────────

fn decode_find(fields: &HashMap<String, String>) -> Result<FindReply, DecodeError> {
    Ok(FindReply {
        ip_address: parse_ip(require(fields, "ip", "IP")?)?,
        mac_address: require(fields, "hwaddr", "HWADDR")?.to_string(),
        device_name: require(fields, "devicename", "DeviceName")?.to_string(),
        serial_number: require(fields, "sn", "SN")?.to_string(),
        status: parse_status(require(fields, "status", "Status")?)?,
        network_mode: parse_network_mode(require(fields, "networkmode", "NetworkMode")?)?,
        subnet_mask: parse_mask(require(fields, "mask", "Mask")?)?,
        gateway_address: parse_gateway(require(fields, "gateway", "Gateway")?)?,
    })
}

fn decode_conf_request(
    fields: &HashMap<String, String>,
) -> Result<NetworkConfiguration, DecodeError> {
    let mac_address = require(fields, "hwaddr", "HWADDR")?.to_string();
    let mode = parse_network_mode(require(fields, "networkmode", "NetworkMode")?)?;

    let ip_address = fields.get("ip").map(|v| parse_ip(v)).transpose()?;
    let subnet_mask = fields.get("mask").map(|v| parse_mask(v)).transpose()?;
    let gateway_address = fields.get("gateway").map(|v| parse_gateway(v)).transpose()?;

    if mode == NetworkMode::Static {
        if ip_address.is_none() {
            return Err(DecodeError::MissingField("IP"));
        }
        if subnet_mask.is_none() {
            return Err(DecodeError::MissingField("Mask"));
        }
        if gateway_address.is_none() {
            return Err(DecodeError::MissingField("Gateway"));
        }
    }

    Ok(NetworkConfiguration {
        mac_address,
        mode,
        ip_address,
        subnet_mask,
        gateway_address,
    })
}

fn decode_conf(fields: &HashMap<String, String>) -> Result<ConfReply, DecodeError> {
    Ok(ConfReply {
        mac_address: require(fields, "hwaddr", "HWADDR")?.to_string(),
        status: parse_status(require(fields, "status", "Status")?)?,
        result: require(fields, "result", "Result")?.to_string(),
        network_mode: fields
            .get("networkmode")
            .map(|v| parse_network_mode(v))
            .transpose()?,
        ip_address: fields.get("ip").map(|v| parse_ip(v)).transpose()?,
        subnet_mask: fields.get("mask").map(|v| parse_mask(v)).transpose()?,
        gateway_address: fields.get("gateway").map(|v| parse_gateway(v)).transpose()?,
    })
}

// ── Per-kind encode ───────────────────────────────────────────────────────────

fn encode_find(out: &mut String, reply: &FindReply) {
    use std::fmt::Write;
    let _ = write!(out, "IP={};", reply.ip_address);
    let _ = write!(out, "HWADDR={};", reply.mac_address);
    let _ = write!(out, "DeviceName={};", reply.device_name);
    let _ = write!(out, "SN={};", reply.serial_number);
    let _ = write!(out, "Status={};", reply.status);
    let _ = write!(out, "NetworkMode={};", reply.network_mode);
    let _ = write!(out, "Mask={};", reply.subnet_mask);
    let _ = write!(out, "Gateway={};", reply.gateway_address);
}

fn encode_conf_request(out: &mut String, config: &NetworkConfiguration) {
    use std::fmt::Write;
    let _ = write!(out, "HWADDR={};", config.mac_address);
    let _ = write!(out, "NetworkMode={};", config.mode);
    if let Some(ip) = config.ip_address {
        let _ = write!(out, "IP={ip};");
    }
    if let Some(mask) = config.subnet_mask {
        let _ = write!(out, "Mask={mask};");
    }
    if let Some(gateway) = config.gateway_address {
        let _ = write!(out, "Gateway={gateway};");
    }
}

fn encode_conf(out: &mut String, reply: &ConfReply) {
    use std::fmt::Write;
    let _ = write!(out, "HWADDR={};", reply.mac_address);
    let _ = write!(out, "Status={};", reply.status);
    let _ = write!(out, "Result={};", reply.result);
    if let Some(mode) = reply.network_mode {
        let _ = write!(out, "NetworkMode={mode};");
    }
    if let Some(ip) = reply.ip_address {
        let _ = write!(out, "IP={ip};");
    }
    if let Some(mask) = reply.subnet_mask {
        let _ = write!(out, "Mask={mask};");
    }
    if let Some(gateway) = reply.gateway_address {
        let _ = write!(out, "Gateway={gateway};");
    }
}

// ── Field helpers ─────────────────────────────────────────────────────────────

fn require<'a>(
    fields: &'a HashMap<String, String>,
    key: &str,
    wire_name: &'static str,
) -> Result<&'a str, DecodeError> {
    fields
        .get(key)
        .map(String::as_str)
        .ok_or(DecodeError::MissingField(wire_name))
}

fn parse_ip(value: &str) -> Result<Ipv4Addr, DecodeError> {
    value.parse().map_err(|_| DecodeError::MalformedIp)
}

fn parse_mask(value: &str) -> Result<Ipv4Addr, DecodeError> {
    let mask: Ipv4Addr = value.parse().map_err(|_| DecodeError::MalformedMask)?;
    if !is_contiguous_prefix_mask(mask) {
        return Err(DecodeError::MalformedMask);
    }
    Ok(mask)
}

fn parse_gateway(value: &str) -> Result<Ipv4Addr, DecodeError> {
    value.parse().map_err(|_| DecodeError::MalformedGateway)
}

fn parse_status(value: &str) -> Result<Status, DecodeError> {
    value.parse().map_err(|_| DecodeError::UnknownStatus)
}

fn parse_network_mode(value: &str) -> Result<NetworkMode, DecodeError> {
    value.parse().map_err(|_| DecodeError::UnknownNetworkMode)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_find() -> FindReply {
        FindReply {
            ip_address: Ipv4Addr::new(192, 168, 1, 77),
            mac_address: "00-11-22-33-44-55".to_string(),
            device_name: "CARBIDE".to_string(),
            serial_number: "CB5678".to_string(),
            status: Status::Ready,
            network_mode: NetworkMode::Static,
            subnet_mask: Ipv4Addr::new(255, 255, 255, 0),
            gateway_address: Ipv4Addr::new(192, 168, 1, 1),
        }
    }

    fn round_trip(message: &Message) -> Message {
        decode_message(&encode_message(message)).expect("decode failed")
    }

    // ── Round trips ───────────────────────────────────────────────────────────

    #[test]
    fn test_find_request_round_trip() {
        assert_eq!(round_trip(&Message::FindRequest), Message::FindRequest);
    }

    #[test]
    fn test_find_round_trip() {
        let message = Message::Find(sample_find());
        assert_eq!(round_trip(&message), message);
    }

    #[test]
    fn test_conf_request_static_round_trip() {
        let message = Message::ConfRequest(NetworkConfiguration::static_addressing(
            "00-11-22-33-44-55",
            Ipv4Addr::new(10, 0, 0, 20),
            Ipv4Addr::new(255, 0, 0, 0),
            Ipv4Addr::new(10, 0, 0, 1),
        ));
        assert_eq!(round_trip(&message), message);
    }

    #[test]
    fn test_conf_request_dhcp_round_trip() {
        let message = Message::ConfRequest(NetworkConfiguration::dhcp("00-11-22-33-44-55"));
        assert_eq!(round_trip(&message), message);
    }

    #[test]
    fn test_conf_ok_round_trip() {
        let message = Message::Conf(ConfReply {
            mac_address: "00-11-22-33-44-55".to_string(),
            status: Status::Cooldown,
            result: "Ok".to_string(),
            network_mode: Some(NetworkMode::Static),
            ip_address: Some(Ipv4Addr::new(10, 0, 0, 20)),
            subnet_mask: Some(Ipv4Addr::new(255, 0, 0, 0)),
            gateway_address: Some(Ipv4Addr::new(10, 0, 0, 1)),
        });
        assert_eq!(round_trip(&message), message);
    }

    #[test]
    fn test_conf_error_without_echo_round_trip() {
        let message = Message::Conf(ConfReply {
            mac_address: "00-11-22-33-44-55".to_string(),
            status: Status::Ready,
            result: "Error-Malformed mask setting".to_string(),
            network_mode: None,
            ip_address: None,
            subnet_mask: None,
            gateway_address: None,
        });
        assert_eq!(round_trip(&message), message);
    }

    // ── Encoded form ──────────────────────────────────────────────────────────

    #[test]
    fn test_find_request_exact_wire_form() {
        assert_eq!(encode_message(&Message::FindRequest), "FINDReq=1;\0");
    }

    #[test]
    fn test_find_exact_wire_form() {
        let encoded = encode_message(&Message::Find(sample_find()));
        assert_eq!(
            encoded,
            "FIND=1;IP=192.168.1.77;HWADDR=00-11-22-33-44-55;DeviceName=CARBIDE;\
             SN=CB5678;Status=Ready;NetworkMode=Static;Mask=255.255.255.0;\
             Gateway=192.168.1.1;\0"
        );
    }

    #[test]
    fn test_dhcp_conf_request_omits_addresses() {
        let encoded =
            encode_message(&Message::ConfRequest(NetworkConfiguration::dhcp("AA-BB")));
        assert_eq!(encoded, "CONFReq=1;HWADDR=AA-BB;NetworkMode=DHCP;\0");
    }

    // ── Termination ───────────────────────────────────────────────────────────

    #[test]
    fn test_decode_without_nul_fails() {
        let err = decode_message("FINDReq=1;").unwrap_err();
        assert_eq!(err, DecodeError::NotTerminated);
        assert_eq!(err.to_string(), "Should be nul-terminated.");
    }

    #[test]
    fn test_decode_with_embedded_nul_fails() {
        assert_eq!(
            decode_message("FINDReq=1;\0\0"),
            Err(DecodeError::NotTerminated)
        );
        assert_eq!(
            decode_message("FIND\0Req=1;\0"),
            Err(DecodeError::NotTerminated)
        );
    }

    #[test]
    fn test_decode_empty_string_fails() {
        assert_eq!(decode_message(""), Err(DecodeError::NotTerminated));
    }

    // ── Pair handling ─────────────────────────────────────────────────────────

    #[test]
    fn test_pair_without_value_is_invalid() {
        assert_eq!(
            decode_message("FINDReq=1;bogus;\0"),
            Err(DecodeError::InvalidPair)
        );
    }

    #[test]
    fn test_pair_with_two_equals_is_invalid() {
        assert_eq!(
            decode_message("FINDReq=1;a=b=c;\0"),
            Err(DecodeError::InvalidPair)
        );
    }

    #[test]
    fn test_missing_trailing_semicolon_is_accepted() {
        // Deployed operator tools omit the `;` before the NUL.
        let decoded =
            decode_message("CONFReq=1;HWADDR=AA-BB;NetworkMode=DHCP\0").expect("decode");
        assert_eq!(
            decoded,
            Message::ConfRequest(NetworkConfiguration::dhcp("AA-BB"))
        );
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let decoded =
            decode_message("confreq=1;hwaddr=AA-BB;NETWORKMODE=dhcp;\0").expect("decode");
        assert_eq!(
            decoded,
            Message::ConfRequest(NetworkConfiguration::dhcp("AA-BB"))
        );
    }

    #[test]
    fn test_duplicate_key_last_value_wins() {
        let decoded = decode_message("CONFReq=1;HWADDR=AA;HWADDR=BB;NetworkMode=DHCP;\0")
            .expect("decode");
        assert_eq!(decoded, Message::ConfRequest(NetworkConfiguration::dhcp("BB")));
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let decoded =
            decode_message("CONFReq=1;HWADDR=AA-BB;NetworkMode=DHCP;Firmware=2.1;\0")
                .expect("decode");
        assert_eq!(
            decoded,
            Message::ConfRequest(NetworkConfiguration::dhcp("AA-BB"))
        );
    }

    #[test]
    fn test_field_order_does_not_matter() {
        let decoded = decode_message("NetworkMode=DHCP;HWADDR=AA-BB;CONFReq=1;\0")
            .expect("decode");
        assert_eq!(
            decoded,
            Message::ConfRequest(NetworkConfiguration::dhcp("AA-BB"))
        );
    }

    #[test]
    fn test_unmarked_message_is_unrecognized() {
        assert_eq!(
            decode_message("Hello=World;\0"),
            Err(DecodeError::UnknownKind)
        );
        // A marker only counts with the literal value 1.
        assert_eq!(
            decode_message("FINDReq=2;\0"),
            Err(DecodeError::UnknownKind)
        );
    }

    // ── Field validation ──────────────────────────────────────────────────────

    #[test]
    fn test_conf_request_with_unknown_mode_fails() {
        assert_eq!(
            decode_message("CONFReq=1;HWADDR=AA;NetworkMode=bootp;\0"),
            Err(DecodeError::UnknownNetworkMode)
        );
    }

    #[test]
    fn test_conf_request_with_bad_ip_fails() {
        assert_eq!(
            decode_message("CONFReq=1;HWADDR=AA;NetworkMode=Static;IP=999.1.2.3;Mask=255.255.0.0;Gateway=10.0.0.1;\0"),
            Err(DecodeError::MalformedIp)
        );
    }

    #[test]
    fn test_conf_request_with_noncontiguous_mask_fails() {
        assert_eq!(
            decode_message("CONFReq=1;HWADDR=AA;NetworkMode=Static;IP=10.0.0.2;Mask=255.0.255.0;Gateway=10.0.0.1;\0"),
            Err(DecodeError::MalformedMask)
        );
    }

    #[test]
    fn test_conf_request_with_bad_gateway_fails() {
        assert_eq!(
            decode_message("CONFReq=1;HWADDR=AA;NetworkMode=Static;IP=10.0.0.2;Mask=255.0.0.0;Gateway=nowhere;\0"),
            Err(DecodeError::MalformedGateway)
        );
    }

    #[test]
    fn test_static_conf_request_requires_all_addresses() {
        let err = decode_message("CONFReq=1;HWADDR=AA;NetworkMode=Static;IP=10.0.0.2;\0")
            .unwrap_err();
        assert_eq!(err, DecodeError::MissingField("Mask"));
        assert_eq!(err.to_string(), "Missing Mask setting");
    }

    #[test]
    fn test_find_with_unknown_status_fails() {
        let text = "FIND=1;IP=10.0.0.2;HWADDR=AA;DeviceName=X;SN=1;Status=Sleeping;\
                    NetworkMode=DHCP;Mask=255.0.0.0;Gateway=10.0.0.1;\0";
        assert_eq!(decode_message(text), Err(DecodeError::UnknownStatus));
    }

    #[test]
    fn test_find_missing_serial_fails() {
        let text = "FIND=1;IP=10.0.0.2;HWADDR=AA;DeviceName=X;Status=Ready;\
                    NetworkMode=DHCP;Mask=255.0.0.0;Gateway=10.0.0.1;\0";
        assert_eq!(decode_message(text), Err(DecodeError::MissingField("SN")));
    }

    // ── Lenient helpers ───────────────────────────────────────────────────────

    #[test]
    fn test_classify_tolerates_missing_nul() {
        assert_eq!(classify("FINDReq=1;"), Some(MessageKind::FindRequest));
        assert_eq!(classify("CONFReq=1;HWADDR=AA"), Some(MessageKind::ConfRequest));
    }

    #[test]
    fn test_classify_tolerates_malformed_pairs() {
        assert_eq!(classify("FINDReq=1;garbage\0"), Some(MessageKind::FindRequest));
        assert_eq!(classify("noise"), None);
    }

    #[test]
    fn test_peek_hardware_address() {
        assert_eq!(
            peek_hardware_address("CONFReq=1;HWADDR=AA-BB;broken\0"),
            Some("AA-BB".to_string())
        );
        assert_eq!(peek_hardware_address("CONFReq=1;\0"), None);
    }
}

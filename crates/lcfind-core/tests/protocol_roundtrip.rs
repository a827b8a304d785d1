//! Integration tests exercising the codec through the crate's public API,
//! the way the host and client crates consume it.

use std::net::Ipv4Addr;

use lcfind_core::protocol::messages::ConfReply;
use lcfind_core::{
    decode_message, encode_message, DecodeError, FindReply, Message, NetworkConfiguration,
    NetworkMode, Status,
};

fn sample_find() -> FindReply {
    FindReply {
        ip_address: Ipv4Addr::new(172, 16, 4, 9),
        mac_address: "5C-F3-70-8A-11-02".to_string(),
        device_name: "PHAROS-07".to_string(),
        serial_number: "PH001207".to_string(),
        status: Status::Disabled,
        network_mode: NetworkMode::Dhcp,
        subnet_mask: Ipv4Addr::new(255, 255, 0, 0),
        gateway_address: Ipv4Addr::new(172, 16, 0, 1),
    }
}

#[test]
fn every_message_kind_survives_a_round_trip() {
    let messages = [
        Message::FindRequest,
        Message::Find(sample_find()),
        Message::ConfRequest(NetworkConfiguration::dhcp("5C-F3-70-8A-11-02")),
        Message::ConfRequest(NetworkConfiguration::static_addressing(
            "5C-F3-70-8A-11-02",
            Ipv4Addr::new(172, 16, 4, 10),
            Ipv4Addr::new(255, 255, 0, 0),
            Ipv4Addr::new(172, 16, 0, 1),
        )),
        Message::Conf(ConfReply {
            mac_address: "5C-F3-70-8A-11-02".to_string(),
            status: Status::Cooldown,
            result: "Ok".to_string(),
            network_mode: Some(NetworkMode::Dhcp),
            ip_address: None,
            subnet_mask: None,
            gateway_address: None,
        }),
    ];

    for message in messages {
        let encoded = encode_message(&message);
        assert!(
            encoded.ends_with('\0'),
            "encoded message must be NUL-terminated"
        );
        assert_eq!(decode_message(&encoded).expect("decode"), message);
    }
}

#[test]
fn truncated_datagrams_never_decode() {
    let encoded = encode_message(&Message::Find(sample_find()));
    // Chop the message anywhere before the terminator: the decoder must
    // report a termination failure, never a partial message.
    for cut in [1, encoded.len() / 2, encoded.len() - 1] {
        assert_eq!(
            decode_message(&encoded[..cut]),
            Err(DecodeError::NotTerminated),
            "cut at {cut}"
        );
    }
}

#[test]
fn decode_reasons_are_stable_wire_text() {
    // These strings are embedded verbatim in CONF replies by deployed hosts;
    // changing them is a protocol change, not a refactor.
    let cases: [(&str, &str); 3] = [
        ("CONFReq=1;HWADDR=AA;NetworkMode=DHCP;", "Should be nul-terminated."),
        ("CONFReq=1;HWADDR=AA;NetworkMode=lease;\0", "Unrecognized network mode setting"),
        (
            "CONFReq=1;HWADDR=AA;NetworkMode=Static;IP=10.0.0.9;Mask=255.255.254.255;Gateway=10.0.0.1;\0",
            "Malformed mask setting",
        ),
    ];
    for (text, reason) in cases {
        assert_eq!(decode_message(text).unwrap_err().to_string(), reason);
    }
}

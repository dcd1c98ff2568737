//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::str::FromStr;
use std::sync::LazyLock as Lazy;

use bytes::Bytes;
use const_addrs::ip;
use holo_olsr::packet::{
    DecodeError, DecodeResult, Hna, Message, MessageBody, MessageHdr,
    MessageType, Mid, Packet, Vtime,
};
use holo_olsr::seqno::SeqNo;
use ipnetwork::IpNetwork;

use super::{CXT_IPV4, test_decode_packet, test_encode_packet};

fn hdr(msg_type: MessageType, seqno: u16) -> MessageHdr {
    MessageHdr {
        msg_type,
        vtime: Vtime(0xe7),
        originator: ip!("10.0.0.1"),
        ttl: 255,
        hop_count: 0,
        seqno: SeqNo::new(seqno),
    }
}

//
// Test packets.
//

static MID1: Lazy<(Vec<u8>, DecodeResult<Packet>)> = Lazy::new(|| {
    (
        vec![
            0x00, 0x18, 0x00, 0x04, 0x03, 0xe7, 0x00, 0x14, 0x0a, 0x00, 0x00,
            0x01, 0xff, 0x00, 0x00, 0x04, 0x0a, 0x00, 0x01, 0x01, 0x0a, 0x00,
            0x02, 0x01,
        ],
        Ok(Packet {
            seqno: SeqNo::new(4),
            messages: vec![Message {
                hdr: hdr(MessageType::Mid, 4),
                body: MessageBody::Mid(Mid {
                    addrs: vec![ip!("10.0.1.1"), ip!("10.0.2.1")],
                }),
            }],
        }),
    )
});

static HNA1: Lazy<(Vec<u8>, DecodeResult<Packet>)> = Lazy::new(|| {
    (
        vec![
            0x00, 0x20, 0x00, 0x05, 0x04, 0xe7, 0x00, 0x1c, 0x0a, 0x00, 0x00,
            0x01, 0xff, 0x00, 0x00, 0x05, 0xc0, 0xa8, 0x01, 0x00, 0xff, 0xff,
            0xff, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ],
        Ok(Packet {
            seqno: SeqNo::new(5),
            messages: vec![Message {
                hdr: hdr(MessageType::Hna, 5),
                body: MessageBody::Hna(Hna {
                    prefixes: vec![
                        IpNetwork::from_str("192.168.1.0/24").unwrap(),
                        IpNetwork::from_str("0.0.0.0/0").unwrap(),
                    ],
                }),
            }],
        }),
    )
});

static MID_HNA1: Lazy<(Vec<u8>, DecodeResult<Packet>)> = Lazy::new(|| {
    (
        vec![
            0x00, 0x28, 0x00, 0x06, 0x03, 0xe7, 0x00, 0x10, 0x0a, 0x00, 0x00,
            0x01, 0xff, 0x00, 0x00, 0x06, 0x0a, 0x00, 0x01, 0x01, 0x04, 0xe7,
            0x00, 0x14, 0x0a, 0x00, 0x00, 0x01, 0xff, 0x00, 0x00, 0x07, 0xac,
            0x10, 0x00, 0x00, 0xff, 0xf0, 0x00, 0x00,
        ],
        Ok(Packet {
            seqno: SeqNo::new(6),
            messages: vec![
                Message {
                    hdr: hdr(MessageType::Mid, 6),
                    body: MessageBody::Mid(Mid {
                        addrs: vec![ip!("10.0.1.1")],
                    }),
                },
                Message {
                    hdr: hdr(MessageType::Hna, 7),
                    body: MessageBody::Hna(Hna {
                        prefixes: vec![
                            IpNetwork::from_str("172.16.0.0/12").unwrap(),
                        ],
                    }),
                },
            ],
        }),
    )
});

static UNKNOWN1: Lazy<(Vec<u8>, DecodeResult<Packet>)> = Lazy::new(|| {
    (
        vec![
            0x00, 0x14, 0x00, 0x08, 0x80, 0xe7, 0x00, 0x10, 0x0a, 0x00, 0x00,
            0x01, 0xff, 0x00, 0x00, 0x08, 0x01, 0x02, 0x03, 0x04,
        ],
        Ok(Packet {
            seqno: SeqNo::new(8),
            messages: vec![Message {
                hdr: hdr(MessageType::Unknown(0x80), 8),
                body: MessageBody::Unknown(Bytes::from_static(&[
                    0x01, 0x02, 0x03, 0x04,
                ])),
            }],
        }),
    )
});

static HNA_BAD_NETMASK: Lazy<(Vec<u8>, DecodeResult<Packet>)> =
    Lazy::new(|| {
        (
            vec![
                0x00, 0x18, 0x00, 0x05, 0x04, 0xe7, 0x00, 0x14, 0x0a, 0x00,
                0x00, 0x01, 0xff, 0x00, 0x00, 0x05, 0xc0, 0xa8, 0x01, 0x00,
                0xff, 0x00, 0xff, 0x00,
            ],
            Err(DecodeError::InvalidHnaPrefix(
                ip!("192.168.1.0"),
                ip!("255.0.255.0"),
            )),
        )
    });

//
// Tests.
//

#[test]
fn test_encode_mid1() {
    let (ref bytes, ref packet) = *MID1;
    test_encode_packet(bytes, packet);
}

#[test]
fn test_decode_mid1() {
    let (ref bytes, ref packet) = *MID1;
    test_decode_packet(bytes, &CXT_IPV4, packet);
}

#[test]
fn test_encode_hna1() {
    let (ref bytes, ref packet) = *HNA1;
    test_encode_packet(bytes, packet);
}

#[test]
fn test_decode_hna1() {
    let (ref bytes, ref packet) = *HNA1;
    test_decode_packet(bytes, &CXT_IPV4, packet);
}

#[test]
fn test_encode_mid_hna1() {
    let (ref bytes, ref packet) = *MID_HNA1;
    test_encode_packet(bytes, packet);
}

#[test]
fn test_decode_mid_hna1() {
    let (ref bytes, ref packet) = *MID_HNA1;
    test_decode_packet(bytes, &CXT_IPV4, packet);
}

#[test]
fn test_encode_unknown1() {
    let (ref bytes, ref packet) = *UNKNOWN1;
    test_encode_packet(bytes, packet);
}

#[test]
fn test_decode_unknown1() {
    let (ref bytes, ref packet) = *UNKNOWN1;
    test_decode_packet(bytes, &CXT_IPV4, packet);
}

#[test]
fn test_decode_hna_bad_netmask() {
    let (ref bytes, ref packet) = *HNA_BAD_NETMASK;
    test_decode_packet(bytes, &CXT_IPV4, packet);
}

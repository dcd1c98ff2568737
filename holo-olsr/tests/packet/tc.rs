//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::IpAddr;
use std::sync::LazyLock as Lazy;

use bytes::Bytes;
use const_addrs::ip;
use holo_olsr::packet::{
    DecodeError, DecodeResult, Message, MessageBody, MessageHdr, MessageType,
    NeighborAddr, Packet, Tc, Vtime,
};
use holo_olsr::seqno::SeqNo;

use super::{
    CXT_IPV4, CXT_IPV4_LQ, CXT_IPV6, test_decode_packet, test_encode_packet,
};

fn tc_packet(
    msg_type: MessageType,
    originator: IpAddr,
    ansn: u16,
    neighbors: Vec<NeighborAddr>,
) -> Packet {
    Packet {
        seqno: SeqNo::new(3),
        messages: vec![Message {
            hdr: MessageHdr {
                msg_type,
                vtime: Vtime(0xe7),
                originator,
                ttl: 255,
                hop_count: 0,
                seqno: SeqNo::new(3),
            },
            body: MessageBody::Tc(Tc {
                ansn: SeqNo::new(ansn),
                neighbors,
            }),
        }],
    }
}

//
// Test packets.
//

static TC1: Lazy<(Vec<u8>, DecodeResult<Packet>)> = Lazy::new(|| {
    (
        vec![
            0x00, 0x1c, 0x00, 0x03, 0x02, 0xe7, 0x00, 0x18, 0x0a, 0x00, 0x00,
            0x01, 0xff, 0x00, 0x00, 0x03, 0x00, 0x07, 0x00, 0x00, 0x0a, 0x00,
            0x00, 0x02, 0x0a, 0x00, 0x00, 0x03,
        ],
        Ok(tc_packet(
            MessageType::Tc,
            ip!("10.0.0.1"),
            7,
            vec![
                NeighborAddr {
                    addr: ip!("10.0.0.2"),
                    lq: Bytes::new(),
                },
                NeighborAddr {
                    addr: ip!("10.0.0.3"),
                    lq: Bytes::new(),
                },
            ],
        )),
    )
});

static LQ_TC1: Lazy<(Vec<u8>, DecodeResult<Packet>)> = Lazy::new(|| {
    (
        vec![
            0x00, 0x1c, 0x00, 0x03, 0xca, 0xe7, 0x00, 0x18, 0x0a, 0x00, 0x00,
            0x01, 0xff, 0x00, 0x00, 0x03, 0xff, 0xff, 0x00, 0x00, 0x0a, 0x00,
            0x00, 0x02, 0xc0, 0x40, 0x00, 0x00,
        ],
        Ok(tc_packet(
            MessageType::LqTc,
            ip!("10.0.0.1"),
            0xffff,
            vec![NeighborAddr {
                addr: ip!("10.0.0.2"),
                lq: Bytes::from_static(&[0xc0, 0x40]),
            }],
        )),
    )
});

static TC1_IPV6: Lazy<(Vec<u8>, DecodeResult<Packet>)> = Lazy::new(|| {
    (
        vec![
            0x00, 0x30, 0x00, 0x03, 0x02, 0xe7, 0x00, 0x2c, 0x20, 0x01, 0x0d,
            0xb8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x01, 0xff, 0x00, 0x00, 0x03, 0x00, 0x01, 0x00, 0x00, 0x20,
            0x01, 0x0d, 0xb8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x02,
        ],
        Ok(tc_packet(
            MessageType::Tc,
            ip!("2001:db8::1"),
            1,
            vec![NeighborAddr {
                addr: ip!("2001:db8::2"),
                lq: Bytes::new(),
            }],
        )),
    )
});

static TC_BAD_BODY_LENGTH: Lazy<(Vec<u8>, DecodeResult<Packet>)> =
    Lazy::new(|| {
        (
            vec![
                0x00, 0x1a, 0x00, 0x03, 0x02, 0xe7, 0x00, 0x16, 0x0a, 0x00,
                0x00, 0x01, 0xff, 0x00, 0x00, 0x03, 0x00, 0x07, 0x00, 0x00,
                0x0a, 0x00, 0x00, 0x02, 0x0a, 0x00,
            ],
            Err(DecodeError::InvalidBodyLength(6)),
        )
    });

static TC_BAD_MESSAGE_SIZE: Lazy<(Vec<u8>, DecodeResult<Packet>)> =
    Lazy::new(|| {
        (
            vec![
                0x00, 0x18, 0x00, 0x03, 0x02, 0xe7, 0x00, 0x20, 0x0a, 0x00,
                0x00, 0x01, 0xff, 0x00, 0x00, 0x03, 0x00, 0x07, 0x00, 0x00,
                0x0a, 0x00, 0x00, 0x02,
            ],
            Err(DecodeError::InvalidMessageSize(0x20)),
        )
    });

//
// Tests.
//

#[test]
fn test_encode_tc1() {
    let (ref bytes, ref packet) = *TC1;
    test_encode_packet(bytes, packet);
}

#[test]
fn test_decode_tc1() {
    let (ref bytes, ref packet) = *TC1;
    test_decode_packet(bytes, &CXT_IPV4, packet);
}

#[test]
fn test_encode_lq_tc1() {
    let (ref bytes, ref packet) = *LQ_TC1;
    test_encode_packet(bytes, packet);
}

#[test]
fn test_decode_lq_tc1() {
    let (ref bytes, ref packet) = *LQ_TC1;
    test_decode_packet(bytes, &CXT_IPV4_LQ, packet);
}

#[test]
fn test_encode_tc1_ipv6() {
    let (ref bytes, ref packet) = *TC1_IPV6;
    test_encode_packet(bytes, packet);
}

#[test]
fn test_decode_tc1_ipv6() {
    let (ref bytes, ref packet) = *TC1_IPV6;
    test_decode_packet(bytes, &CXT_IPV6, packet);
}

#[test]
fn test_decode_tc_bad_body_length() {
    let (ref bytes, ref packet) = *TC_BAD_BODY_LENGTH;
    test_decode_packet(bytes, &CXT_IPV4, packet);
}

#[test]
fn test_decode_tc_bad_message_size() {
    let (ref bytes, ref packet) = *TC_BAD_MESSAGE_SIZE;
    test_decode_packet(bytes, &CXT_IPV4, packet);
}

#[test]
fn test_decode_incomplete_packet() {
    let packet = Packet::decode(&[0x00], &CXT_IPV4);
    assert_eq!(packet, Err(DecodeError::IncompletePacket));
}

#[test]
fn test_decode_invalid_packet_length() {
    let (ref bytes, _) = *TC1;
    let packet = Packet::decode(&bytes[..bytes.len() - 4], &CXT_IPV4);
    assert_eq!(packet, Err(DecodeError::InvalidPacketLength(0x1c)));
}

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
    DecodeError, DecodeResult, Hello, LinkBlock, LinkCode, LinkType, Message,
    MessageBody, MessageHdr, MessageType, NeighborAddr, NeighborType, Packet,
    Vtime,
};
use holo_olsr::seqno::SeqNo;

use super::{CXT_IPV4, CXT_IPV4_LQ, test_decode_packet, test_encode_packet};

fn nbr(addr: IpAddr) -> NeighborAddr {
    NeighborAddr {
        addr,
        lq: Bytes::new(),
    }
}

//
// Test packets.
//

static HELLO1: Lazy<(Vec<u8>, DecodeResult<Packet>)> = Lazy::new(|| {
    (
        vec![
            0x00, 0x28, 0x00, 0x01, 0x01, 0x86, 0x00, 0x24, 0x0a, 0x00, 0x00,
            0x01, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x05, 0x03, 0x06, 0x00,
            0x00, 0x0c, 0x0a, 0x00, 0x00, 0x02, 0x0a, 0x00, 0x00, 0x03, 0x01,
            0x00, 0x00, 0x08, 0x0a, 0x00, 0x00, 0x04,
        ],
        Ok(Packet {
            seqno: SeqNo::new(1),
            messages: vec![Message {
                hdr: MessageHdr {
                    msg_type: MessageType::Hello,
                    vtime: Vtime(0x86),
                    originator: ip!("10.0.0.1"),
                    ttl: 1,
                    hop_count: 0,
                    seqno: SeqNo::new(1),
                },
                body: MessageBody::Hello(Hello {
                    htime: Vtime(0x05),
                    willingness: 3,
                    links: vec![
                        LinkBlock {
                            link_code: LinkCode::new(
                                LinkType::Sym,
                                NeighborType::Sym,
                            ),
                            neighbors: vec![
                                nbr(ip!("10.0.0.2")),
                                nbr(ip!("10.0.0.3")),
                            ],
                        },
                        LinkBlock {
                            link_code: LinkCode::new(
                                LinkType::Asym,
                                NeighborType::NotNeigh,
                            ),
                            neighbors: vec![nbr(ip!("10.0.0.4"))],
                        },
                    ],
                }),
            }],
        }),
    )
});

static LQ_HELLO1: Lazy<(Vec<u8>, DecodeResult<Packet>)> = Lazy::new(|| {
    (
        vec![
            0x00, 0x20, 0x00, 0x02, 0xc9, 0x86, 0x00, 0x1c, 0x0a, 0x00, 0x00,
            0x01, 0x01, 0x00, 0x00, 0x02, 0x00, 0x00, 0x05, 0x07, 0x0a, 0x00,
            0x00, 0x0c, 0x0a, 0x00, 0x00, 0x02, 0xff, 0x80, 0x00, 0x00,
        ],
        Ok(Packet {
            seqno: SeqNo::new(2),
            messages: vec![Message {
                hdr: MessageHdr {
                    msg_type: MessageType::LqHello,
                    vtime: Vtime(0x86),
                    originator: ip!("10.0.0.1"),
                    ttl: 1,
                    hop_count: 0,
                    seqno: SeqNo::new(2),
                },
                body: MessageBody::Hello(Hello {
                    htime: Vtime(0x05),
                    willingness: 7,
                    links: vec![LinkBlock {
                        link_code: LinkCode::new(
                            LinkType::Sym,
                            NeighborType::Mpr,
                        ),
                        neighbors: vec![NeighborAddr {
                            addr: ip!("10.0.0.2"),
                            lq: Bytes::from_static(&[0xff, 0x80]),
                        }],
                    }],
                }),
            }],
        }),
    )
});

static HELLO_BAD_WILLINGNESS: Lazy<(Vec<u8>, DecodeResult<Packet>)> =
    Lazy::new(|| {
        (
            vec![
                0x00, 0x14, 0x00, 0x01, 0x01, 0x86, 0x00, 0x10, 0x0a, 0x00,
                0x00, 0x01, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x05, 0x08,
            ],
            Err(DecodeError::InvalidWillingness(8)),
        )
    });

static HELLO_BAD_BLOCK_SIZE: Lazy<(Vec<u8>, DecodeResult<Packet>)> =
    Lazy::new(|| {
        (
            vec![
                0x00, 0x1e, 0x00, 0x01, 0x01, 0x86, 0x00, 0x1a, 0x0a, 0x00,
                0x00, 0x01, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x05, 0x03,
                0x06, 0x00, 0x00, 0x0a, 0x0a, 0x00, 0x00, 0x02, 0x0a, 0x00,
            ],
            Err(DecodeError::InvalidLinkBlockSize(10)),
        )
    });

//
// Tests.
//

#[test]
fn test_encode_hello1() {
    let (ref bytes, ref packet) = *HELLO1;
    test_encode_packet(bytes, packet);
}

#[test]
fn test_decode_hello1() {
    let (ref bytes, ref packet) = *HELLO1;
    test_decode_packet(bytes, &CXT_IPV4, packet);
}

#[test]
fn test_encode_lq_hello1() {
    let (ref bytes, ref packet) = *LQ_HELLO1;
    test_encode_packet(bytes, packet);
}

#[test]
fn test_decode_lq_hello1() {
    let (ref bytes, ref packet) = *LQ_HELLO1;
    test_decode_packet(bytes, &CXT_IPV4_LQ, packet);
}

#[test]
fn test_decode_lq_hello1_without_lq_model() {
    // LQ messages are kept as raw data when no LQ model is active.
    let (ref bytes, _) = *LQ_HELLO1;
    let packet = Packet::decode(bytes, &CXT_IPV4).unwrap();
    assert_eq!(packet.messages.len(), 1);
    assert_eq!(packet.messages[0].hdr.msg_type, MessageType::LqHello);
    assert!(matches!(packet.messages[0].body, MessageBody::Unknown(_)));
}

#[test]
fn test_decode_hello_bad_willingness() {
    let (ref bytes, ref packet) = *HELLO_BAD_WILLINGNESS;
    test_decode_packet(bytes, &CXT_IPV4, packet);
}

#[test]
fn test_decode_hello_bad_block_size() {
    let (ref bytes, ref packet) = *HELLO_BAD_BLOCK_SIZE;
    test_decode_packet(bytes, &CXT_IPV4, packet);
}

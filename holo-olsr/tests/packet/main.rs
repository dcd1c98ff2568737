//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

mod hello;
mod mid_hna;
mod tc;

use holo_olsr::packet::{AddressFamily, DecodeCxt, DecodeResult, Packet};

//
// Helper functions.
//

pub const CXT_IPV4: DecodeCxt = DecodeCxt {
    af: AddressFamily::Ipv4,
    lq_len: None,
};

pub const CXT_IPV4_LQ: DecodeCxt = DecodeCxt {
    af: AddressFamily::Ipv4,
    lq_len: Some(2),
};

pub const CXT_IPV6: DecodeCxt = DecodeCxt {
    af: AddressFamily::Ipv6,
    lq_len: None,
};

pub fn test_encode_packet(
    bytes_expected: &[u8],
    packet: &DecodeResult<Packet>,
) {
    let bytes_actual = packet.as_ref().unwrap().encode();
    assert_eq!(bytes_expected, bytes_actual.as_ref());
}

pub fn test_decode_packet(
    bytes: &[u8],
    cxt: &DecodeCxt,
    packet_expected: &DecodeResult<Packet>,
) {
    let packet_actual = Packet::decode(bytes, cxt);
    assert_eq!(*packet_expected, packet_actual);
}

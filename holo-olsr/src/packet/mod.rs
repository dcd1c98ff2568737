//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

pub mod error;
pub mod hello;
pub mod hna;
pub mod mid;
pub mod tc;

use std::cell::RefCell;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

pub use crate::packet::error::{DecodeError, DecodeResult};
pub use crate::packet::hello::{
    Hello, LinkBlock, LinkCode, LinkType, NeighborType,
};
pub use crate::packet::hna::Hna;
pub use crate::packet::mid::Mid;
pub use crate::packet::tc::Tc;
use crate::seqno::SeqNo;

thread_local!(
    static TLS_BUF: RefCell<BytesMut> =
        RefCell::new(BytesMut::with_capacity(1500))
);

// Address family of the OLSR instance.
//
// OLSR doesn't carry the address family in its packets, so it must be
// known in advance in order to decode them.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

// OLSR packet decoding context.
#[derive(Clone, Copy, Debug)]
pub struct DecodeCxt {
    pub af: AddressFamily,
    // Length of the opaque link quality data carried by LQ messages, as
    // defined by the active link quality model. When unset, LQ messages
    // aren't decoded and are kept as raw data.
    pub lq_len: Option<usize>,
}

//
// OLSR packet format.
//
//  0                   1                   2                   3
//  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |         Packet Length         |    Packet Sequence Number     |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |  Message Type |     Vtime     |         Message Size          |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                      Originator Address                       |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |  Time To Live |   Hop Count   |    Message Sequence Number    |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                                                               |
// :                            MESSAGE                            :
// |                                                               |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |  Message Type |     Vtime     |         Message Size          |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// :                                                               :
// :                              ...                              :
//
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct Packet {
    pub seqno: SeqNo,
    pub messages: Vec<Message>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct Message {
    pub hdr: MessageHdr,
    pub body: MessageBody,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct MessageHdr {
    pub msg_type: MessageType,
    pub vtime: Vtime,
    pub originator: IpAddr,
    pub ttl: u8,
    pub hop_count: u8,
    pub seqno: SeqNo,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum MessageType {
    Hello,
    Tc,
    Mid,
    Hna,
    LqHello,
    LqTc,
    Unknown(u8),
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum MessageBody {
    Hello(Hello),
    Tc(Tc),
    Mid(Mid),
    Hna(Hna),
    // Raw contents of a message that isn't processed locally but may
    // still be forwarded.
    Unknown(Bytes),
}

// Address advertised in HELLO and TC messages.
//
// The link quality data is opaque to the codec. It's empty in messages
// that use the RFC 3626 formats.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct NeighborAddr {
    pub addr: IpAddr,
    pub lq: Bytes,
}

// Compressed time value used for the Vtime and Htime fields.
//
// The value is encoded as a 4-bit mantissa (a) and a 4-bit exponent (b),
// representing C * (1 + a/16) * 2^b seconds, where C is 1/16 seconds.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[derive(Deserialize, Serialize)]
#[serde(transparent)]
pub struct Vtime(pub u8);

// ===== impl AddressFamily =====

impl AddressFamily {
    pub const fn addr_len(&self) -> usize {
        match self {
            AddressFamily::Ipv4 => 4,
            AddressFamily::Ipv6 => 16,
        }
    }

    pub const fn of(addr: &IpAddr) -> AddressFamily {
        match addr {
            IpAddr::V4(_) => AddressFamily::Ipv4,
            IpAddr::V6(_) => AddressFamily::Ipv6,
        }
    }
}

impl std::fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddressFamily::Ipv4 => write!(f, "ipv4"),
            AddressFamily::Ipv6 => write!(f, "ipv6"),
        }
    }
}

// ===== impl DecodeCxt =====

impl DecodeCxt {
    // Returns the length of an advertised address entry.
    pub(crate) fn entry_len(&self, msg_type: MessageType) -> usize {
        let mut len = self.af.addr_len();
        if msg_type.is_lq() {
            len += self.lq_len.unwrap_or(0) + NeighborAddr::LQ_RESERVED_LEN;
        }
        len
    }
}

// ===== impl Packet =====

impl Packet {
    pub const HDR_LEN: usize = 4;

    // Encodes OLSR packet into a bytes buffer.
    pub fn encode(&self) -> BytesMut {
        TLS_BUF.with(|buf| {
            let mut buf = buf.borrow_mut();
            buf.clear();

            // The length will be initialized later.
            buf.put_u16(0);
            buf.put_u16(self.seqno.get());
            for msg in &self.messages {
                msg.encode(&mut buf);
            }

            // Initialize packet length.
            let pkt_len = buf.len() as u16;
            buf[0..2].copy_from_slice(&pkt_len.to_be_bytes());
            buf.clone()
        })
    }

    // Decodes OLSR packet from a bytes buffer.
    pub fn decode(data: &[u8], cxt: &DecodeCxt) -> DecodeResult<Self> {
        let mut buf = Bytes::copy_from_slice(data);

        // Validate the packet length.
        if data.len() < Self::HDR_LEN {
            return Err(DecodeError::IncompletePacket);
        }
        let pkt_len = buf.try_get_u16()?;
        if pkt_len as usize != data.len() {
            return Err(DecodeError::InvalidPacketLength(pkt_len));
        }
        let seqno = SeqNo::from(buf.try_get_u16()?);

        // Decode messages.
        let mut messages = vec![];
        while buf.remaining() > 0 {
            let msg = Message::decode(&mut buf, cxt)?;
            messages.push(msg);
        }

        Ok(Packet { seqno, messages })
    }

    // Returns the encoded length of the packet.
    pub fn len(&self) -> usize {
        Self::HDR_LEN + self.messages.iter().map(Message::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

// ===== impl Message =====

impl Message {
    // Encodes OLSR message into a bytes buffer.
    pub fn encode(&self, buf: &mut BytesMut) {
        let start_pos = buf.len();

        buf.put_u8(self.hdr.msg_type.to_u8());
        buf.put_u8(self.hdr.vtime.0);
        // The size will be initialized later.
        buf.put_u16(0);
        encode_addr(buf, &self.hdr.originator);
        buf.put_u8(self.hdr.ttl);
        buf.put_u8(self.hdr.hop_count);
        buf.put_u16(self.hdr.seqno.get());

        let lq = self.hdr.msg_type.is_lq();
        match &self.body {
            MessageBody::Hello(hello) => hello.encode(buf, lq),
            MessageBody::Tc(tc) => tc.encode(buf, lq),
            MessageBody::Mid(mid) => mid.encode(buf),
            MessageBody::Hna(hna) => hna.encode(buf),
            MessageBody::Unknown(data) => buf.put_slice(data),
        }

        // Initialize message size.
        let msg_size = (buf.len() - start_pos) as u16;
        buf[start_pos + 2..start_pos + 4]
            .copy_from_slice(&msg_size.to_be_bytes());
    }

    // Decodes OLSR message from a bytes buffer.
    pub fn decode(buf: &mut Bytes, cxt: &DecodeCxt) -> DecodeResult<Self> {
        let hdr_len = Self::hdr_len(cxt.af);
        if buf.remaining() < hdr_len {
            return Err(DecodeError::InvalidMessageSize(
                buf.remaining() as u16,
            ));
        }

        // Parse and validate message header.
        let msg_type = MessageType::from(buf.try_get_u8()?);
        let vtime = Vtime(buf.try_get_u8()?);
        let msg_size = buf.try_get_u16()?;
        if (msg_size as usize) < hdr_len
            || msg_size as usize - 4 > buf.remaining()
        {
            return Err(DecodeError::InvalidMessageSize(msg_size));
        }
        let originator = decode_addr(buf, cxt.af)?;
        let ttl = buf.try_get_u8()?;
        let hop_count = buf.try_get_u8()?;
        let seqno = SeqNo::from(buf.try_get_u16()?);
        let hdr = MessageHdr {
            msg_type,
            vtime,
            originator,
            ttl,
            hop_count,
            seqno,
        };

        // Parse message body.
        let mut body_buf = buf.copy_to_bytes(msg_size as usize - hdr_len);
        let body = match msg_type {
            MessageType::Hello => {
                MessageBody::Hello(Hello::decode(&mut body_buf, cxt, false)?)
            }
            MessageType::Tc => {
                MessageBody::Tc(Tc::decode(&mut body_buf, cxt, false)?)
            }
            MessageType::LqHello if cxt.lq_len.is_some() => {
                MessageBody::Hello(Hello::decode(&mut body_buf, cxt, true)?)
            }
            MessageType::LqTc if cxt.lq_len.is_some() => {
                MessageBody::Tc(Tc::decode(&mut body_buf, cxt, true)?)
            }
            MessageType::Mid => {
                MessageBody::Mid(Mid::decode(&mut body_buf, cxt)?)
            }
            MessageType::Hna => {
                MessageBody::Hna(Hna::decode(&mut body_buf, cxt)?)
            }
            _ => MessageBody::Unknown(body_buf),
        };

        Ok(Message { hdr, body })
    }

    // Returns the encoded length of the message.
    pub fn len(&self) -> usize {
        let af = AddressFamily::of(&self.hdr.originator);
        let lq = self.hdr.msg_type.is_lq();
        let body_len = match &self.body {
            MessageBody::Hello(hello) => hello.len(lq),
            MessageBody::Tc(tc) => tc.len(lq),
            MessageBody::Mid(mid) => mid.len(),
            MessageBody::Hna(hna) => hna.len(),
            MessageBody::Unknown(data) => data.len(),
        };
        Self::hdr_len(af) + body_len
    }

    pub const fn hdr_len(af: AddressFamily) -> usize {
        8 + af.addr_len()
    }

    // Returns the copy of the message that is flooded further: TTL
    // decremented and hop count incremented.
    pub fn forwarded(&self) -> Message {
        let mut msg = self.clone();
        msg.hdr.ttl = msg.hdr.ttl.saturating_sub(1);
        msg.hdr.hop_count = msg.hdr.hop_count.saturating_add(1);
        msg
    }
}

// ===== impl MessageType =====

impl MessageType {
    pub const HELLO: u8 = 1;
    pub const TC: u8 = 2;
    pub const MID: u8 = 3;
    pub const HNA: u8 = 4;
    pub const LQ_HELLO: u8 = 201;
    pub const LQ_TC: u8 = 202;

    pub const fn to_u8(&self) -> u8 {
        match self {
            MessageType::Hello => Self::HELLO,
            MessageType::Tc => Self::TC,
            MessageType::Mid => Self::MID,
            MessageType::Hna => Self::HNA,
            MessageType::LqHello => Self::LQ_HELLO,
            MessageType::LqTc => Self::LQ_TC,
            MessageType::Unknown(msg_type) => *msg_type,
        }
    }

    // Returns whether the message type carries link quality data.
    pub const fn is_lq(&self) -> bool {
        matches!(self, MessageType::LqHello | MessageType::LqTc)
    }
}

impl From<u8> for MessageType {
    fn from(value: u8) -> MessageType {
        match value {
            Self::HELLO => MessageType::Hello,
            Self::TC => MessageType::Tc,
            Self::MID => MessageType::Mid,
            Self::HNA => MessageType::Hna,
            Self::LQ_HELLO => MessageType::LqHello,
            Self::LQ_TC => MessageType::LqTc,
            _ => MessageType::Unknown(value),
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageType::Hello => write!(f, "HELLO"),
            MessageType::Tc => write!(f, "TC"),
            MessageType::Mid => write!(f, "MID"),
            MessageType::Hna => write!(f, "HNA"),
            MessageType::LqHello => write!(f, "LQ_HELLO"),
            MessageType::LqTc => write!(f, "LQ_TC"),
            MessageType::Unknown(msg_type) => write!(f, "unknown({msg_type})"),
        }
    }
}

// ===== impl NeighborAddr =====

impl NeighborAddr {
    pub const LQ_RESERVED_LEN: usize = 2;

    pub(crate) fn encode(&self, buf: &mut BytesMut, lq: bool) {
        encode_addr(buf, &self.addr);
        if lq {
            buf.put_slice(&self.lq);
            buf.put_u16(0);
        }
    }

    pub(crate) fn decode(
        buf: &mut Bytes,
        cxt: &DecodeCxt,
        lq: bool,
    ) -> DecodeResult<Self> {
        let addr = decode_addr(buf, cxt.af)?;
        let mut lq_data = Bytes::new();
        if lq {
            let lq_len = cxt.lq_len.unwrap_or(0);
            if buf.remaining() < lq_len + Self::LQ_RESERVED_LEN {
                return Err(DecodeError::ReadOutOfBounds);
            }
            lq_data = buf.copy_to_bytes(lq_len);
            let _reserved = buf.try_get_u16()?;
        }
        Ok(NeighborAddr { addr, lq: lq_data })
    }

    pub(crate) fn len(&self, lq: bool) -> usize {
        let mut len = AddressFamily::of(&self.addr).addr_len();
        if lq {
            len += self.lq.len() + Self::LQ_RESERVED_LEN;
        }
        len
    }
}

// ===== impl Vtime =====

impl Vtime {
    // Largest representable validity time (mantissa and exponent of 15).
    pub const MAX: Duration = Duration::from_secs(3968);

    // Encodes a duration, rounding down to the nearest representable value.
    pub fn from_duration(duration: Duration) -> Vtime {
        // Number of C units (1/16 seconds).
        let units = duration.as_secs_f64() * 16.0;
        if units < 1.0 {
            return Vtime(0);
        }
        if units >= f64::from(u32::MAX) {
            return Vtime(0xFF);
        }

        let mut b = 31 - (units as u32).leading_zeros();
        if b > 15 {
            return Vtime(0xFF);
        }
        let mut a = ((units / f64::from(1u32 << b) - 1.0) * 16.0 + 1e-9)
            .floor() as u32;
        if a >= 16 {
            b += 1;
            a = 0;
            if b > 15 {
                return Vtime(0xFF);
            }
        }
        Vtime(((a << 4) | b) as u8)
    }

    pub fn to_duration(&self) -> Duration {
        let a = u64::from(self.0 >> 4);
        let b = u64::from(self.0 & 0x0F);
        // (1 + a/16) * 2^b / 16 seconds.
        let millis = (((16 + a) << b) * 1000) / 256;
        Duration::from_millis(millis)
    }
}

impl From<Duration> for Vtime {
    fn from(duration: Duration) -> Vtime {
        Vtime::from_duration(duration)
    }
}

// ===== helper functions =====

pub(crate) fn encode_addr(buf: &mut BytesMut, addr: &IpAddr) {
    match addr {
        IpAddr::V4(addr) => buf.put_u32((*addr).into()),
        IpAddr::V6(addr) => buf.put_u128((*addr).into()),
    }
}

pub(crate) fn decode_addr(
    buf: &mut Bytes,
    af: AddressFamily,
) -> DecodeResult<IpAddr> {
    let addr: IpAddr = match af {
        AddressFamily::Ipv4 => Ipv4Addr::from(buf.try_get_u32()?).into(),
        AddressFamily::Ipv6 => Ipv6Addr::from(buf.try_get_u128()?).into(),
    };
    Ok(addr)
}

// ===== unit tests =====

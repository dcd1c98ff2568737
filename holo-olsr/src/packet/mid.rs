//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::IpAddr;

use bytes::{Buf, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::packet::error::{DecodeError, DecodeResult};
use crate::packet::{AddressFamily, DecodeCxt, decode_addr, encode_addr};

//
// MID message format.
//
//  0                   1                   2                   3
//  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                    OLSR Interface Address                     |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                    OLSR Interface Address                     |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                              ...                              |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct Mid {
    pub addrs: Vec<IpAddr>,
}

// ===== impl Mid =====

impl Mid {
    pub(crate) fn encode(&self, buf: &mut BytesMut) {
        for addr in &self.addrs {
            encode_addr(buf, addr);
        }
    }

    pub(crate) fn decode(
        buf: &mut Bytes,
        cxt: &DecodeCxt,
    ) -> DecodeResult<Self> {
        if buf.remaining() % cxt.af.addr_len() != 0 {
            return Err(DecodeError::InvalidBodyLength(buf.remaining() as u16));
        }

        let mut addrs = vec![];
        while buf.remaining() > 0 {
            let addr = decode_addr(buf, cxt.af)?;
            addrs.push(addr);
        }

        Ok(Mid { addrs })
    }

    pub(crate) fn len(&self) -> usize {
        self.addrs
            .iter()
            .map(|addr| AddressFamily::of(addr).addr_len())
            .sum()
    }
}

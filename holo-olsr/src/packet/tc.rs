//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::packet::error::{DecodeError, DecodeResult};
use crate::packet::{DecodeCxt, MessageType, NeighborAddr};
use crate::seqno::SeqNo;

//
// TC message format.
//
//  0                   1                   2                   3
//  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |              ANSN             |           Reserved            |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |               Advertised Neighbor Main Address                |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |               Advertised Neighbor Main Address                |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                              ...                              |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct Tc {
    pub ansn: SeqNo,
    pub neighbors: Vec<NeighborAddr>,
}

// ===== impl Tc =====

impl Tc {
    pub(crate) fn encode(&self, buf: &mut BytesMut, lq: bool) {
        buf.put_u16(self.ansn.get());
        buf.put_u16(0);
        for nbr in &self.neighbors {
            nbr.encode(buf, lq);
        }
    }

    pub(crate) fn decode(
        buf: &mut Bytes,
        cxt: &DecodeCxt,
        lq: bool,
    ) -> DecodeResult<Self> {
        let ansn = SeqNo::from(buf.try_get_u16()?);
        let _reserved = buf.try_get_u16()?;

        let msg_type = if lq { MessageType::LqTc } else { MessageType::Tc };
        if buf.remaining() % cxt.entry_len(msg_type) != 0 {
            return Err(DecodeError::InvalidBodyLength(buf.remaining() as u16));
        }

        let mut neighbors = vec![];
        while buf.remaining() > 0 {
            let nbr = NeighborAddr::decode(buf, cxt, lq)?;
            neighbors.push(nbr);
        }

        Ok(Tc { ansn, neighbors })
    }

    pub(crate) fn len(&self, lq: bool) -> usize {
        4 + self.neighbors.iter().map(|nbr| nbr.len(lq)).sum::<usize>()
    }
}

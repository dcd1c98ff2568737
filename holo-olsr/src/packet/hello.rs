//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use bytes::{Buf, BufMut, Bytes, BytesMut};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};

use crate::packet::error::{DecodeError, DecodeResult};
use crate::packet::{DecodeCxt, MessageType, NeighborAddr, Vtime};

//
// HELLO message format.
//
//  0                   1                   2                   3
//  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |          Reserved             |     Htime     |  Willingness  |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |   Link Code   |   Reserved    |       Link Message Size       |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                  Neighbor Interface Address                   |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                  Neighbor Interface Address                   |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// :                             .  .  .                           :
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |   Link Code   |   Reserved    |       Link Message Size       |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// :                             .  .  .                           :
//
// In LQ_HELLO messages, every neighbor interface address is followed by
// the link quality data and two reserved bytes.
//
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct Hello {
    pub htime: Vtime,
    pub willingness: u8,
    pub links: Vec<LinkBlock>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct LinkBlock {
    pub link_code: LinkCode,
    pub neighbors: Vec<NeighborAddr>,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct LinkCode {
    pub link_type: LinkType,
    pub neighbor_type: NeighborType,
}

#[derive(Clone, Copy, Debug, Eq, FromPrimitive, Hash, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum LinkType {
    Unspec = 0,
    Asym = 1,
    Sym = 2,
    Lost = 3,
}

#[derive(Clone, Copy, Debug, Eq, FromPrimitive, Hash, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum NeighborType {
    NotNeigh = 0,
    Sym = 1,
    Mpr = 2,
}

// ===== impl Hello =====

impl Hello {
    pub const BLOCK_HDR_LEN: usize = 4;

    pub(crate) fn encode(&self, buf: &mut BytesMut, lq: bool) {
        buf.put_u16(0);
        buf.put_u8(self.htime.0);
        buf.put_u8(self.willingness);
        for block in &self.links {
            let start_pos = buf.len();
            buf.put_u8(block.link_code.encode());
            buf.put_u8(0);
            // The size will be initialized later.
            buf.put_u16(0);
            for nbr in &block.neighbors {
                nbr.encode(buf, lq);
            }

            // Initialize link message size.
            let size = (buf.len() - start_pos) as u16;
            buf[start_pos + 2..start_pos + 4]
                .copy_from_slice(&size.to_be_bytes());
        }
    }

    pub(crate) fn decode(
        buf: &mut Bytes,
        cxt: &DecodeCxt,
        lq: bool,
    ) -> DecodeResult<Self> {
        let _reserved = buf.try_get_u16()?;
        let htime = Vtime(buf.try_get_u8()?);
        let willingness = buf.try_get_u8()?;
        if willingness > 7 {
            return Err(DecodeError::InvalidWillingness(willingness));
        }

        let msg_type = if lq {
            MessageType::LqHello
        } else {
            MessageType::Hello
        };
        let entry_len = cxt.entry_len(msg_type);

        // Parse link message blocks.
        let mut links = vec![];
        while buf.remaining() > 0 {
            if buf.remaining() < Self::BLOCK_HDR_LEN {
                return Err(DecodeError::InvalidLinkBlockSize(
                    buf.remaining() as u16,
                ));
            }
            let link_code = buf.try_get_u8()?;
            let _reserved = buf.try_get_u8()?;
            let size = buf.try_get_u16()?;
            if (size as usize) < Self::BLOCK_HDR_LEN
                || size as usize - Self::BLOCK_HDR_LEN > buf.remaining()
                || (size as usize - Self::BLOCK_HDR_LEN) % entry_len != 0
            {
                return Err(DecodeError::InvalidLinkBlockSize(size));
            }
            let mut block_buf =
                buf.copy_to_bytes(size as usize - Self::BLOCK_HDR_LEN);

            // Link codes with unknown values must be silently ignored.
            let Some(link_code) = LinkCode::decode(link_code) else {
                continue;
            };

            let mut neighbors = vec![];
            while block_buf.remaining() > 0 {
                let nbr = NeighborAddr::decode(&mut block_buf, cxt, lq)?;
                neighbors.push(nbr);
            }
            links.push(LinkBlock {
                link_code,
                neighbors,
            });
        }

        Ok(Hello {
            htime,
            willingness,
            links,
        })
    }

    pub(crate) fn len(&self, lq: bool) -> usize {
        4 + self
            .links
            .iter()
            .map(|block| {
                Self::BLOCK_HDR_LEN
                    + block
                        .neighbors
                        .iter()
                        .map(|nbr| nbr.len(lq))
                        .sum::<usize>()
            })
            .sum::<usize>()
    }

    // Returns an iterator over all advertised neighbor addresses along with
    // their link codes.
    pub fn iter_neighbors(
        &self,
    ) -> impl Iterator<Item = (LinkCode, &NeighborAddr)> + '_ {
        self.links.iter().flat_map(|block| {
            block.neighbors.iter().map(|nbr| (block.link_code, nbr))
        })
    }
}

// ===== impl LinkCode =====

impl LinkCode {
    pub const fn new(link_type: LinkType, neighbor_type: NeighborType) -> Self {
        LinkCode {
            link_type,
            neighbor_type,
        }
    }

    pub const fn encode(&self) -> u8 {
        ((self.neighbor_type as u8) << 2) | self.link_type as u8
    }

    pub fn decode(value: u8) -> Option<Self> {
        if value > 0x0F {
            return None;
        }
        let link_type = LinkType::from_u8(value & 0x03)?;
        let neighbor_type = NeighborType::from_u8(value >> 2)?;
        Some(LinkCode {
            link_type,
            neighbor_type,
        })
    }

    // A SYM_LINK advertised as NOT_NEIGH is a contradiction that receivers
    // must ignore.
    pub fn is_valid(&self) -> bool {
        !(self.link_type == LinkType::Sym
            && self.neighbor_type == NeighborType::NotNeigh)
    }
}

impl std::fmt::Display for LinkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkType::Unspec => write!(f, "unspec"),
            LinkType::Asym => write!(f, "asymmetric"),
            LinkType::Sym => write!(f, "symmetric"),
            LinkType::Lost => write!(f, "lost"),
        }
    }
}

impl std::fmt::Display for NeighborType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NeighborType::NotNeigh => write!(f, "not-neighbor"),
            NeighborType::Sym => write!(f, "symmetric"),
            NeighborType::Mpr => write!(f, "mpr"),
        }
    }
}

// ===== unit tests =====

//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use bytes::{Buf, Bytes, BytesMut};
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

use crate::packet::error::{DecodeError, DecodeResult};
use crate::packet::{AddressFamily, DecodeCxt, decode_addr, encode_addr};

//
// HNA message format.
//
//  0                   1                   2                   3
//  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                         Network Address                       |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                             Netmask                           |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                         Network Address                       |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                             Netmask                           |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                              ...                              |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct Hna {
    pub prefixes: Vec<IpNetwork>,
}

// ===== impl Hna =====

impl Hna {
    pub(crate) fn encode(&self, buf: &mut BytesMut) {
        for prefix in &self.prefixes {
            encode_addr(buf, &prefix.network());
            encode_addr(buf, &prefix.mask());
        }
    }

    pub(crate) fn decode(
        buf: &mut Bytes,
        cxt: &DecodeCxt,
    ) -> DecodeResult<Self> {
        if buf.remaining() % (cxt.af.addr_len() * 2) != 0 {
            return Err(DecodeError::InvalidBodyLength(buf.remaining() as u16));
        }

        let mut prefixes = vec![];
        while buf.remaining() > 0 {
            let network = decode_addr(buf, cxt.af)?;
            let netmask = decode_addr(buf, cxt.af)?;
            let prefix = ipnetwork::ip_mask_to_prefix(netmask)
                .and_then(|plen| IpNetwork::new(network, plen))
                .map_err(|_| DecodeError::InvalidHnaPrefix(network, netmask))?;
            prefixes.push(prefix);
        }

        Ok(Hna { prefixes })
    }

    pub(crate) fn len(&self) -> usize {
        self.prefixes
            .iter()
            .map(|prefix| AddressFamily::of(&prefix.ip()).addr_len() * 2)
            .sum()
    }
}

//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use bytes::BytesMut;

use crate::lq::{Cost, LinkQuality};

// RFC 3626 hop-count metric: every symmetric link costs one hop.
#[derive(Clone, Copy, Debug, Default)]
pub struct HopCount;

// ===== impl HopCount =====

impl LinkQuality for HopCount {
    type LinkLq = ();
    type WireLq = ();

    const NAME: &'static str = "hop-count";

    fn wire_len(&self) -> Option<usize> {
        None
    }

    fn link_lq_new(&self) {}

    fn account_packet(&self, _lq: &mut (), _received: bool) {}

    fn merge_foreign(&self, _lq: &mut (), _remote: &()) {}

    fn link_cost(&self, _lq: &()) -> Cost {
        Cost::ONE_HOP
    }

    fn edge_cost(&self, _wire: &()) -> Cost {
        Cost::ONE_HOP
    }

    fn is_relevant_change(&self, old: Cost, new: Cost) -> bool {
        old != new
    }

    fn hello_lq(&self, _lq: &()) {}

    fn tc_lq(&self, _lq: &()) {}

    fn serialize(&self, _wire: &(), _buf: &mut BytesMut) {}

    fn deserialize(&self, _data: &[u8]) -> Option<()> {
        Some(())
    }
}

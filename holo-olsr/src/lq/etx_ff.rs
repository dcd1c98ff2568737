//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use crate::lq::{Cost, LinkQuality};

// ETX metric computed over a sliding window of received and lost packets.
//
// The link quality (LQ) is the fraction of packets received from the
// neighbor over the last `window` packets, while the neighbor link quality
// (NLQ) is the LQ reported by the neighbor itself. Both are carried on the
// wire as a single byte each, and the link cost is 1 / (LQ * NLQ).
#[derive(Clone, Copy, Debug)]
pub struct EtxFf {
    window: u8,
}

#[derive(Clone, Debug)]
pub struct EtxFfLinkLq {
    pub history: LossWindow,
    pub nlq: u8,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct EtxFfWireLq {
    pub lq: u8,
    pub nlq: u8,
}

// Reception history of the last N packets, one bit per packet (1 for
// received, 0 for lost), most recent in the least significant bit.
#[derive(Clone, Copy, Debug, Default)]
pub struct LossWindow {
    bits: u64,
    len: u8,
    size: u8,
}

// ===== impl EtxFf =====

impl EtxFf {
    pub const MAX_WINDOW: u8 = 64;

    // Cost changes smaller than this aren't worth a route recalculation.
    const RELEVANT_COST_CHANGE: u32 = 16;

    pub fn new(window: u8) -> EtxFf {
        EtxFf {
            window: window.clamp(1, Self::MAX_WINDOW),
        }
    }

    pub fn window(&self) -> u8 {
        self.window
    }

    fn cost(lq: u8, nlq: u8) -> Cost {
        if lq == 0 || nlq == 0 {
            return Cost::BROKEN;
        }
        let num = Cost::ONE_HOP.get() as u64 * 255 * 255;
        Cost::from_wide(num / (lq as u64 * nlq as u64))
    }
}

impl Default for EtxFf {
    fn default() -> EtxFf {
        EtxFf::new(32)
    }
}

impl LinkQuality for EtxFf {
    type LinkLq = EtxFfLinkLq;
    type WireLq = EtxFfWireLq;

    const NAME: &'static str = "etx-ff";

    fn wire_len(&self) -> Option<usize> {
        Some(2)
    }

    fn link_lq_new(&self) -> EtxFfLinkLq {
        EtxFfLinkLq {
            history: LossWindow::new(self.window),
            nlq: 0,
        }
    }

    fn account_packet(&self, lq: &mut EtxFfLinkLq, received: bool) {
        lq.history.push(received);
    }

    fn merge_foreign(&self, lq: &mut EtxFfLinkLq, remote: &EtxFfWireLq) {
        // What the neighbor receives from us is our NLQ.
        lq.nlq = remote.lq;
    }

    fn link_cost(&self, lq: &EtxFfLinkLq) -> Cost {
        Self::cost(lq.history.quality(), lq.nlq)
    }

    fn edge_cost(&self, wire: &EtxFfWireLq) -> Cost {
        Self::cost(wire.lq, wire.nlq)
    }

    fn is_relevant_change(&self, old: Cost, new: Cost) -> bool {
        if old.is_broken() || new.is_broken() {
            return old != new;
        }
        old.get().abs_diff(new.get()) > Self::RELEVANT_COST_CHANGE
    }

    fn hello_lq(&self, lq: &EtxFfLinkLq) -> EtxFfWireLq {
        EtxFfWireLq {
            lq: lq.history.quality(),
            nlq: lq.nlq,
        }
    }

    fn tc_lq(&self, lq: &EtxFfLinkLq) -> EtxFfWireLq {
        self.hello_lq(lq)
    }

    fn serialize(&self, wire: &EtxFfWireLq, buf: &mut BytesMut) {
        buf.put_u8(wire.lq);
        buf.put_u8(wire.nlq);
    }

    fn deserialize(&self, data: &[u8]) -> Option<EtxFfWireLq> {
        match data {
            [lq, nlq] => Some(EtxFfWireLq { lq: *lq, nlq: *nlq }),
            _ => None,
        }
    }
}

// ===== impl LossWindow =====

impl LossWindow {
    pub fn new(size: u8) -> LossWindow {
        LossWindow {
            bits: 0,
            len: 0,
            size: size.clamp(1, EtxFf::MAX_WINDOW),
        }
    }

    pub fn push(&mut self, received: bool) {
        self.bits = (self.bits << 1) | received as u64;
        if self.len < self.size {
            self.len += 1;
        }
    }

    // Number of received packets in the window.
    pub fn received(&self) -> u32 {
        (self.bits & self.mask()).count_ones()
    }

    // Number of packets accounted in the window.
    pub fn total(&self) -> u32 {
        self.len as u32
    }

    // Reception ratio scaled to the [0, 255] range.
    pub fn quality(&self) -> u8 {
        if self.len == 0 {
            return 0;
        }
        (self.received() * 255 / self.total()) as u8
    }

    fn mask(&self) -> u64 {
        if self.len >= 64 {
            u64::MAX
        } else {
            (1u64 << self.len) - 1
        }
    }
}

// ===== unit tests =====

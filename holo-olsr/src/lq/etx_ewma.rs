//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use crate::lq::{Cost, LinkQuality};

// ETX metric whose reception ratio is an exponentially weighted moving
// average, kept in 16-bit fixed point (65535 is a ratio of 1.0).
//
// Every accounted packet updates the quality as `q' = q * (1 - a) + a * s`,
// where `s` is 1.0 for a received packet and 0.0 for a lost one. During
// the first packets of a link the aging factor is raised to 1/n so the
// quality converges quickly from its initial value.
#[derive(Clone, Copy, Debug)]
pub struct EtxEwma {
    // Aging factor in 16-bit fixed point.
    alpha: u32,
}

#[derive(Clone, Debug, Default)]
pub struct EtxEwmaLinkLq {
    pub lq: u16,
    pub nlq: u16,
    pub samples: u32,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct EtxEwmaWireLq {
    pub lq: u16,
    pub nlq: u16,
}

// ===== impl EtxEwma =====

impl EtxEwma {
    const ONE: u32 = 1 << 16;
    const RELEVANT_COST_CHANGE: u32 = 16;

    pub fn new(alpha: f32) -> EtxEwma {
        let alpha = (alpha.clamp(0.001, 1.0) * Self::ONE as f32) as u32;
        EtxEwma {
            alpha: alpha.clamp(1, Self::ONE),
        }
    }

    fn cost(lq: u16, nlq: u16) -> Cost {
        if lq == 0 || nlq == 0 {
            return Cost::BROKEN;
        }
        let full = u16::MAX as u64;
        let num = Cost::ONE_HOP.get() as u64 * full * full;
        Cost::from_wide(num / (lq as u64 * nlq as u64))
    }
}

impl Default for EtxEwma {
    fn default() -> EtxEwma {
        EtxEwma::new(0.05)
    }
}

impl LinkQuality for EtxEwma {
    type LinkLq = EtxEwmaLinkLq;
    type WireLq = EtxEwmaWireLq;

    const NAME: &'static str = "etx-ewma";

    fn wire_len(&self) -> Option<usize> {
        Some(4)
    }

    fn link_lq_new(&self) -> EtxEwmaLinkLq {
        EtxEwmaLinkLq::default()
    }

    fn account_packet(&self, lq: &mut EtxEwmaLinkLq, received: bool) {
        lq.samples = lq.samples.saturating_add(1);
        let quick_start = Self::ONE / lq.samples;
        let alpha = self.alpha.max(quick_start) as u64;

        let sample = if received { u16::MAX as u64 } else { 0 };
        let old = lq.lq as u64 * (Self::ONE as u64 - alpha);
        let new = sample * alpha;
        lq.lq = ((old + new) >> 16) as u16;
    }

    fn merge_foreign(&self, lq: &mut EtxEwmaLinkLq, remote: &EtxEwmaWireLq) {
        lq.nlq = remote.lq;
    }

    fn link_cost(&self, lq: &EtxEwmaLinkLq) -> Cost {
        Self::cost(lq.lq, lq.nlq)
    }

    fn edge_cost(&self, wire: &EtxEwmaWireLq) -> Cost {
        Self::cost(wire.lq, wire.nlq)
    }

    fn is_relevant_change(&self, old: Cost, new: Cost) -> bool {
        if old.is_broken() || new.is_broken() {
            return old != new;
        }
        old.get().abs_diff(new.get()) > Self::RELEVANT_COST_CHANGE
    }

    fn hello_lq(&self, lq: &EtxEwmaLinkLq) -> EtxEwmaWireLq {
        EtxEwmaWireLq {
            lq: lq.lq,
            nlq: lq.nlq,
        }
    }

    fn tc_lq(&self, lq: &EtxEwmaLinkLq) -> EtxEwmaWireLq {
        self.hello_lq(lq)
    }

    fn serialize(&self, wire: &EtxEwmaWireLq, buf: &mut BytesMut) {
        buf.put_u16(wire.lq);
        buf.put_u16(wire.nlq);
    }

    fn deserialize(&self, data: &[u8]) -> Option<EtxEwmaWireLq> {
        match data {
            [lq0, lq1, nlq0, nlq1] => Some(EtxEwmaWireLq {
                lq: u16::from_be_bytes([*lq0, *lq1]),
                nlq: u16::from_be_bytes([*nlq0, *nlq1]),
            }),
            _ => None,
        }
    }
}

// ===== unit tests =====

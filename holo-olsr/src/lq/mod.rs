//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

pub mod etx_ewma;
pub mod etx_ff;
pub mod hopcount;

use std::fmt::Debug;

use bytes::BytesMut;
use serde::{Deserialize, Serialize};

pub use crate::lq::etx_ewma::EtxEwma;
pub use crate::lq::etx_ff::EtxFf;
pub use crate::lq::hopcount::HopCount;

// Path cost.
//
// Costs are fixed-point values where a perfect link (one hop) is worth
// `Cost::ONE_HOP`. The maximum representable value is reserved to mark
// links and edges that are currently unusable.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
#[serde(transparent)]
pub struct Cost(u32);

// Link quality model.
//
// The protocol engine obtains every link and edge cost through this trait
// and never looks into the quality values themselves. The data carried on
// the wire is likewise opaque to the packet codec: it's handed over to
// the model for (de)serialization.
pub trait LinkQuality
where
    Self: Clone + Debug + Send + Sync + 'static,
{
    // Per-link state observed locally.
    type LinkLq: Clone + Debug + Send + Sync;

    // Quality pair carried in LQ_HELLO and LQ_TC messages.
    type WireLq: Clone + Debug + Eq + Send + Sync;

    // Model name used for logging.
    const NAME: &'static str;

    // Returns the length of the quality pair on the wire. Models that don't
    // return a length run with the RFC 3626 message formats.
    fn wire_len(&self) -> Option<usize>;

    // Returns the initial state of a newly created link.
    fn link_lq_new(&self) -> Self::LinkLq;

    // Accounts for a received or lost packet on the given link.
    fn account_packet(&self, lq: &mut Self::LinkLq, received: bool);

    // Combines the locally observed quality with the one reported by the
    // neighbor for the reverse direction.
    fn merge_foreign(&self, lq: &mut Self::LinkLq, remote: &Self::WireLq);

    // Returns the cost of a local link.
    fn link_cost(&self, lq: &Self::LinkLq) -> Cost;

    // Returns the cost of an edge advertised by another node.
    fn edge_cost(&self, wire: &Self::WireLq) -> Cost;

    // Returns whether a cost change is large enough to trigger a route
    // recalculation.
    fn is_relevant_change(&self, old: Cost, new: Cost) -> bool;

    // Returns the quality pair to advertise for a link in HELLO messages.
    fn hello_lq(&self, lq: &Self::LinkLq) -> Self::WireLq;

    // Returns the quality pair to advertise for a neighbor in TC messages.
    fn tc_lq(&self, lq: &Self::LinkLq) -> Self::WireLq;

    // Encodes a quality pair.
    fn serialize(&self, wire: &Self::WireLq, buf: &mut BytesMut);

    // Decodes a quality pair. Returns `None` if the data is malformed.
    fn deserialize(&self, data: &[u8]) -> Option<Self::WireLq>;
}

// ===== impl Cost =====

impl Cost {
    pub const ZERO: Cost = Cost(0);
    pub const ONE_HOP: Cost = Cost(1024);
    pub const BROKEN: Cost = Cost(u32::MAX);

    // Largest cost of a usable path.
    pub const MAX: Cost = Cost(u32::MAX - 1);

    pub const fn new(value: u32) -> Cost {
        Cost(value)
    }

    pub const fn get(&self) -> u32 {
        self.0
    }

    pub const fn is_broken(&self) -> bool {
        self.0 == u32::MAX
    }

    // Builds a cost from a wide intermediate value, saturating at the
    // largest usable cost.
    pub fn from_wide(value: u64) -> Cost {
        Cost(value.min(Self::MAX.0 as u64) as u32)
    }

    // Adds two costs. A broken cost is absorbing, and sums of usable costs
    // never become broken.
    pub fn saturating_add(&self, other: Cost) -> Cost {
        if self.is_broken() || other.is_broken() {
            return Cost::BROKEN;
        }
        Cost::from_wide(self.0 as u64 + other.0 as u64)
    }

    // Scales the cost by the given factor.
    pub fn scale(&self, factor: f32) -> Cost {
        if self.is_broken() {
            return Cost::BROKEN;
        }
        Cost::from_wide((self.0 as f64 * factor as f64) as u64)
    }
}

impl std::fmt::Display for Cost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_broken() {
            return write!(f, "INFINITE");
        }
        write!(f, "{:.3}", self.0 as f64 / Self::ONE_HOP.0 as f64)
    }
}

// ===== unit tests =====

//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

// 16-bit sequence number used for packets, messages and ANSNs.
//
// Comparisons follow RFC 3626 Section 19: S1 is "greater than" S2 when
// either S1 > S2 and S1 - S2 <= MAXVALUE/2, or S2 > S1 and
// S2 - S1 > MAXVALUE/2. In other words, a jump of more than half the number
// space is interpreted as wraparound and the larger raw value is older.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[derive(Deserialize, Serialize)]
#[serde(transparent)]
pub struct SeqNo(u16);

// ===== impl SeqNo =====

impl SeqNo {
    const HALF_RANGE: u16 = u16::MAX / 2;

    pub const fn new(value: u16) -> SeqNo {
        SeqNo(value)
    }

    pub const fn get(&self) -> u16 {
        self.0
    }

    // Returns the sequence number that follows this one.
    pub const fn next(&self) -> SeqNo {
        SeqNo(self.0.wrapping_add(1))
    }

    // Advances the sequence number and returns the value prior to the
    // increment.
    pub fn fetch_increment(&mut self) -> SeqNo {
        let current = *self;
        *self = self.next();
        current
    }

    // Wraparound-aware comparison.
    pub fn compare(&self, other: &SeqNo) -> Ordering {
        if self.0 == other.0 {
            return Ordering::Equal;
        }
        let diff = self.0.wrapping_sub(other.0);
        if diff <= Self::HALF_RANGE {
            Ordering::Greater
        } else {
            Ordering::Less
        }
    }

    pub fn is_newer_than(&self, other: &SeqNo) -> bool {
        self.compare(other) == Ordering::Greater
    }

    pub fn is_older_than(&self, other: &SeqNo) -> bool {
        self.compare(other) == Ordering::Less
    }

    // Number of sequence numbers skipped between `self` and the newer
    // `other` (zero when `other` directly follows `self`).
    pub fn gap_to(&self, other: &SeqNo) -> u16 {
        other.0.wrapping_sub(self.0).saturating_sub(1)
    }
}

impl From<u16> for SeqNo {
    fn from(value: u16) -> SeqNo {
        SeqNo(value)
    }
}

impl std::fmt::Display for SeqNo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

// ===== unit tests =====

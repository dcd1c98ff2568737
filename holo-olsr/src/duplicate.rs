//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::{BTreeSet, HashMap};
use std::net::IpAddr;
use std::time::{Duration, Instant};

use crate::seqno::SeqNo;

// Duplicate set (RFC 3626 Section 3.4).
//
// Records every message processed or forwarded, so that flooded messages
// are handled only once per node.
#[derive(Debug)]
pub struct DuplicateSet {
    records: HashMap<(IpAddr, SeqNo), DuplicateRecord>,
    hold_time: Duration,
}

#[derive(Clone, Debug)]
pub struct DuplicateRecord {
    // Interfaces on which the message was already received.
    pub ifaces: BTreeSet<String>,
    pub forwarded: bool,
    pub expires_at: Instant,
}

// ===== impl DuplicateSet =====

impl DuplicateSet {
    // DUP_HOLD_TIME.
    pub const DFLT_HOLD_TIME: Duration = Duration::from_secs(30);

    pub fn new(hold_time: Duration) -> DuplicateSet {
        DuplicateSet {
            records: Default::default(),
            hold_time,
        }
    }

    // Returns whether the message wasn't processed yet.
    pub fn should_process(
        &self,
        now: Instant,
        originator: &IpAddr,
        seqno: SeqNo,
    ) -> bool {
        self.lookup(now, originator, seqno).is_none()
    }

    // Returns whether the message received on the given interface is
    // eligible for forwarding: it wasn't forwarded yet, and it wasn't
    // already received on this interface.
    pub fn should_forward(
        &self,
        now: Instant,
        originator: &IpAddr,
        seqno: SeqNo,
        ifname: &str,
    ) -> bool {
        match self.lookup(now, originator, seqno) {
            Some(record) => {
                !record.forwarded && !record.ifaces.contains(ifname)
            }
            None => true,
        }
    }

    // Records that the message was processed.
    pub fn mark_processed(
        &mut self,
        now: Instant,
        originator: IpAddr,
        seqno: SeqNo,
    ) {
        let hold_time = self.hold_time;
        let record = self.record_mut(now, originator, seqno);
        record.expires_at = now + hold_time;
    }

    // Records that the message was received on the given interface, and
    // whether it was retransmitted.
    pub fn mark_forwarded(
        &mut self,
        now: Instant,
        originator: IpAddr,
        seqno: SeqNo,
        ifname: &str,
        retransmitted: bool,
    ) {
        let hold_time = self.hold_time;
        let record = self.record_mut(now, originator, seqno);
        record.expires_at = now + hold_time;
        record.ifaces.insert(ifname.to_owned());
        record.forwarded |= retransmitted;
    }

    // Deletes the expired records.
    pub fn expire(&mut self, now: Instant) {
        self.records.retain(|_, record| record.expires_at > now);
    }

    pub fn get(
        &self,
        originator: &IpAddr,
        seqno: SeqNo,
    ) -> Option<&DuplicateRecord> {
        self.records.get(&(*originator, seqno))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    // Records whose holding time elapsed are ignored even before they're
    // garbage collected.
    fn lookup(
        &self,
        now: Instant,
        originator: &IpAddr,
        seqno: SeqNo,
    ) -> Option<&DuplicateRecord> {
        self.records
            .get(&(*originator, seqno))
            .filter(|record| record.expires_at > now)
    }

    fn record_mut(
        &mut self,
        now: Instant,
        originator: IpAddr,
        seqno: SeqNo,
    ) -> &mut DuplicateRecord {
        let expires_at = now + self.hold_time;
        let record = self
            .records
            .entry((originator, seqno))
            .or_insert_with(|| DuplicateRecord {
                ifaces: Default::default(),
                forwarded: false,
                expires_at,
            });
        if record.expires_at <= now {
            record.ifaces.clear();
            record.forwarded = false;
        }
        record
    }
}

impl Default for DuplicateSet {
    fn default() -> DuplicateSet {
        DuplicateSet::new(Self::DFLT_HOLD_TIME)
    }
}

// ===== unit tests =====

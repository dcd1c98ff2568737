//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::{BTreeMap, BTreeSet, btree_map};
use std::net::IpAddr;
use std::time::{Duration, Instant};

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

use crate::debug::Debug;
use crate::instance::ChangeSet;
use crate::lq::{Cost, LinkQuality};
use crate::seqno::SeqNo;

// Topology information base (RFC 3626 Section 4.4), extended with the
// prefixes learned from HNA messages and the routing paths computed for
// every node.
#[derive(Debug, Default)]
pub struct Topology {
    nodes: BTreeMap<IpAddr, TopologyNode>,
}

#[derive(Debug)]
pub struct TopologyNode {
    pub originator: IpAddr,
    // Last ANSN received from this node. Unset until a TC message of this
    // node is received.
    pub ansn: Option<SeqNo>,
    pub tc_expires_at: Option<Instant>,
    pub edges: BTreeMap<IpAddr, TopologyEdge>,
    pub tc_prefixes: BTreeSet<IpNetwork>,
    pub hna_prefixes: BTreeMap<IpNetwork, Instant>,
    pub paths: BTreeMap<IpNetwork, RoutePath>,
    // Number of edges pointing to this node.
    pub refcount: usize,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TopologyEdge {
    pub dst: IpAddr,
    pub cost: Cost,
    // Whether the reverse edge is also known.
    pub inverse: bool,
}

// Candidate route to a prefix through its originator.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct RoutePath {
    pub prefix: IpNetwork,
    pub originator: IpAddr,
    pub origin: PrefixOrigin,
    pub nexthop: IpAddr,
    pub ifname: String,
    pub hops: u16,
    pub cost: Cost,
    // Route computation run that last refreshed this path.
    pub version: u64,
}

// How a prefix is associated with its originator. Lower values are
// preferred.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub enum PrefixOrigin {
    Main,
    Alias,
    Hna,
}

// ===== impl Topology =====

impl Topology {
    // Processes the neighbor set advertised in a TC message (RFC 3626
    // Section 9.5).
    //
    // TCs older than the last one received from the same originator are
    // ignored. Newer TCs replace the advertised set, while TCs with the
    // same ANSN only add or refresh entries.
    pub fn update_from_tc<L>(
        &mut self,
        lq_model: &L,
        now: Instant,
        originator: IpAddr,
        ansn: SeqNo,
        edges: &[(IpAddr, Cost)],
        prefixes: &[IpNetwork],
        validity: Duration,
    ) -> ChangeSet
    where
        L: LinkQuality,
    {
        let mut changes = ChangeSet::empty();

        let replace = match self.nodes.get(&originator).and_then(|n| n.ansn) {
            Some(last_ansn) if ansn.is_older_than(&last_ansn) => {
                Debug::TcStale(&originator, ansn, last_ansn).log();
                return changes;
            }
            Some(last_ansn) => ansn.is_newer_than(&last_ansn),
            None => true,
        };

        // Remove the edges and prefixes that are no longer advertised.
        if replace {
            let node = self.get_or_create(originator);
            let stale = node
                .edges
                .keys()
                .filter(|dst| !edges.iter().any(|(addr, _)| addr == *dst))
                .copied()
                .collect::<Vec<_>>();
            for dst in stale {
                self.edge_remove(&originator, &dst);
                changes.insert(ChangeSet::TOPOLOGY);
            }

            let node = self.get_or_create(originator);
            let count = node.tc_prefixes.len();
            node.tc_prefixes.retain(|prefix| prefixes.contains(prefix));
            if node.tc_prefixes.len() != count {
                changes.insert(ChangeSet::PREFIXES);
            }
        }

        // Add or refresh the advertised edges and prefixes.
        for (dst, cost) in edges.iter().filter(|(dst, _)| *dst != originator)
        {
            changes |= self.edge_update(lq_model, originator, *dst, *cost);
        }
        let node = self.get_or_create(originator);
        for prefix in prefixes {
            if node.tc_prefixes.insert(*prefix) {
                changes.insert(ChangeSet::PREFIXES);
            }
        }
        node.ansn = Some(ansn);
        node.tc_expires_at = Some(now + validity);

        changes
    }

    // Processes the prefixes advertised in an HNA message (RFC 3626 Section
    // 12.5).
    pub fn update_from_hna(
        &mut self,
        now: Instant,
        originator: IpAddr,
        prefixes: &[IpNetwork],
        validity: Duration,
    ) -> ChangeSet {
        let mut changes = ChangeSet::empty();
        let node = self.get_or_create(originator);
        let expires_at = now + validity;
        for prefix in prefixes {
            if node.hna_prefixes.insert(*prefix, expires_at).is_none() {
                Debug::HnaPrefixAdd(&originator, prefix).log();
                changes.insert(ChangeSet::PREFIXES);
            }
        }
        changes
    }

    // Deletes the TC state and HNA prefixes whose holding time elapsed, and
    // the nodes that are left without any state.
    pub fn expire(&mut self, now: Instant) -> ChangeSet {
        let mut changes = ChangeSet::empty();

        let expired = self
            .nodes
            .values()
            .filter(|node| {
                node.tc_expires_at.is_some_and(|deadline| deadline <= now)
            })
            .map(|node| node.originator)
            .collect::<Vec<_>>();
        for originator in expired {
            Debug::TcExpire(&originator).log();
            let dsts = self
                .nodes
                .get(&originator)
                .map(|node| node.edges.keys().copied().collect::<Vec<_>>())
                .unwrap_or_default();
            for dst in dsts {
                self.edge_remove(&originator, &dst);
            }
            if let Some(node) = self.nodes.get_mut(&originator) {
                node.ansn = None;
                node.tc_expires_at = None;
                if !node.tc_prefixes.is_empty() {
                    node.tc_prefixes.clear();
                    changes.insert(ChangeSet::PREFIXES);
                }
            }
            changes.insert(ChangeSet::TOPOLOGY);
        }

        for node in self.nodes.values_mut() {
            node.hna_prefixes.retain(|prefix, expires_at| {
                if *expires_at > now {
                    return true;
                }
                Debug::HnaPrefixDelete(&node.originator, prefix).log();
                changes.insert(ChangeSet::PREFIXES);
                false
            });
        }

        self.gc();
        changes
    }

    // Returns whether the edge can be used for path computation, which
    // requires the reverse edge to be known as well.
    pub fn is_edge_usable(&self, src: &IpAddr, dst: &IpAddr) -> bool {
        self.nodes
            .get(src)
            .and_then(|node| node.edges.get(dst))
            .is_some_and(|edge| edge.inverse && !edge.cost.is_broken())
    }

    pub fn get(&self, originator: &IpAddr) -> Option<&TopologyNode> {
        self.nodes.get(originator)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TopologyNode> + '_ {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // Returns the node of the given originator, creating it if necessary.
    pub(crate) fn get_or_create(
        &mut self,
        originator: IpAddr,
    ) -> &mut TopologyNode {
        self.nodes.entry(originator).or_insert_with(|| {
            Debug::TopologyNodeCreate(&originator).log();
            TopologyNode::new(originator)
        })
    }

    pub(crate) fn iter_mut(
        &mut self,
    ) -> impl Iterator<Item = &mut TopologyNode> + '_ {
        self.nodes.values_mut()
    }

    // Deletes the nodes that are left without state, dependents or paths.
    pub(crate) fn gc(&mut self) {
        self.nodes.retain(|originator, node| {
            if !node.is_unused() {
                return true;
            }
            Debug::TopologyNodeDelete(originator).log();
            false
        });
    }

    fn edge_update<L>(
        &mut self,
        lq_model: &L,
        src: IpAddr,
        dst: IpAddr,
        cost: Cost,
    ) -> ChangeSet
    where
        L: LinkQuality,
    {
        let inverse = self
            .nodes
            .get(&dst)
            .is_some_and(|node| node.edges.contains_key(&src));

        let node = self.get_or_create(src);
        match node.edges.entry(dst) {
            btree_map::Entry::Occupied(mut o) => {
                let edge = o.get_mut();
                if !lq_model.is_relevant_change(edge.cost, cost) {
                    return ChangeSet::empty();
                }
                edge.cost = cost;
                return ChangeSet::TOPOLOGY;
            }
            btree_map::Entry::Vacant(v) => {
                v.insert(TopologyEdge { dst, cost, inverse });
            }
        }

        // Account for the new edge in the destination node and its
        // reverse edge.
        let dst_node = self.get_or_create(dst);
        dst_node.refcount += 1;
        if let Some(reverse) = dst_node.edges.get_mut(&src) {
            reverse.inverse = true;
        }

        ChangeSet::TOPOLOGY
    }

    fn edge_remove(&mut self, src: &IpAddr, dst: &IpAddr) {
        let Some(node) = self.nodes.get_mut(src) else {
            return;
        };
        if node.edges.remove(dst).is_none() {
            return;
        }
        if let Some(dst_node) = self.nodes.get_mut(dst) {
            dst_node.refcount = dst_node.refcount.saturating_sub(1);
            if let Some(reverse) = dst_node.edges.get_mut(src) {
                reverse.inverse = false;
            }
        }
    }
}

// ===== impl TopologyNode =====

impl TopologyNode {
    fn new(originator: IpAddr) -> TopologyNode {
        TopologyNode {
            originator,
            ansn: None,
            tc_expires_at: None,
            edges: Default::default(),
            tc_prefixes: Default::default(),
            hna_prefixes: Default::default(),
            paths: Default::default(),
            refcount: 0,
        }
    }

    // Returns all prefixes associated with this node through TC or HNA
    // messages.
    pub fn prefixes(&self) -> impl Iterator<Item = &IpNetwork> + '_ {
        self.tc_prefixes.iter().chain(self.hna_prefixes.keys())
    }

    fn is_unused(&self) -> bool {
        self.ansn.is_none()
            && self.edges.is_empty()
            && self.hna_prefixes.is_empty()
            && self.paths.is_empty()
            && self.refcount == 0
    }
}

// ===== impl PrefixOrigin =====

impl std::fmt::Display for PrefixOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrefixOrigin::Main => write!(f, "main"),
            PrefixOrigin::Alias => write!(f, "alias"),
            PrefixOrigin::Hna => write!(f, "hna"),
        }
    }
}

// ===== unit tests =====

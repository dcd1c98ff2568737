//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use std::time::{Duration, Instant};

use crate::alias::Aliases;
use crate::debug::Debug;
use crate::instance::ChangeSet;
use crate::lq::{Cost, LinkQuality};
use crate::neighbor::{Neighbor, Neighbors};
use crate::packet::{Hello, NeighborType};

// Node located two hops away, and the one-hop neighbors through which it's
// reachable.
#[derive(Debug)]
pub struct TwoHopNeighbor {
    pub addr: IpAddr,
    pub paths: BTreeMap<IpAddr, TwoHopPath>,
}

#[derive(Clone, Copy, Debug)]
pub struct TwoHopPath {
    // Cost from this node to the two-hop neighbor.
    pub cost: Cost,
    // Cost from the one-hop neighbor to the two-hop neighbor.
    pub second_hop_cost: Cost,
    pub expires_at: Instant,
}

// Two-hop neighbor set (RFC 3626 Section 4.3.2).
#[derive(Debug, Default)]
pub struct TwoHopNeighbors {
    tree: BTreeMap<IpAddr, TwoHopNeighbor>,
}

// ===== impl TwoHopNeighbor =====

impl TwoHopNeighbor {
    fn new(addr: IpAddr) -> TwoHopNeighbor {
        TwoHopNeighbor {
            addr,
            paths: Default::default(),
        }
    }

    // Number of one-hop neighbors that currently reach this node.
    pub fn refcount(&self) -> usize {
        self.paths.len()
    }
}

// ===== impl TwoHopNeighbors =====

impl TwoHopNeighbors {
    // Updates the two-hop neighbor set from a HELLO sent by a one-hop
    // neighbor (RFC 3626 Section 8.2.1).
    //
    // HELLOs from neighbors that aren't symmetric are ignored.
    pub fn link_hello<L>(
        &mut self,
        now: Instant,
        nbr: &Neighbor<L>,
        neighbors: &Neighbors<L>,
        aliases: &Aliases,
        local_addrs: &BTreeSet<IpAddr>,
        hello: &Hello,
        validity: Duration,
    ) -> ChangeSet
    where
        L: LinkQuality,
    {
        let mut changes = ChangeSet::empty();
        if !nbr.is_symmetric() {
            return changes;
        }
        let lq_model = neighbors.lq_model();
        let nbr_cost = nbr.cost();

        // Collect the best advertised cost per two-hop neighbor. The same
        // node may be listed more than once (e.g. once per interface of the
        // neighbor), in which case only a strictly better cost overwrites
        // the previous one.
        let mut advertised = BTreeMap::new();
        let mut withdrawn = BTreeSet::new();
        for (link_code, entry) in hello.iter_neighbors() {
            if !link_code.is_valid() || local_addrs.contains(&entry.addr) {
                continue;
            }
            let addr = aliases.main_address_of(&entry.addr);
            if local_addrs.contains(&addr) {
                continue;
            }

            match link_code.neighbor_type {
                NeighborType::Sym | NeighborType::Mpr => {
                    if neighbors.is_symmetric(&addr) {
                        continue;
                    }
                    let cost = lq_model
                        .deserialize(&entry.lq)
                        .map(|wire| lq_model.edge_cost(&wire))
                        .unwrap_or(Cost::BROKEN);
                    advertised
                        .entry(addr)
                        .and_modify(|best: &mut Cost| {
                            if cost < *best {
                                *best = cost;
                            }
                        })
                        .or_insert(cost);
                }
                NeighborType::NotNeigh => {
                    withdrawn.insert(addr);
                }
            }
        }

        // Add or refresh the advertised two-hop neighbors.
        let expires_at = now + validity;
        for (addr, second_hop_cost) in &advertised {
            let cost = nbr_cost.saturating_add(*second_hop_cost);
            let two_hop = self.tree.entry(*addr).or_insert_with(|| {
                Debug::TwoHopNeighborCreate(addr).log();
                TwoHopNeighbor::new(*addr)
            });
            match two_hop.paths.get_mut(&nbr.main_addr) {
                Some(path) => {
                    if lq_model.is_relevant_change(path.cost, cost) {
                        changes.insert(ChangeSet::NEIGHBORHOOD);
                    }
                    path.cost = cost;
                    path.second_hop_cost = *second_hop_cost;
                    path.expires_at = expires_at;
                }
                None => {
                    let path = TwoHopPath {
                        cost,
                        second_hop_cost: *second_hop_cost,
                        expires_at,
                    };
                    two_hop.paths.insert(nbr.main_addr, path);
                    changes.insert(ChangeSet::NEIGHBORHOOD);
                }
            }
        }

        // Remove the two-hop neighbors that are no longer reachable through
        // this neighbor.
        for addr in withdrawn.difference(&advertised.keys().copied().collect())
        {
            changes |= self.remove_path(addr, &nbr.main_addr);
        }

        changes
    }

    // Removes every two-hop neighbor reached through a one-hop neighbor
    // that was deleted or isn't symmetric anymore, and every two-hop
    // neighbor that became a symmetric one-hop neighbor.
    pub fn prune<L>(&mut self, neighbors: &Neighbors<L>) -> ChangeSet
    where
        L: LinkQuality,
    {
        let mut changes = ChangeSet::empty();
        self.tree.retain(|addr, two_hop| {
            let count = two_hop.paths.len();
            two_hop
                .paths
                .retain(|nbr_addr, _| neighbors.is_symmetric(nbr_addr));
            if neighbors.is_symmetric(addr) {
                two_hop.paths.clear();
            }
            if two_hop.paths.len() != count {
                changes.insert(ChangeSet::NEIGHBORHOOD);
            }
            if two_hop.paths.is_empty() {
                Debug::TwoHopNeighborDelete(addr).log();
                return false;
            }
            true
        });
        changes
    }

    // Recomputes the path costs after the cost of one-hop links changed.
    pub fn update_costs<L>(&mut self, neighbors: &Neighbors<L>)
    where
        L: LinkQuality,
    {
        for two_hop in self.tree.values_mut() {
            for (nbr_addr, path) in two_hop.paths.iter_mut() {
                let nbr_cost = neighbors
                    .get(nbr_addr)
                    .map(|nbr| nbr.cost())
                    .unwrap_or(Cost::BROKEN);
                path.cost = nbr_cost.saturating_add(path.second_hop_cost);
            }
        }
    }

    // Deletes the expired two-hop paths.
    pub fn expire(&mut self, now: Instant) -> ChangeSet {
        let mut changes = ChangeSet::empty();
        self.tree.retain(|addr, two_hop| {
            let count = two_hop.paths.len();
            two_hop.paths.retain(|_, path| path.expires_at > now);
            if two_hop.paths.len() != count {
                changes.insert(ChangeSet::NEIGHBORHOOD);
            }
            if two_hop.paths.is_empty() {
                Debug::TwoHopNeighborDelete(addr).log();
                return false;
            }
            true
        });
        changes
    }

    pub fn get(&self, addr: &IpAddr) -> Option<&TwoHopNeighbor> {
        self.tree.get(addr)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TwoHopNeighbor> + '_ {
        self.tree.values()
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    fn remove_path(&mut self, addr: &IpAddr, nbr_addr: &IpAddr) -> ChangeSet {
        let Some(two_hop) = self.tree.get_mut(addr) else {
            return ChangeSet::empty();
        };
        if two_hop.paths.remove(nbr_addr).is_none() {
            return ChangeSet::empty();
        }
        if two_hop.paths.is_empty() {
            Debug::TwoHopNeighborDelete(addr).log();
            self.tree.remove(addr);
        }
        ChangeSet::NEIGHBORHOOD
    }
}

// ===== unit tests =====

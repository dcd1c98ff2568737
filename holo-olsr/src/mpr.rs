//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use std::time::{Duration, Instant};

use itertools::Itertools;

use crate::config::InstanceCfg;
use crate::debug::Debug;
use crate::instance::ChangeSet;
use crate::lq::LinkQuality;
use crate::neighbor::Neighbors;
use crate::packet::{Hello, NeighborType};
use crate::two_hop::TwoHopNeighbors;

// Result of an MPR selection run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MprSelection {
    // Whether the MPR set differs from the one of the previous run.
    pub changed: bool,
}

// Neighbors that selected this node as their MPR (RFC 3626 Section 4.3.4).
#[derive(Debug, Default)]
pub struct MprSelectors {
    tree: BTreeMap<IpAddr, MprSelector>,
}

#[derive(Clone, Copy, Debug)]
pub struct MprSelector {
    pub addr: IpAddr,
    pub expires_at: Instant,
}

// Input of the selection algorithm for a single one-hop neighbor.
#[derive(Debug)]
struct Candidate {
    willingness: u8,
    // Strict two-hop neighbors reachable through this neighbor.
    covers: BTreeSet<IpAddr>,
}

// Coverage requirement and state of a single two-hop neighbor.
#[derive(Debug, Default)]
struct Target {
    candidates: BTreeSet<IpAddr>,
    required: usize,
    covered: usize,
}

// ===== impl MprSelectors =====

impl MprSelectors {
    // Updates the MPR selector set from a HELLO sent by a symmetric
    // neighbor (RFC 3626 Section 8.4.1).
    pub fn process_hello(
        &mut self,
        now: Instant,
        sender: IpAddr,
        local_addrs: &BTreeSet<IpAddr>,
        hello: &Hello,
        validity: Duration,
    ) -> ChangeSet {
        let mut listed = None;
        for (link_code, entry) in hello.iter_neighbors() {
            if !link_code.is_valid() || !local_addrs.contains(&entry.addr) {
                continue;
            }
            let selected = link_code.neighbor_type == NeighborType::Mpr;
            listed = Some(listed.unwrap_or(false) || selected);
        }

        match listed {
            Some(true) => {
                let expires_at = now + validity;
                if let Some(selector) = self.tree.get_mut(&sender) {
                    selector.expires_at = expires_at;
                    return ChangeSet::empty();
                }
                Debug::MprSelectorAdd(&sender).log();
                let selector = MprSelector {
                    addr: sender,
                    expires_at,
                };
                self.tree.insert(sender, selector);
                ChangeSet::MPR_SELECTORS
            }
            Some(false) => self.remove(&sender),
            None => ChangeSet::empty(),
        }
    }

    // Removes the selectors that aren't symmetric neighbors anymore.
    pub fn prune<L>(&mut self, neighbors: &Neighbors<L>) -> ChangeSet
    where
        L: LinkQuality,
    {
        let mut changes = ChangeSet::empty();
        self.tree.retain(|addr, _| {
            if neighbors.is_symmetric(addr) {
                return true;
            }
            Debug::MprSelectorDelete(addr).log();
            changes.insert(ChangeSet::MPR_SELECTORS);
            false
        });
        changes
    }

    // Deletes the expired selectors.
    pub fn expire(&mut self, now: Instant) -> ChangeSet {
        let mut changes = ChangeSet::empty();
        self.tree.retain(|addr, selector| {
            if selector.expires_at > now {
                return true;
            }
            Debug::MprSelectorDelete(addr).log();
            changes.insert(ChangeSet::MPR_SELECTORS);
            false
        });
        changes
    }

    pub fn contains(&self, addr: &IpAddr) -> bool {
        self.tree.contains_key(addr)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MprSelector> + '_ {
        self.tree.values()
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    fn remove(&mut self, addr: &IpAddr) -> ChangeSet {
        if self.tree.remove(addr).is_none() {
            return ChangeSet::empty();
        }
        Debug::MprSelectorDelete(addr).log();
        ChangeSet::MPR_SELECTORS
    }
}

// ===== global functions =====

// Selects the MPR set among the symmetric one-hop neighbors (RFC 3626
// Section 8.3.1), so that every strict two-hop neighbor is covered by at
// least `coverage` MPRs whenever enough neighbors reach it.
//
// Two-hop neighbors reachable through fewer neighbors than the required
// coverage are covered by all of them.
pub fn select_mprs<L>(
    neighbors: &mut Neighbors<L>,
    two_hops: &TwoHopNeighbors,
    local_addrs: &BTreeSet<IpAddr>,
    coverage: u8,
) -> MprSelection
where
    L: LinkQuality,
{
    let coverage = coverage.max(1) as usize;

    // Neighbors that are allowed to act as MPRs.
    let mut candidates: BTreeMap<IpAddr, Candidate> = neighbors
        .iter_symmetric()
        .filter(|nbr| nbr.willingness != InstanceCfg::WILL_NEVER)
        .map(|nbr| {
            let candidate = Candidate {
                willingness: nbr.willingness,
                covers: Default::default(),
            };
            (nbr.main_addr, candidate)
        })
        .collect();

    // Two-hop neighbors that need to be covered.
    let mut targets: BTreeMap<IpAddr, Target> = BTreeMap::new();
    for two_hop in two_hops.iter() {
        if local_addrs.contains(&two_hop.addr)
            || neighbors.is_symmetric(&two_hop.addr)
        {
            continue;
        }
        for (nbr_addr, path) in &two_hop.paths {
            if path.cost.is_broken() {
                continue;
            }
            let Some(candidate) = candidates.get_mut(nbr_addr) else {
                continue;
            };
            candidate.covers.insert(two_hop.addr);
            targets
                .entry(two_hop.addr)
                .or_default()
                .candidates
                .insert(*nbr_addr);
        }
    }
    for (addr, target) in targets.iter_mut() {
        target.required = coverage.min(target.candidates.len());
        if target.required < coverage {
            Debug::MprCoverageShortfall(addr, target.required, coverage).log();
        }
    }

    let mut selected = BTreeSet::new();

    // Neighbors that are always willing to forward are always selected.
    let always = candidates
        .iter()
        .filter(|(_, candidate)| {
            candidate.willingness == InstanceCfg::WILL_ALWAYS
        })
        .map(|(addr, _)| *addr)
        .collect::<Vec<_>>();
    for addr in always {
        select(addr, &candidates, &mut selected, &mut targets);
    }

    // Neighbors providing the only paths to some two-hop neighbors.
    let sole = targets
        .values()
        .filter(|target| target.candidates.len() <= coverage)
        .flat_map(|target| target.candidates.iter().copied())
        .collect::<BTreeSet<_>>();
    for addr in sole {
        select(addr, &candidates, &mut selected, &mut targets);
    }

    // Greedily add the neighbors that cover the most two-hop neighbors
    // that still lack coverage.
    loop {
        let best = candidates
            .iter()
            .filter(|(addr, _)| !selected.contains(*addr))
            .map(|(addr, candidate)| {
                let reachability = candidate
                    .covers
                    .iter()
                    .filter(|y| {
                        targets.get(*y).is_some_and(|target| {
                            target.covered < target.required
                        })
                    })
                    .count();
                (addr, candidate, reachability)
            })
            .filter(|(_, _, reachability)| *reachability > 0)
            .max_by_key(|(addr, candidate, reachability)| {
                (
                    candidate.willingness,
                    *reachability,
                    candidate.covers.len(),
                    Reverse(**addr),
                )
            })
            .map(|(addr, _, _)| *addr);
        let Some(addr) = best else {
            break;
        };
        select(addr, &candidates, &mut selected, &mut targets);
    }

    // Remove the MPRs that aren't needed to keep the coverage, preferring
    // to remove the least willing ones.
    let removal_order = selected
        .iter()
        .filter_map(|addr| {
            candidates.get(addr).map(|c| (c.willingness, *addr))
        })
        .sorted()
        .collect::<Vec<_>>();
    for (willingness, addr) in removal_order {
        if willingness == InstanceCfg::WILL_ALWAYS {
            continue;
        }
        let Some(candidate) = candidates.get(&addr) else {
            continue;
        };
        let redundant = candidate.covers.iter().all(|y| {
            targets
                .get(y)
                .is_none_or(|target| target.covered > target.required)
        });
        if !redundant {
            continue;
        }
        for y in &candidate.covers {
            if let Some(target) = targets.get_mut(y) {
                target.covered -= 1;
            }
        }
        selected.remove(&addr);
    }

    // Update the MPR flags.
    let mut changed = false;
    for nbr in neighbors.iter_mut() {
        nbr.was_mpr = nbr.is_mpr;
        nbr.is_mpr = selected.contains(&nbr.main_addr);
        if nbr.is_mpr != nbr.was_mpr {
            Debug::MprChange(&nbr.main_addr, nbr.is_mpr).log();
            changed = true;
        }
    }

    MprSelection { changed }
}

// Marks a neighbor as selected and accounts for the two-hop neighbors it
// covers.
fn select(
    addr: IpAddr,
    candidates: &BTreeMap<IpAddr, Candidate>,
    selected: &mut BTreeSet<IpAddr>,
    targets: &mut BTreeMap<IpAddr, Target>,
) {
    if !selected.insert(addr) {
        return;
    }
    let Some(candidate) = candidates.get(&addr) else {
        return;
    };
    for y in &candidate.covers {
        if let Some(target) = targets.get_mut(y) {
            target.covered += 1;
        }
    }
}

// Returns the coverage of every two-hop neighbor reachable through a usable
// symmetric neighbor, counting the MPRs that reach it.
pub fn mpr_coverage<L>(
    neighbors: &Neighbors<L>,
    two_hops: &TwoHopNeighbors,
) -> BTreeMap<IpAddr, (usize, usize)>
where
    L: LinkQuality,
{
    let mut result = BTreeMap::new();
    for two_hop in two_hops.iter() {
        if neighbors.is_symmetric(&two_hop.addr) {
            continue;
        }
        let mut reachable = 0;
        let mut covered = 0;
        for (nbr_addr, path) in &two_hop.paths {
            let Some(nbr) = neighbors.get(nbr_addr) else {
                continue;
            };
            if !nbr.is_symmetric()
                || nbr.willingness == InstanceCfg::WILL_NEVER
                || path.cost.is_broken()
            {
                continue;
            }
            reachable += 1;
            if nbr.is_mpr {
                covered += 1;
            }
        }
        if reachable > 0 {
            result.insert(two_hop.addr, (covered, reachable));
        }
    }
    result
}

// ===== unit tests =====

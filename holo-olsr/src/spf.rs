//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::lq::{Cost, LinkQuality};
use crate::neighbor::Neighbors;
use crate::topology::Topology;
use crate::two_hop::TwoHopNeighbors;

// Node of the shortest-path tree.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct SpfVertex {
    pub addr: IpAddr,
    pub cost: Cost,
    pub hops: u16,
    // First hop towards this node, inherited from the one-hop neighbor the
    // path starts with.
    pub nexthop: IpAddr,
    pub ifname: String,
}

pub type ShortestPathTree = BTreeMap<IpAddr, SpfVertex>;

// Candidate list key. Candidates with the same cost are ordered by the
// number of hops and then by address.
type CandKey = (Cost, u16, IpAddr);

// ===== global functions =====

// Computes the shortest-path tree rooted at this node.
//
// The graph is made of the links to the symmetric one-hop neighbors, the
// links from these neighbors to the two-hop neighbors they advertise, and
// the topology edges whose reverse edge is also known. Broken links and
// edges are skipped without being removed.
pub fn compute_spt<L>(
    local_addrs: &BTreeSet<IpAddr>,
    neighbors: &Neighbors<L>,
    two_hops: &TwoHopNeighbors,
    topology: &Topology,
) -> ShortestPathTree
where
    L: LinkQuality,
{
    let mut spt = BTreeMap::new();
    let mut cand_list: BTreeMap<CandKey, SpfVertex> = BTreeMap::new();
    let mut cand_index: HashMap<IpAddr, CandKey> = HashMap::new();

    // Start with the one-hop neighbors.
    for nbr in neighbors.iter_symmetric() {
        let Some(link) = nbr.best_link() else {
            continue;
        };
        if !link.is_symmetric()
            || link.cost.is_broken()
            || local_addrs.contains(&nbr.main_addr)
        {
            continue;
        }
        let vertex = SpfVertex {
            addr: nbr.main_addr,
            cost: link.cost,
            hops: 1,
            nexthop: link.key.remote_addr,
            ifname: link.ifname.clone(),
        };
        cand_update(&mut cand_list, &mut cand_index, vertex);
    }

    // Main SPF loop.
    while let Some(((_, _, addr), vertex)) = cand_list.pop_first() {
        cand_index.remove(&addr);

        // Collect the edges leaving this vertex.
        let mut edges = vec![];
        if neighbors.is_symmetric(&addr) {
            for two_hop in two_hops.iter() {
                if let Some(path) = two_hop.paths.get(&addr) {
                    edges.push((two_hop.addr, path.second_hop_cost));
                }
            }
        }
        if let Some(node) = topology.get(&addr) {
            for edge in node.edges.values() {
                if topology.is_edge_usable(&addr, &edge.dst) {
                    edges.push((edge.dst, edge.cost));
                }
            }
        }

        for (dst, edge_cost) in edges {
            if edge_cost.is_broken()
                || local_addrs.contains(&dst)
                || spt.contains_key(&dst)
            {
                continue;
            }
            let cost = vertex.cost.saturating_add(edge_cost);
            let candidate = SpfVertex {
                addr: dst,
                cost,
                hops: vertex.hops.saturating_add(1),
                nexthop: vertex.nexthop,
                ifname: vertex.ifname.clone(),
            };
            cand_update(&mut cand_list, &mut cand_index, candidate);
        }

        // Add vertex to SPT.
        spt.insert(addr, vertex);
    }

    spt
}

// Adds a vertex to the candidate list, replacing the existing candidate for
// the same node only when the new path is strictly better.
fn cand_update(
    cand_list: &mut BTreeMap<CandKey, SpfVertex>,
    cand_index: &mut HashMap<IpAddr, CandKey>,
    vertex: SpfVertex,
) {
    let key = (vertex.cost, vertex.hops, vertex.addr);
    if let Some(cand_key) = cand_index.get(&vertex.addr).copied() {
        if (cand_key.0, cand_key.1) <= (key.0, key.1) {
            // Ignore worse or equivalent path.
            return;
        }
        // Remove vertex since its key has changed.
        cand_list.remove(&cand_key);
    }
    cand_index.insert(vertex.addr, key);
    cand_list.insert(key, vertex);
}

// ===== unit tests =====

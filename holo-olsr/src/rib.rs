//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, btree_map};
use std::net::IpAddr;

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

use crate::alias::Aliases;
use crate::debug::Debug;
use crate::lq::Cost;
use crate::spf::ShortestPathTree;
use crate::topology::{PrefixOrigin, RoutePath, Topology};

// Routing information base.
#[derive(Debug, Default)]
pub struct Rib {
    entries: BTreeMap<IpNetwork, RouteEntry>,
    // Version of the last route computation run.
    version: u64,
}

// Route installed for a destination prefix.
//
// The route is a copy of the forwarding attributes of the selected
// `RoutePath`, which is still owned by the topology node of its
// originator. `owner` identifies that path.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct RouteEntry {
    pub prefix: IpNetwork,
    pub owner: (IpAddr, IpNetwork),
    pub origin: PrefixOrigin,
    pub nexthop: IpAddr,
    pub ifname: String,
    pub cost: Cost,
    pub hops: u16,
}

// Change to the routing information base, to be propagated to the
// forwarding plane.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum RibChange {
    Add(RouteEntry),
    Change { old: RouteEntry, new: RouteEntry },
    Delete(RouteEntry),
}

// ===== impl Rib =====

impl Rib {
    // Refreshes the routing paths of every node reached by the last route
    // computation, and deletes the paths that weren't refreshed.
    //
    // Every reached node gets paths to its main address, to the aliases it
    // declared in MID messages and to the prefixes it advertised.
    pub fn update_paths(
        &mut self,
        topology: &mut Topology,
        aliases: &Aliases,
        spt: &ShortestPathTree,
    ) {
        self.version += 1;
        let version = self.version;

        for vertex in spt.values() {
            let node = topology.get_or_create(vertex.addr);
            let mut prefixes =
                vec![(IpNetwork::from(vertex.addr), PrefixOrigin::Main)];
            for alias in aliases.aliases_of(&vertex.addr) {
                prefixes.push((IpNetwork::from(alias), PrefixOrigin::Alias));
            }
            prefixes.extend(
                node.prefixes().map(|prefix| (*prefix, PrefixOrigin::Hna)),
            );

            for (prefix, origin) in prefixes {
                let path = RoutePath {
                    prefix,
                    originator: vertex.addr,
                    origin,
                    nexthop: vertex.nexthop,
                    ifname: vertex.ifname.clone(),
                    hops: vertex.hops,
                    cost: vertex.cost,
                    version,
                };
                match node.paths.entry(prefix) {
                    // Keep the most preferred origin of a prefix announced
                    // more than once by the same node.
                    btree_map::Entry::Occupied(o)
                        if o.get().version == version
                            && o.get().origin <= origin => {}
                    btree_map::Entry::Occupied(mut o) => {
                        o.insert(path);
                    }
                    btree_map::Entry::Vacant(v) => {
                        v.insert(path);
                    }
                }
            }
        }

        // Sweep the paths of the nodes that became unreachable.
        for node in topology.iter_mut() {
            node.paths.retain(|_, path| path.version == version);
        }
        topology.gc();
    }

    // Selects the best path of every prefix, updates the routing table and
    // returns the changes.
    //
    // Paths compare by cost, then hop count, then origin and finally
    // originator address. For the default route, the cost of the paths
    // other than the installed one is scaled up by `default_hysteresis`.
    pub fn compute(
        &mut self,
        topology: &Topology,
        local_addrs: &BTreeSet<IpAddr>,
        local_prefixes: &[IpNetwork],
        default_hysteresis: f32,
    ) -> Vec<RibChange> {
        let mut best: BTreeMap<IpNetwork, &RoutePath> = BTreeMap::new();
        for path in topology.iter().flat_map(|node| node.paths.values()) {
            if is_local(&path.prefix, local_addrs, local_prefixes) {
                continue;
            }
            let installed = self.entries.get(&path.prefix);
            match best.entry(path.prefix) {
                btree_map::Entry::Occupied(mut o) => {
                    let cmp = path_compare(
                        path,
                        o.get(),
                        installed,
                        default_hysteresis,
                    );
                    if cmp == Ordering::Less {
                        o.insert(path);
                    }
                }
                btree_map::Entry::Vacant(v) => {
                    v.insert(path);
                }
            }
        }

        let mut changes = vec![];
        let mut old_entries = std::mem::take(&mut self.entries);
        for (prefix, path) in best {
            let entry = RouteEntry::from(path);
            match old_entries.remove(&prefix) {
                Some(old) if old == entry => (),
                Some(old) => {
                    Debug::RouteChange(&entry).log();
                    changes.push(RibChange::Change {
                        old,
                        new: entry.clone(),
                    });
                }
                None => {
                    Debug::RouteAdd(&entry).log();
                    changes.push(RibChange::Add(entry.clone()));
                }
            }
            self.entries.insert(prefix, entry);
        }

        // Uninstall routes that are no longer available.
        for (_, old) in old_entries {
            Debug::RouteDelete(&old).log();
            changes.push(RibChange::Delete(old));
        }

        changes
    }

    pub fn get(&self, prefix: &IpNetwork) -> Option<&RouteEntry> {
        self.entries.get(prefix)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteEntry> + '_ {
        self.entries.values()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ===== impl RouteEntry =====

impl From<&RoutePath> for RouteEntry {
    fn from(path: &RoutePath) -> RouteEntry {
        RouteEntry {
            prefix: path.prefix,
            owner: (path.originator, path.prefix),
            origin: path.origin,
            nexthop: path.nexthop,
            ifname: path.ifname.clone(),
            cost: path.cost,
            hops: path.hops,
        }
    }
}

// ===== helper functions =====

fn is_local(
    prefix: &IpNetwork,
    local_addrs: &BTreeSet<IpAddr>,
    local_prefixes: &[IpNetwork],
) -> bool {
    if local_prefixes.contains(prefix) {
        return true;
    }
    prefix.prefix() == max_prefix_len(prefix)
        && local_addrs.contains(&prefix.ip())
}

fn max_prefix_len(prefix: &IpNetwork) -> u8 {
    match prefix {
        IpNetwork::V4(_) => 32,
        IpNetwork::V6(_) => 128,
    }
}

fn path_compare(
    a: &RoutePath,
    b: &RoutePath,
    installed: Option<&RouteEntry>,
    default_hysteresis: f32,
) -> Ordering {
    let cost = |path: &RoutePath| {
        let is_installed = installed.is_some_and(|entry| {
            entry.owner == (path.originator, path.prefix)
        });
        if path.prefix.prefix() == 0 && !is_installed {
            path.cost.scale(default_hysteresis)
        } else {
            path.cost
        }
    };

    cost(a)
        .cmp(&cost(b))
        .then(a.hops.cmp(&b.hops))
        .then(a.origin.cmp(&b.origin))
        .then(a.originator.cmp(&b.originator))
}

// ===== unit tests =====

//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::config::HysteresisCfg;
use crate::debug::Debug;
use crate::instance::ChangeSet;
use crate::link::{Link, LinkKey, LinkStatus};
use crate::lq::{Cost, LinkQuality};
use crate::packet::Hello;
use crate::seqno::SeqNo;

#[derive(Debug)]
pub struct Neighbor<L: LinkQuality> {
    pub main_addr: IpAddr,
    pub status: NeighborStatus,
    pub willingness: u8,
    pub is_mpr: bool,
    pub was_mpr: bool,
    pub links: BTreeMap<LinkKey, Link<L>>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum NeighborStatus {
    NotSymmetric,
    Symmetric,
}

// Link set and neighbor set (RFC 3626 Sections 4.2 and 4.3).
//
// Neighbors own their links. A secondary index maps every link to the
// neighbor currently owning it.
#[derive(Debug)]
pub struct Neighbors<L: LinkQuality> {
    tree: BTreeMap<IpAddr, Neighbor<L>>,
    link_index: HashMap<LinkKey, IpAddr>,
    lq_model: L,
    hysteresis: HysteresisCfg,
    neighb_hold_time: Duration,
}

// ===== impl Neighbor =====

impl<L> Neighbor<L>
where
    L: LinkQuality,
{
    fn new(main_addr: IpAddr, willingness: u8) -> Neighbor<L> {
        Debug::NeighborCreate(&main_addr).log();

        Neighbor {
            main_addr,
            status: NeighborStatus::NotSymmetric,
            willingness,
            is_mpr: false,
            was_mpr: false,
            links: Default::default(),
        }
    }

    pub fn is_symmetric(&self) -> bool {
        self.status == NeighborStatus::Symmetric
    }

    // Returns the best link to this neighbor: symmetric links first, then
    // the lowest cost, then the lowest address pair.
    pub fn best_link(&self) -> Option<&Link<L>> {
        self.links.values().min_by_key(|link| {
            (!link.is_symmetric(), link.cost, link.key)
        })
    }

    // Returns the cost of the best symmetric link to this neighbor.
    pub fn cost(&self) -> Cost {
        self.best_link()
            .filter(|link| link.is_symmetric())
            .map(|link| link.cost)
            .unwrap_or(Cost::BROKEN)
    }

    // Refreshes the cached status of every link and of the neighbor itself,
    // returning whether anything changed.
    fn update_status(&mut self, now: Instant) -> bool {
        let mut changed = false;
        for link in self.links.values_mut() {
            let status = link.compute_status(now);
            if status != link.status {
                Debug::LinkStatusChange(&link.key, link.status, status).log();
                link.status = status;
                changed = true;
            }
        }

        let status = if self.links.values().any(|link| link.is_symmetric()) {
            NeighborStatus::Symmetric
        } else {
            NeighborStatus::NotSymmetric
        };
        if status != self.status {
            Debug::NeighborStatusChange(&self.main_addr, self.status, status)
                .log();
            self.status = status;
            changed = true;
        }

        changed
    }
}

// ===== impl NeighborStatus =====

impl std::fmt::Display for NeighborStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NeighborStatus::NotSymmetric => write!(f, "not-symmetric"),
            NeighborStatus::Symmetric => write!(f, "symmetric"),
        }
    }
}

// ===== impl Neighbors =====

impl<L> Neighbors<L>
where
    L: LinkQuality,
{
    pub fn new(
        lq_model: L,
        hysteresis: HysteresisCfg,
        neighb_hold_time: Duration,
    ) -> Neighbors<L> {
        Neighbors {
            tree: Default::default(),
            link_index: Default::default(),
            lq_model,
            hysteresis,
            neighb_hold_time,
        }
    }

    // Creates or updates the link over which a HELLO was received, and
    // updates the neighbor that sent it.
    //
    // Returns the resulting neighborhood changes.
    pub fn observe_hello(
        &mut self,
        now: Instant,
        ifname: &str,
        local_addr: IpAddr,
        remote_addr: IpAddr,
        remote_main_addr: IpAddr,
        validity: Duration,
        hello_interval: Duration,
        hello: &Hello,
    ) -> ChangeSet {
        let mut changes = ChangeSet::empty();
        let key = LinkKey {
            local_addr,
            remote_addr,
        };

        // Move the link if the neighbor's main address changed.
        let mut link = None;
        if let Some(owner) = self.link_index.get(&key).copied()
            && owner != remote_main_addr
        {
            link = self.unlink(&key, owner, &mut changes);
        }

        // Find or create neighbor.
        let nbr = self.tree.entry(remote_main_addr).or_insert_with(|| {
            changes.insert(ChangeSet::NEIGHBORHOOD);
            Neighbor::new(remote_main_addr, hello.willingness)
        });
        if nbr.willingness != hello.willingness {
            Debug::NeighborWillingnessChange(
                &nbr.main_addr,
                nbr.willingness,
                hello.willingness,
            )
            .log();
            nbr.willingness = hello.willingness;
            changes.insert(ChangeSet::NEIGHBORHOOD);
        }

        // Find or create link.
        let link = match link {
            Some(link) => nbr.links.entry(key).or_insert(link),
            None => nbr.links.entry(key).or_insert_with(|| {
                Debug::LinkCreate(&key, ifname).log();
                changes.insert(ChangeSet::NEIGHBORHOOD);
                Link::new(
                    key,
                    ifname,
                    now,
                    validity,
                    &self.lq_model,
                    &self.hysteresis,
                )
            }),
        };
        self.link_index.insert(key, remote_main_addr);

        // Look up how the neighbor sees us.
        let mut listed = None;
        let mut remote_lq = None;
        for (link_code, entry) in hello.iter_neighbors() {
            if entry.addr != local_addr || !link_code.is_valid() {
                continue;
            }
            listed = Some(link_code.link_type);
            remote_lq = self.lq_model.deserialize(&entry.lq);
        }

        // Update hysteresis, link sensing and link quality.
        link.hysteresis_update(
            now,
            &self.hysteresis,
            self.neighb_hold_time,
            true,
        );
        link.sense(now, validity, self.neighb_hold_time, listed);
        if let Some(remote_lq) = &remote_lq {
            self.lq_model.merge_foreign(&mut link.lq, remote_lq);
        }
        if link.update_cost(&self.lq_model) {
            Debug::LinkCostChange(&link.key, link.cost).log();
            changes.insert(ChangeSet::NEIGHBORHOOD);
        }

        // Track the next expected HELLO, tolerating jitter.
        link.hello_interval = hello_interval;
        link.hello_deadline = Some(now + hello_interval + hello_interval / 2);

        if nbr.update_status(now) {
            changes.insert(ChangeSet::NEIGHBORHOOD);
        }

        changes
    }

    // Accounts for a packet received over a known link, including the
    // packets skipped according to the packet sequence number.
    pub fn observe_packet(
        &mut self,
        local_addr: IpAddr,
        remote_addr: IpAddr,
        seqno: SeqNo,
    ) -> ChangeSet {
        let lq_model = self.lq_model.clone();
        let key = LinkKey {
            local_addr,
            remote_addr,
        };
        let Some(link) = self.get_link_mut(&key) else {
            return ChangeSet::empty();
        };

        // Packets skipped according to the sequence number, except the
        // missed HELLOs that were already accounted. The lost packets can't
        // exceed the size of any loss window.
        if let Some(last_seqno) = link.last_pkt_seqno
            && seqno.is_newer_than(&last_seqno)
        {
            let lost = last_seqno
                .gap_to(&seqno)
                .saturating_sub(link.missed_hellos)
                .min(64);
            for _ in 0..lost {
                lq_model.account_packet(&mut link.lq, false);
            }
        }
        link.last_pkt_seqno = Some(seqno);
        link.missed_hellos = 0;
        lq_model.account_packet(&mut link.lq, true);

        if link.update_cost(&lq_model) {
            Debug::LinkCostChange(&link.key, link.cost).log();
            return ChangeSet::NEIGHBORHOOD;
        }
        ChangeSet::empty()
    }

    // Returns the status of the given link.
    pub fn link_status(&self, key: &LinkKey) -> Option<LinkStatus> {
        self.get_link(key).map(|link| link.status)
    }

    // Returns the best link to the given neighbor.
    pub fn best_link_to(&self, main_addr: &IpAddr) -> Option<&Link<L>> {
        self.tree.get(main_addr).and_then(|nbr| nbr.best_link())
    }

    // Ages the link set: accounts missed HELLOs, refreshes link and neighbor
    // status, and deletes expired links and the neighbors left without
    // links.
    pub fn expire(&mut self, now: Instant) -> ChangeSet {
        let mut changes = ChangeSet::empty();

        for nbr in self.tree.values_mut() {
            for link in nbr.links.values_mut() {
                // Account missed HELLOs.
                while let Some(deadline) = link.hello_deadline
                    && deadline <= now
                    && !link.hello_interval.is_zero()
                {
                    Debug::LinkHelloMissed(&link.key).log();
                    link.hysteresis_update(
                        now,
                        &self.hysteresis,
                        self.neighb_hold_time,
                        false,
                    );
                    self.lq_model.account_packet(&mut link.lq, false);
                    link.missed_hellos = link.missed_hellos.saturating_add(1);
                    link.hello_deadline = Some(deadline + link.hello_interval);
                }
                if link.update_cost(&self.lq_model) {
                    Debug::LinkCostChange(&link.key, link.cost).log();
                    changes.insert(ChangeSet::NEIGHBORHOOD);
                }
            }

            // Delete expired links.
            nbr.links.retain(|key, link| {
                if link.expires_at > now {
                    return true;
                }
                Debug::LinkDelete(key).log();
                self.link_index.remove(key);
                changes.insert(ChangeSet::NEIGHBORHOOD);
                false
            });

            if nbr.update_status(now) {
                changes.insert(ChangeSet::NEIGHBORHOOD);
            }
        }

        // Delete neighbors without links.
        self.tree.retain(|addr, nbr| {
            if !nbr.links.is_empty() {
                return true;
            }
            Debug::NeighborDelete(addr).log();
            changes.insert(ChangeSet::NEIGHBORHOOD);
            false
        });

        changes
    }

    // Removes every link established over the given interface.
    pub fn remove_interface(
        &mut self,
        now: Instant,
        ifname: &str,
    ) -> ChangeSet {
        let mut changes = ChangeSet::empty();
        for nbr in self.tree.values_mut() {
            nbr.links.retain(|key, link| {
                if link.ifname != ifname {
                    return true;
                }
                Debug::LinkDelete(key).log();
                self.link_index.remove(key);
                changes.insert(ChangeSet::NEIGHBORHOOD);
                false
            });
            nbr.update_status(now);
        }
        self.tree.retain(|addr, nbr| {
            if !nbr.links.is_empty() {
                return true;
            }
            Debug::NeighborDelete(addr).log();
            false
        });
        changes
    }

    pub fn get(&self, main_addr: &IpAddr) -> Option<&Neighbor<L>> {
        self.tree.get(main_addr)
    }

    // Returns the neighbor owning the given link.
    pub fn get_by_link(&self, key: &LinkKey) -> Option<&Neighbor<L>> {
        let main_addr = self.link_index.get(key)?;
        self.tree.get(main_addr)
    }

    pub fn get_link(&self, key: &LinkKey) -> Option<&Link<L>> {
        let main_addr = self.link_index.get(key)?;
        self.tree.get(main_addr)?.links.get(key)
    }

    fn get_link_mut(&mut self, key: &LinkKey) -> Option<&mut Link<L>> {
        let main_addr = self.link_index.get(key)?;
        self.tree.get_mut(main_addr)?.links.get_mut(key)
    }

    pub fn is_symmetric(&self, main_addr: &IpAddr) -> bool {
        self.tree
            .get(main_addr)
            .is_some_and(|nbr| nbr.is_symmetric())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Neighbor<L>> + '_ {
        self.tree.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Neighbor<L>> + '_ {
        self.tree.values_mut()
    }

    pub fn iter_symmetric(&self) -> impl Iterator<Item = &Neighbor<L>> + '_ {
        self.tree.values().filter(|nbr| nbr.is_symmetric())
    }

    pub fn iter_links(&self) -> impl Iterator<Item = &Link<L>> + '_ {
        self.tree.values().flat_map(|nbr| nbr.links.values())
    }

    pub fn lq_model(&self) -> &L {
        &self.lq_model
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    // Detaches a link from its current owner, deleting the owner if it's
    // left without links.
    fn unlink(
        &mut self,
        key: &LinkKey,
        owner: IpAddr,
        changes: &mut ChangeSet,
    ) -> Option<Link<L>> {
        let nbr = self.tree.get_mut(&owner)?;
        let link = nbr.links.remove(key);
        self.link_index.remove(key);
        if nbr.links.is_empty() {
            Debug::NeighborDelete(&owner).log();
            self.tree.remove(&owner);
        }
        changes.insert(ChangeSet::NEIGHBORHOOD);
        link
    }
}

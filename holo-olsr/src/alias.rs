//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use crate::debug::Debug;
use crate::instance::ChangeSet;

// Interface association set (RFC 3626 Section 4.1), learned from MID
// messages.
#[derive(Debug, Default)]
pub struct Aliases {
    tree: BTreeMap<IpAddr, AliasRecord>,
}

#[derive(Clone, Copy, Debug)]
pub struct AliasRecord {
    pub main_addr: IpAddr,
    pub expires_at: Instant,
}

// ===== impl Aliases =====

impl Aliases {
    // Replaces the aliases declared by a node with the contents of its last
    // MID message (RFC 3626 Section 5.4).
    pub fn update_from_mid(
        &mut self,
        now: Instant,
        originator: IpAddr,
        addrs: &[IpAddr],
        validity: Duration,
    ) -> ChangeSet {
        let mut changes = ChangeSet::empty();
        let expires_at = now + validity;

        // Remove aliases that are no longer declared.
        self.tree.retain(|alias, record| {
            if record.main_addr != originator || addrs.contains(alias) {
                return true;
            }
            Debug::AliasDelete(alias, &record.main_addr).log();
            changes.insert(ChangeSet::PREFIXES);
            false
        });

        for alias in addrs.iter().filter(|alias| **alias != originator) {
            match self.tree.get_mut(alias) {
                Some(record) if record.main_addr == originator => {
                    record.expires_at = expires_at;
                }
                _ => {
                    Debug::AliasCreate(alias, &originator).log();
                    let record = AliasRecord {
                        main_addr: originator,
                        expires_at,
                    };
                    self.tree.insert(*alias, record);
                    changes.insert(ChangeSet::PREFIXES);
                }
            }
        }

        changes
    }

    // Resolves any interface address to the main address of its node.
    // Unknown addresses are main addresses themselves.
    pub fn main_address_of(&self, addr: &IpAddr) -> IpAddr {
        self.tree
            .get(addr)
            .map(|record| record.main_addr)
            .unwrap_or(*addr)
    }

    // Returns the aliases declared by the given node.
    pub fn aliases_of<'a>(
        &'a self,
        main_addr: &'a IpAddr,
    ) -> impl Iterator<Item = IpAddr> + 'a {
        self.tree
            .iter()
            .filter(move |(_, record)| record.main_addr == *main_addr)
            .map(|(alias, _)| *alias)
    }

    // Deletes the expired aliases.
    pub fn expire(&mut self, now: Instant) -> ChangeSet {
        let mut changes = ChangeSet::empty();
        self.tree.retain(|alias, record| {
            if record.expires_at > now {
                return true;
            }
            Debug::AliasDelete(alias, &record.main_addr).log();
            changes.insert(ChangeSet::PREFIXES);
            false
        });
        changes
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

// ===== unit tests =====

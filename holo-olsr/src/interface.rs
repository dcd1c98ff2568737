//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use generational_arena::{Arena, Index};

use crate::config::InterfaceCfg;
use crate::debug::Debug;
use crate::packet::{AddressFamily, Message, Packet};
use crate::seqno::SeqNo;

pub type InterfaceIndex = Index;

#[derive(Debug)]
pub struct Interface {
    pub name: String,
    pub config: InterfaceCfg,
    pub state: InterfaceState,
}

#[derive(Debug, Default)]
pub struct InterfaceState {
    // Interface protocol status.
    pub active: bool,
    // Packet sequence number, maintained per interface.
    pub pkt_seqno: SeqNo,
    // Messages waiting to be sent.
    pub out_queue: Vec<Message>,
    // Packet statistics.
    pub statistics: PacketStatistics,
}

// Inbound and outbound statistic counters.
#[derive(Debug, Default)]
pub struct PacketStatistics {
    pub discontinuity_time: Option<DateTime<Utc>>,
    pub packets_rcvd: u32,
    pub bad_packets_rcvd: u32,
    pub packets_sent: u32,
}

#[derive(Debug, Default)]
pub struct Interfaces {
    arena: Arena<Interface>,
    name_tree: BTreeMap<String, InterfaceIndex>,
}

// ===== impl Interface =====

impl Interface {
    fn new(config: InterfaceCfg) -> Interface {
        Debug::InterfaceCreate(&config.name).log();

        Interface {
            name: config.name.clone(),
            config,
            state: InterfaceState {
                active: true,
                ..Default::default()
            },
        }
    }

    pub fn address(&self) -> IpAddr {
        self.config.address
    }

    // Returns the largest packet that fits the interface MTU once the IP
    // and UDP headers are added.
    pub fn max_packet_size(&self) -> usize {
        let overhead = match AddressFamily::of(&self.config.address) {
            AddressFamily::Ipv4 => 20 + 8,
            AddressFamily::Ipv6 => 40 + 8,
        };
        (self.config.mtu as usize).saturating_sub(overhead)
    }

    // Packs the queued messages into packets that fit the interface MTU.
    //
    // Messages larger than the maximum packet size are sent in a packet of
    // their own.
    pub(crate) fn flush(&mut self) -> Vec<Packet> {
        let max_size = self.max_packet_size();
        let mut packets = vec![];
        let mut messages = vec![];
        let mut size = Packet::HDR_LEN;
        for msg in std::mem::take(&mut self.state.out_queue) {
            let msg_len = msg.len();
            if !messages.is_empty() && size + msg_len > max_size {
                packets.push(self.packet(std::mem::take(&mut messages)));
                size = Packet::HDR_LEN;
            }
            size += msg_len;
            messages.push(msg);
        }
        if !messages.is_empty() {
            packets.push(self.packet(messages));
        }

        self.state.statistics.packets_sent += packets.len() as u32;
        packets
    }

    fn packet(&mut self, messages: Vec<Message>) -> Packet {
        Packet {
            seqno: self.state.pkt_seqno.fetch_increment(),
            messages,
        }
    }
}

// ===== impl PacketStatistics =====

impl PacketStatistics {
    pub(crate) fn update_discontinuity_time(&mut self) {
        self.discontinuity_time = Some(Utc::now());
    }
}

// ===== impl Interfaces =====

impl Interfaces {
    pub(crate) fn insert(&mut self, config: InterfaceCfg) -> InterfaceIndex {
        let name = config.name.clone();
        let iface = Interface::new(config);
        let iface_idx = self.arena.insert(iface);
        self.name_tree.insert(name, iface_idx);
        iface_idx
    }

    pub fn get_by_name(&self, ifname: &str) -> Option<&Interface> {
        self.name_tree
            .get(ifname)
            .copied()
            .and_then(|iface_idx| self.arena.get(iface_idx))
    }

    pub fn get_mut_by_name(&mut self, ifname: &str) -> Option<&mut Interface> {
        self.name_tree
            .get(ifname)
            .copied()
            .and_then(|iface_idx| self.arena.get_mut(iface_idx))
    }

    // Returns the addresses of all interfaces.
    pub fn local_addresses(&self) -> BTreeSet<IpAddr> {
        self.iter().map(|iface| iface.address()).collect()
    }

    // Returns an iterator visiting all interfaces, ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = &Interface> + '_ {
        self.name_tree
            .values()
            .filter_map(|iface_idx| self.arena.get(*iface_idx))
    }

    // Returns an iterator visiting all interfaces with mutable references.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Interface> + '_ {
        self.arena.iter_mut().map(|(_, iface)| iface)
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }
}

//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::time::Instant;

use bitflags::bitflags;

use crate::alias::Aliases;
use crate::config::{ConfigError, InstanceCfg};
use crate::debug::Debug;
use crate::duplicate::DuplicateSet;
use crate::error::Error;
use crate::interface::Interfaces;
use crate::lq::LinkQuality;
use crate::mpr::{self, MprSelectors};
use crate::neighbor::Neighbors;
use crate::packet::{DecodeCxt, DecodeResult, MessageType, Packet};
use crate::rib::{Rib, RibChange};
use crate::seqno::SeqNo;
use crate::southbound::RouteSink;
use crate::spf::{self, ShortestPathTree};
use crate::timer::{self, Timers};
use crate::topology::Topology;
use crate::two_hop::TwoHopNeighbors;
use crate::{events, output};

pub struct Instance<L: LinkQuality> {
    // Instance configuration data.
    pub config: InstanceCfg,
    // Instance state data.
    pub state: InstanceState<L>,
    // Instance interfaces.
    pub interfaces: Interfaces,
    // Consumer of the routing table changes.
    sink: Option<Box<dyn RouteSink>>,
}

#[derive(Debug)]
pub struct InstanceState<L: LinkQuality> {
    // Main address of this node.
    pub main_addr: IpAddr,
    // Addresses of all local interfaces.
    pub local_addrs: BTreeSet<IpAddr>,
    // Link set and one-hop neighbors.
    pub neighbors: Neighbors<L>,
    // Two-hop neighbors.
    pub two_hops: TwoHopNeighbors,
    // Neighbors that selected this node as MPR.
    pub mpr_selectors: MprSelectors,
    // Interface aliases learned from MID messages.
    pub aliases: Aliases,
    // Link-state database.
    pub topology: Topology,
    // Duplicate set.
    pub duplicates: DuplicateSet,
    // Result of the last route computation.
    pub spt: ShortestPathTree,
    // Routing table.
    pub rib: Rib,
    // Message emission timers.
    pub timers: Timers<TimerEvent>,
    // Message sequence number, shared by all message types.
    pub msg_seqno: SeqNo,
    // Advertised neighbor sequence number.
    pub ansn: SeqNo,
    // Neighbors advertised in TC messages.
    pub advertised: BTreeSet<IpAddr>,
    // Empty TCs are sent until this deadline after the advertised set
    // became empty.
    pub tc_empty_until: Option<Instant>,
    // Changes accumulated since the last tick.
    pub changes: ChangeSet,
}

bitflags! {
    // State changes that require some recomputation.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct ChangeSet: u8 {
        const NEIGHBORHOOD = 0x01;
        const TOPOLOGY = 0x02;
        const PREFIXES = 0x04;
        const MPR_SELECTORS = 0x08;
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TimerEvent {
    Hello,
    Tc,
    Mid,
    Hna,
}

// Packet ready to be sent.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OutputPacket {
    pub ifname: String,
    pub dst: IpAddr,
    pub packet: Packet,
}

// ===== impl Instance =====

impl<L> Instance<L>
where
    L: LinkQuality,
{
    pub fn new(
        config: InstanceCfg,
        lq_model: L,
        now: Instant,
    ) -> Result<Instance<L>, ConfigError> {
        config.validate()?;
        let main_addr = config.main_addr().ok_or(ConfigError::NoInterfaces)?;

        let mut interfaces = Interfaces::default();
        for iface_cfg in &config.interfaces {
            interfaces.insert(iface_cfg.clone());
        }
        let mut local_addrs = interfaces.local_addresses();
        local_addrs.insert(main_addr);

        Debug::InstanceStart(&main_addr).log();

        // Start the periodic emission timers.
        let mut timers = Timers::default();
        let mut start = |interval, event| {
            timers.start_periodic(
                now,
                timer::jitter(interval),
                interval,
                true,
                event,
            );
        };
        start(config.hello.interval(), TimerEvent::Hello);
        start(config.tc.interval(), TimerEvent::Tc);
        if local_addrs.len() > 1 {
            start(config.mid.interval(), TimerEvent::Mid);
        }
        if !config.hna_prefixes.is_empty() {
            start(config.hna.interval(), TimerEvent::Hna);
        }

        let state = InstanceState {
            main_addr,
            local_addrs,
            neighbors: Neighbors::new(
                lq_model,
                config.hysteresis,
                config.neighb_hold_time(),
            ),
            two_hops: Default::default(),
            mpr_selectors: Default::default(),
            aliases: Default::default(),
            topology: Default::default(),
            duplicates: DuplicateSet::new(DuplicateSet::DFLT_HOLD_TIME),
            spt: Default::default(),
            rib: Default::default(),
            timers,
            msg_seqno: Default::default(),
            ansn: Default::default(),
            advertised: Default::default(),
            tc_empty_until: None,
            changes: ChangeSet::empty(),
        };

        Ok(Instance {
            config,
            state,
            interfaces,
            sink: None,
        })
    }

    // Sets the consumer of the routing table changes.
    pub fn set_route_sink(&mut self, sink: impl RouteSink + 'static) {
        self.sink = Some(Box::new(sink));
    }

    // Returns the context used to decode packets received by this instance.
    pub fn decode_cxt(&self) -> DecodeCxt {
        DecodeCxt {
            af: self.config.af(),
            lq_len: self.state.neighbors.lq_model().wire_len(),
        }
    }

    // Returns the message types used for HELLO and TC messages.
    pub(crate) fn message_types(&self) -> (MessageType, MessageType) {
        match self.state.neighbors.lq_model().wire_len() {
            Some(_) => (MessageType::LqHello, MessageType::LqTc),
            None => (MessageType::Hello, MessageType::Tc),
        }
    }

    // Processes a packet received on the given interface.
    pub fn process_packet(
        &mut self,
        now: Instant,
        ifname: &str,
        src: IpAddr,
        packet: DecodeResult<Packet>,
    ) -> Result<(), Error> {
        events::process_packet(self, now, ifname, src, packet)
    }

    // Runs one scheduling round: fires the due timers, ages every state
    // table, recomputes the routes if anything changed and returns the
    // packets to be sent.
    pub fn tick(&mut self, now: Instant) -> Vec<OutputPacket> {
        let fired = self.state.timers.poll(now);

        self.expire(now);
        if self.recompute() {
            self.update_advertised(now);
        }

        for event in fired {
            match event {
                TimerEvent::Hello => output::send_hello(self),
                TimerEvent::Tc => output::send_tc(self, now),
                TimerEvent::Mid => output::send_mid(self),
                TimerEvent::Hna => output::send_hna(self),
            }
        }

        self.flush()
    }

    // Removes all links established over the given interface and stops
    // sending messages on it.
    pub fn interface_down(&mut self, now: Instant, ifname: &str) {
        let Some(iface) = self.interfaces.get_mut_by_name(ifname) else {
            return;
        };
        if !iface.state.active {
            return;
        }

        Debug::InterfaceDown(ifname).log();
        iface.state.active = false;
        iface.state.out_queue.clear();
        self.state.changes |=
            self.state.neighbors.remove_interface(now, ifname);
    }

    // Resumes operation on an interface previously brought down.
    pub fn interface_up(&mut self, ifname: &str) {
        if let Some(iface) = self.interfaces.get_mut_by_name(ifname) {
            iface.state.active = true;
        }
    }

    fn expire(&mut self, now: Instant) {
        let state = &mut self.state;
        let mut changes = state.neighbors.expire(now);
        changes |= state.two_hops.expire(now);
        changes |= state.two_hops.prune(&state.neighbors);
        changes |= state.mpr_selectors.expire(now);
        changes |= state.mpr_selectors.prune(&state.neighbors);
        changes |= state.aliases.expire(now);
        changes |= state.topology.expire(now);
        state.duplicates.expire(now);
        state.changes |= changes;
    }

    // Runs the recomputation pipeline. Neighborhood changes trigger the MPR
    // selection and a full route computation, topology changes only the
    // route computation, and prefix changes only the routing table update
    // using the last shortest-path tree.
    //
    // Returns whether the set of neighbors advertised in TC messages needs
    // to be refreshed.
    fn recompute(&mut self) -> bool {
        let changes = std::mem::take(&mut self.state.changes);
        let state = &mut self.state;

        let mut refresh_advertised = changes
            .intersects(ChangeSet::NEIGHBORHOOD | ChangeSet::MPR_SELECTORS);
        if changes.contains(ChangeSet::NEIGHBORHOOD) {
            state.two_hops.update_costs(&state.neighbors);
            let selection = mpr::select_mprs(
                &mut state.neighbors,
                &state.two_hops,
                &state.local_addrs,
                self.config.mpr_coverage,
            );
            refresh_advertised |= selection.changed;
        }
        if changes.intersects(ChangeSet::NEIGHBORHOOD | ChangeSet::TOPOLOGY) {
            state.spt = spf::compute_spt(
                &state.local_addrs,
                &state.neighbors,
                &state.two_hops,
                &state.topology,
            );
            Debug::SpfRun(state.spt.len()).log();
        }
        if !changes.intersects(
            ChangeSet::NEIGHBORHOOD | ChangeSet::TOPOLOGY | ChangeSet::PREFIXES,
        ) {
            return refresh_advertised;
        }

        state
            .rib
            .update_paths(&mut state.topology, &state.aliases, &state.spt);
        let rib_changes = state.rib.compute(
            &state.topology,
            &state.local_addrs,
            &self.config.hna_prefixes,
            self.config.default_route_hysteresis,
        );
        self.apply_rib_changes(&rib_changes);

        refresh_advertised
    }

    fn apply_rib_changes(&mut self, changes: &[RibChange]) {
        if let Some(sink) = &mut self.sink {
            for change in changes {
                sink.apply(change);
            }
        }
    }

    // Updates the set of neighbors advertised in TC messages.
    fn update_advertised(&mut self, now: Instant) {
        let state = &mut self.state;
        let advertised = state
            .neighbors
            .iter_symmetric()
            .filter(|nbr| match self.config.tc_redundancy {
                0 => state.mpr_selectors.contains(&nbr.main_addr),
                1 => {
                    state.mpr_selectors.contains(&nbr.main_addr) || nbr.is_mpr
                }
                _ => true,
            })
            .map(|nbr| nbr.main_addr)
            .collect::<BTreeSet<_>>();
        if advertised == state.advertised {
            return;
        }

        if advertised.is_empty() {
            state.tc_empty_until = Some(now + self.config.top_hold_time());
        } else {
            state.tc_empty_until = None;
        }
        state.advertised = advertised;
        state.ansn = state.ansn.next();
        Debug::AnsnChange(state.ansn).log();
    }

    // Packs the queued messages of every active interface into packets.
    fn flush(&mut self) -> Vec<OutputPacket> {
        let mut output = vec![];
        for iface in self.interfaces.iter_mut() {
            if !iface.state.active {
                iface.state.out_queue.clear();
                continue;
            }
            for packet in iface.flush() {
                Debug::PacketTx(&iface.name, &packet).log();
                output.push(OutputPacket {
                    ifname: iface.name.clone(),
                    dst: iface.config.destination(),
                    packet,
                });
            }
        }
        output
    }
}

impl<L> std::fmt::Debug for Instance<L>
where
    L: LinkQuality,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("interfaces", &self.interfaces)
            .finish_non_exhaustive()
    }
}

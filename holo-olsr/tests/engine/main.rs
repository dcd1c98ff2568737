//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

mod input;
mod neighborhood;
mod routing;

use std::net::IpAddr;
use std::time::{Duration, Instant};

use holo_olsr::config::{InstanceCfg, InterfaceCfg};
use holo_olsr::instance::Instance;
use holo_olsr::lq::LinkQuality;
use holo_olsr::packet::Packet;

// Scheduling granularity of the simulated network.
pub const STEP: Duration = Duration::from_millis(100);

// Set of OLSR instances attached to simulated broadcast segments.
//
// Every packet sent on an interface is encoded, decoded again and delivered
// to all other interfaces attached to the same segment.
pub struct Network<L: LinkQuality> {
    pub nodes: Vec<Instance<L>>,
    pub now: Instant,
    segments: Vec<Vec<(usize, String)>>,
}

// ===== impl Network =====

impl<L> Network<L>
where
    L: LinkQuality,
{
    pub fn new() -> Network<L> {
        Network {
            nodes: vec![],
            now: Instant::now(),
            segments: vec![],
        }
    }

    // Adds a node with the given interfaces and returns its index.
    pub fn add_node(&mut self, config: InstanceCfg, lq_model: L) -> usize {
        let instance = Instance::new(config, lq_model, self.now).unwrap();
        self.nodes.push(instance);
        self.nodes.len() - 1
    }

    // Attaches the given interfaces to a new segment.
    pub fn connect(&mut self, ifaces: &[(usize, &str)]) {
        let segment = ifaces
            .iter()
            .map(|(node, ifname)| (*node, ifname.to_string()))
            .collect();
        self.segments.push(segment);
    }

    // Detaches an interface from all segments.
    pub fn disconnect(&mut self, node: usize, ifname: &str) {
        for segment in &mut self.segments {
            segment.retain(|(idx, name)| *idx != node || name != ifname);
        }
    }

    // Runs the network for the given amount of time.
    pub fn run(&mut self, duration: Duration) {
        let deadline = self.now + duration;
        while self.now < deadline {
            self.now += STEP;
            self.step();
        }
    }

    pub fn node(&self, idx: usize) -> &Instance<L> {
        &self.nodes[idx]
    }

    fn step(&mut self) {
        let now = self.now;
        let mut deliveries = vec![];
        for (idx, node) in self.nodes.iter_mut().enumerate() {
            for output in node.tick(now) {
                let src = node
                    .interfaces
                    .get_by_name(&output.ifname)
                    .unwrap()
                    .address();
                let data = output.packet.encode().freeze();
                for segment in &self.segments {
                    if !segment
                        .iter()
                        .any(|(i, name)| *i == idx && *name == output.ifname)
                    {
                        continue;
                    }
                    for (peer, peer_ifname) in segment {
                        if *peer == idx {
                            continue;
                        }
                        deliveries.push((
                            *peer,
                            peer_ifname.clone(),
                            src,
                            data.clone(),
                        ));
                    }
                }
            }
        }

        for (peer, ifname, src, data) in deliveries {
            let node = &mut self.nodes[peer];
            let packet = Packet::decode(&data, &node.decode_cxt());
            node.process_packet(now, &ifname, src, packet).unwrap();
        }
    }
}

// ===== helper functions =====

pub fn addr(addr: &str) -> IpAddr {
    addr.parse().unwrap()
}

pub fn config(ifaces: &[(&str, &str)]) -> InstanceCfg {
    InstanceCfg {
        interfaces: ifaces
            .iter()
            .map(|(name, address)| InterfaceCfg {
                name: name.to_string(),
                address: addr(address),
                broadcast: None,
                mtu: 1500,
            })
            .collect(),
        ..Default::default()
    }
}

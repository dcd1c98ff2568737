//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::time::Duration;

use holo_olsr::lq::{Cost, EtxFf, HopCount, LinkQuality};
use holo_olsr::rib::RibChange;
use holo_olsr::topology::PrefixOrigin;
use ipnetwork::IpNetwork;
use tokio::sync::mpsc;

use super::{Network, addr, config};

fn prefix(prefix: &str) -> IpNetwork {
    prefix.parse().unwrap()
}

// A -- B -- C, with B attached to both segments.
fn line<L: LinkQuality>(lq_model: impl Fn() -> L) -> Network<L> {
    let mut net = Network::new();
    let a = net.add_node(config(&[("eth0", "10.0.1.1")]), lq_model());
    let b = net.add_node(
        config(&[("eth0", "10.0.1.2"), ("eth1", "10.0.2.2")]),
        lq_model(),
    );
    let mut c_config = config(&[("eth0", "10.0.2.3")]);
    c_config.hna_prefixes = vec![prefix("192.168.3.0/24")];
    let c = net.add_node(c_config, lq_model());
    net.connect(&[(a, "eth0"), (b, "eth0")]);
    net.connect(&[(b, "eth1"), (c, "eth0")]);
    net
}

#[test]
fn line_routes() {
    let mut net = line(|| HopCount);
    net.run(Duration::from_secs(20));

    let a = net.node(0);
    let route = a.state.rib.get(&prefix("10.0.1.2/32")).unwrap();
    assert_eq!(route.nexthop, addr("10.0.1.2"));
    assert_eq!(route.hops, 1);
    assert_eq!(route.origin, PrefixOrigin::Main);

    let route = a.state.rib.get(&prefix("10.0.2.3/32")).unwrap();
    assert_eq!(route.nexthop, addr("10.0.1.2"));
    assert_eq!(route.ifname, "eth0");
    assert_eq!(route.hops, 2);
    assert_eq!(route.cost, Cost::new(2048));

    // Secondary address of B, learned from its MID messages.
    let route = a.state.rib.get(&prefix("10.0.2.2/32")).unwrap();
    assert_eq!(route.nexthop, addr("10.0.1.2"));
    assert_eq!(route.origin, PrefixOrigin::Alias);
    assert_eq!(route.owner.0, addr("10.0.1.2"));

    // Local addresses are never routed.
    assert!(a.state.rib.get(&prefix("10.0.1.1/32")).is_none());

    let c = net.node(2);
    let route = c.state.rib.get(&prefix("10.0.1.1/32")).unwrap();
    assert_eq!(route.nexthop, addr("10.0.2.2"));
    assert_eq!(route.hops, 2);
}

#[test]
fn hna_prefix_routes() {
    let mut net = line(|| HopCount);
    net.run(Duration::from_secs(20));

    let a = net.node(0);
    let route = a.state.rib.get(&prefix("192.168.3.0/24")).unwrap();
    assert_eq!(route.nexthop, addr("10.0.1.2"));
    assert_eq!(route.origin, PrefixOrigin::Hna);
    assert_eq!(route.owner, (addr("10.0.2.3"), prefix("192.168.3.0/24")));
    assert_eq!(route.hops, 2);

    // The announcing node doesn't route its own prefixes.
    let c = net.node(2);
    assert!(c.state.rib.get(&prefix("192.168.3.0/24")).is_none());
}

#[test]
fn topology_learned_through_mpr_flooding() {
    let mut net = line(|| HopCount);
    net.run(Duration::from_secs(20));

    // B is the MPR of both A and C and relays their TCs.
    let c = net.node(2);
    let node = c.state.topology.get(&addr("10.0.1.1")).unwrap();
    assert!(node.ansn.is_some());
    assert!(node.edges.contains_key(&addr("10.0.1.2")));
    assert!(
        c.state
            .topology
            .is_edge_usable(&addr("10.0.1.2"), &addr("10.0.1.1"))
    );

    // Every neighborhood change bumps the advertised sequence number.
    let a = net.node(0);
    assert!(a.state.ansn.get() > 0);
    assert!(a.state.advertised.contains(&addr("10.0.1.2")));
}

#[test]
fn route_sink_receives_changes() {
    let mut net = line(|| HopCount);
    let (tx, mut rx) = mpsc::unbounded_channel();
    net.nodes[0].set_route_sink(tx);
    net.run(Duration::from_secs(20));

    let mut added = vec![];
    while let Ok(change) = rx.try_recv() {
        if let RibChange::Add(route) = change {
            added.push(route.prefix);
        }
    }
    assert!(added.contains(&prefix("10.0.1.2/32")));
    assert!(added.contains(&prefix("10.0.2.3/32")));
    assert!(added.contains(&prefix("192.168.3.0/24")));

    // Losing C withdraws its routes.
    net.disconnect(2, "eth0");
    net.run(Duration::from_secs(30));
    let a = net.node(0);
    assert!(a.state.rib.get(&prefix("10.0.2.3/32")).is_none());
    assert!(a.state.rib.get(&prefix("192.168.3.0/24")).is_none());
    assert!(a.state.rib.get(&prefix("10.0.1.2/32")).is_some());

    let mut deleted = vec![];
    while let Ok(change) = rx.try_recv() {
        if let RibChange::Delete(route) = change {
            deleted.push(route.prefix);
        }
    }
    assert!(deleted.contains(&prefix("10.0.2.3/32")));
    assert!(deleted.contains(&prefix("192.168.3.0/24")));
}

#[test]
fn etx_routes() {
    let mut net = line(|| EtxFf::new(32));
    net.run(Duration::from_secs(30));

    let a = net.node(0);
    let route = a.state.rib.get(&prefix("10.0.2.3/32")).unwrap();
    assert_eq!(route.nexthop, addr("10.0.1.2"));
    assert_eq!(route.hops, 2);
    assert!(!route.cost.is_broken());

    // Lossless links reach the best possible quality on both sides.
    let nbr = a.state.neighbors.get(&addr("10.0.1.2")).unwrap();
    assert_eq!(nbr.cost(), Cost::ONE_HOP);
}

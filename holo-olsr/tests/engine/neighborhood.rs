//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::time::Duration;

use holo_olsr::config::HysteresisCfg;
use holo_olsr::link::{LinkKey, LinkStatus};
use holo_olsr::lq::HopCount;
use holo_olsr::mpr;

use super::{Network, addr, config};

// A -- B -- C, with B attached to both segments.
fn line() -> Network<HopCount> {
    let mut net = Network::new();
    let a = net.add_node(config(&[("eth0", "10.0.1.1")]), HopCount);
    let b = net.add_node(
        config(&[("eth0", "10.0.1.2"), ("eth1", "10.0.2.2")]),
        HopCount,
    );
    let c = net.add_node(config(&[("eth0", "10.0.2.3")]), HopCount);
    net.connect(&[(a, "eth0"), (b, "eth0")]);
    net.connect(&[(b, "eth1"), (c, "eth0")]);
    net
}

#[test]
fn links_become_symmetric() {
    let mut net = line();
    net.run(Duration::from_secs(5));

    let a = net.node(0);
    let key = LinkKey {
        local_addr: addr("10.0.1.1"),
        remote_addr: addr("10.0.1.2"),
    };
    let status = a.state.neighbors.link_status(&key);
    assert_eq!(status, Some(LinkStatus::Symmetric));
    assert!(a.state.neighbors.is_symmetric(&addr("10.0.1.2")));

    // B is known by its main address on both sides.
    let c = net.node(2);
    assert!(c.state.neighbors.is_symmetric(&addr("10.0.1.2")));
    assert!(c.state.neighbors.get(&addr("10.0.2.2")).is_none());
}

#[test]
fn two_hop_neighbors() {
    let mut net = line();
    net.run(Duration::from_secs(10));

    let a = net.node(0);
    let two_hop = a.state.two_hops.get(&addr("10.0.2.3")).unwrap();
    assert_eq!(two_hop.refcount(), 1);
    assert!(two_hop.paths.contains_key(&addr("10.0.1.2")));

    // Symmetric one-hop neighbors are never two-hop neighbors.
    let b = net.node(1);
    assert!(b.state.two_hops.is_empty());
}

#[test]
fn line_selects_middle_node_as_mpr() {
    let mut net = line();
    net.run(Duration::from_secs(10));

    let a = net.node(0);
    assert!(a.state.neighbors.get(&addr("10.0.1.2")).unwrap().is_mpr);
    let c = net.node(2);
    assert!(c.state.neighbors.get(&addr("10.0.1.2")).unwrap().is_mpr);

    let b = net.node(1);
    assert!(b.state.mpr_selectors.contains(&addr("10.0.1.1")));
    assert!(b.state.mpr_selectors.contains(&addr("10.0.2.3")));
    assert!(b.state.neighbors.iter().all(|nbr| !nbr.is_mpr));

    // Every two-hop neighbor is covered.
    let coverage = mpr::mpr_coverage(&a.state.neighbors, &a.state.two_hops);
    assert_eq!(coverage.get(&addr("10.0.2.3")), Some(&(1, 1)));
}

#[test]
fn single_segment_selects_no_mprs() {
    let mut net = Network::new();
    let nodes = ["10.0.0.1", "10.0.0.2", "10.0.0.3"]
        .iter()
        .map(|address| net.add_node(config(&[("eth0", *address)]), HopCount))
        .collect::<Vec<_>>();
    let ifaces = nodes.iter().map(|node| (*node, "eth0")).collect::<Vec<_>>();
    net.connect(&ifaces);
    net.run(Duration::from_secs(15));

    for node in &net.nodes {
        assert_eq!(node.state.neighbors.len(), 2);
        assert!(node.state.neighbors.iter().all(|nbr| !nbr.is_mpr));
        assert!(node.state.mpr_selectors.is_empty());
        assert!(node.state.two_hops.is_empty());
        // TCs are received directly from every other node.
        assert_eq!(node.state.advertised.len(), 2);
    }
    let a = net.node(0);
    assert!(a.state.topology.get(&addr("10.0.0.2")).is_some());
    assert!(a.state.topology.get(&addr("10.0.0.3")).is_some());
}

#[test]
fn unwilling_neighbor_never_selected() {
    // A -- B -- C, plus a second path A -- D -- C through an unwilling D.
    let mut net = Network::new();
    let a = net.add_node(
        config(&[("eth0", "10.0.1.1"), ("eth1", "10.0.3.1")]),
        HopCount,
    );
    let b = net.add_node(
        config(&[("eth0", "10.0.1.2"), ("eth1", "10.0.2.2")]),
        HopCount,
    );
    let c = net.add_node(
        config(&[("eth0", "10.0.2.3"), ("eth1", "10.0.4.3")]),
        HopCount,
    );
    let mut d_config = config(&[("eth0", "10.0.3.4"), ("eth1", "10.0.4.4")]);
    d_config.willingness = 0;
    let d = net.add_node(d_config, HopCount);
    net.connect(&[(a, "eth0"), (b, "eth0")]);
    net.connect(&[(b, "eth1"), (c, "eth0")]);
    net.connect(&[(a, "eth1"), (d, "eth0")]);
    net.connect(&[(d, "eth1"), (c, "eth1")]);
    net.run(Duration::from_secs(15));

    let a = net.node(a);
    assert_eq!(
        a.state.two_hops.get(&addr("10.0.2.3")).unwrap().refcount(),
        2
    );
    assert!(a.state.neighbors.get(&addr("10.0.1.2")).unwrap().is_mpr);
    assert!(!a.state.neighbors.get(&addr("10.0.3.4")).unwrap().is_mpr);
}

#[test]
fn hysteresis_delays_link_establishment() {
    let mut net = Network::new();
    let mut a_config = config(&[("eth0", "10.0.1.1")]);
    a_config.hysteresis = HysteresisCfg {
        enabled: true,
        ..Default::default()
    };
    let a = net.add_node(a_config, HopCount);
    let b = net.add_node(config(&[("eth0", "10.0.1.2")]), HopCount);
    net.connect(&[(a, "eth0"), (b, "eth0")]);
    let key = LinkKey {
        local_addr: addr("10.0.1.1"),
        remote_addr: addr("10.0.1.2"),
    };

    // A single HELLO isn't enough to trust the link.
    net.run(Duration::from_secs(1));
    let status = net.node(a).state.neighbors.link_status(&key);
    assert_eq!(status, Some(LinkStatus::Unspecified));
    assert!(!net.node(a).state.neighbors.is_symmetric(&addr("10.0.1.2")));

    // Three consecutive HELLOs bring the quality above the high threshold.
    net.run(Duration::from_secs(7));
    let status = net.node(a).state.neighbors.link_status(&key);
    assert_eq!(status, Some(LinkStatus::Symmetric));
}

#[test]
fn lost_link_removes_neighbor() {
    let mut net = line();
    net.run(Duration::from_secs(10));
    assert!(net.node(0).state.neighbors.is_symmetric(&addr("10.0.1.2")));

    net.disconnect(2, "eth0");
    net.run(Duration::from_secs(8));
    let b = net.node(1);
    assert!(!b.state.neighbors.is_symmetric(&addr("10.0.2.3")));
    assert!(!b.state.mpr_selectors.contains(&addr("10.0.2.3")));

    net.run(Duration::from_secs(10));
    let b = net.node(1);
    assert!(b.state.neighbors.get(&addr("10.0.2.3")).is_none());
    let a = net.node(0);
    assert!(a.state.two_hops.is_empty());
    assert!(!a.state.neighbors.get(&addr("10.0.1.2")).unwrap().is_mpr);
}

#[test]
fn interface_down_removes_links() {
    let mut net = line();
    net.run(Duration::from_secs(10));

    let now = net.now;
    net.nodes[1].interface_down(now, "eth1");
    let b = net.node(1);
    assert!(b.state.neighbors.get(&addr("10.0.2.3")).is_none());
    assert!(b.state.neighbors.is_symmetric(&addr("10.0.1.1")));

    net.run(Duration::from_secs(1));
    let b = net.node(1);
    assert!(b.state.neighbors.get(&addr("10.0.2.3")).is_none());
}

#[test]
fn advertised_set_follows_mpr_changes() {
    let mut net = Network::new();
    let mut a_config = config(&[("eth0", "10.0.1.1")]);
    a_config.tc_redundancy = 1;
    let a = net.add_node(a_config, HopCount);
    let b = net.add_node(
        config(&[("eth0", "10.0.1.2"), ("eth1", "10.0.2.2")]),
        HopCount,
    );
    let c = net.add_node(config(&[("eth0", "10.0.2.3")]), HopCount);
    net.connect(&[(a, "eth0"), (b, "eth0")]);
    net.connect(&[(b, "eth1"), (c, "eth0")]);
    net.run(Duration::from_secs(10));

    // A has no MPR selectors but advertises its MPR.
    let node = net.node(a);
    assert!(node.state.mpr_selectors.is_empty());
    assert!(node.state.advertised.contains(&addr("10.0.1.2")));
    assert_eq!(node.state.advertised.len(), 1);
    let ansn = node.state.ansn;

    // Losing C makes B redundant as an MPR.
    net.disconnect(c, "eth0");
    net.run(Duration::from_secs(18));
    let node = net.node(a);
    assert!(!node.state.neighbors.get(&addr("10.0.1.2")).unwrap().is_mpr);
    assert!(node.state.advertised.is_empty());
    assert_ne!(node.state.ansn, ansn);
}

//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::IpAddr;
use std::time::{Duration, Instant};

use bytes::Bytes;
use holo_olsr::error::Error;
use holo_olsr::instance::Instance;
use holo_olsr::link::LinkKey;
use holo_olsr::lq::HopCount;
use holo_olsr::neighbor::NeighborStatus;
use holo_olsr::packet::{
    DecodeError, Hello, LinkBlock, LinkCode, LinkType, Message, MessageBody,
    MessageHdr, MessageType, NeighborAddr, NeighborType, Packet, Tc, Vtime,
};
use holo_olsr::seqno::SeqNo;

use super::{addr, config};

const LOCAL: &str = "10.0.0.1";
const NEIGHBOR: &str = "10.0.0.2";
const REMOTE: &str = "10.0.9.9";

fn instance(now: Instant) -> Instance<HopCount> {
    Instance::new(config(&[("eth0", LOCAL)]), HopCount, now).unwrap()
}

fn message(
    msg_type: MessageType,
    originator: &str,
    ttl: u8,
    seqno: u16,
    body: MessageBody,
) -> Message {
    Message {
        hdr: MessageHdr {
            msg_type,
            vtime: Vtime::from_duration(Duration::from_secs(15)),
            originator: addr(originator),
            ttl,
            hop_count: 0,
            seqno: SeqNo::new(seqno),
        },
        body,
    }
}

fn packet(seqno: u16, messages: Vec<Message>) -> Packet {
    Packet {
        seqno: SeqNo::new(seqno),
        messages,
    }
}

// HELLO from the neighbor listing the local address with the given
// neighbor type.
fn hello(seqno: u16, neighbor_type: Option<NeighborType>) -> Message {
    let links = neighbor_type
        .map(|neighbor_type| LinkBlock {
            link_code: LinkCode::new(LinkType::Sym, neighbor_type),
            neighbors: vec![NeighborAddr {
                addr: addr(LOCAL),
                lq: Bytes::new(),
            }],
        })
        .into_iter()
        .collect();
    let hello = Hello {
        htime: Vtime::from_duration(Duration::from_secs(2)),
        willingness: 3,
        links,
    };
    message(MessageType::Hello, NEIGHBOR, 1, seqno, MessageBody::Hello(hello))
}

fn tc(seqno: u16, ansn: u16, neighbors: &[&str]) -> Message {
    let tc = Tc {
        ansn: SeqNo::new(ansn),
        neighbors: neighbors
            .iter()
            .map(|neighbor| NeighborAddr {
                addr: addr(neighbor),
                lq: Bytes::new(),
            })
            .collect(),
    };
    message(MessageType::Tc, REMOTE, 255, seqno, MessageBody::Tc(tc))
}

fn receive(instance: &mut Instance<HopCount>, now: Instant, packet: Packet) {
    instance
        .process_packet(now, "eth0", addr(NEIGHBOR), Ok(packet))
        .unwrap();
}

fn edges(instance: &Instance<HopCount>) -> Vec<IpAddr> {
    instance
        .state
        .topology
        .get(&addr(REMOTE))
        .map(|node| node.edges.keys().copied().collect())
        .unwrap_or_default()
}

#[test]
fn unknown_interface() {
    let t0 = Instant::now();
    let mut instance = instance(t0);
    let packet = packet(1, vec![]);
    let result =
        instance.process_packet(t0, "eth9", addr(NEIGHBOR), Ok(packet));
    assert!(matches!(
        result,
        Err(Error::InterfaceUnknown(ifname)) if ifname == "eth9"
    ));
}

#[test]
fn decode_error_accounted() {
    let t0 = Instant::now();
    let mut instance = instance(t0);
    let result = instance.process_packet(
        t0,
        "eth0",
        addr(NEIGHBOR),
        Err(DecodeError::IncompletePacket),
    );
    assert!(matches!(result, Err(Error::UdpPacketDecodeError(..))));

    let iface = instance.interfaces.get_by_name("eth0").unwrap();
    assert_eq!(iface.state.statistics.bad_packets_rcvd, 1);
    assert!(iface.state.statistics.discontinuity_time.is_some());
}

#[test]
fn first_hello_creates_asymmetric_neighbor() {
    let t0 = Instant::now();
    let mut instance = instance(t0);
    receive(&mut instance, t0, packet(1, vec![hello(1, None)]));

    let nbr = instance.state.neighbors.get(&addr(NEIGHBOR)).unwrap();
    assert_eq!(nbr.status, NeighborStatus::NotSymmetric);
    assert_eq!(nbr.willingness, 3);
    let link = nbr.best_link().unwrap();
    assert_eq!(link.advertised_type(), LinkType::Asym);

    // Our own address listed by the neighbor makes the link symmetric.
    let t1 = t0 + Duration::from_secs(2);
    receive(
        &mut instance,
        t1,
        packet(2, vec![hello(2, Some(NeighborType::Sym))]),
    );
    let nbr = instance.state.neighbors.get(&addr(NEIGHBOR)).unwrap();
    assert_eq!(nbr.status, NeighborStatus::Symmetric);
}

#[test]
fn self_originated_messages_discarded() {
    let t0 = Instant::now();
    let mut instance = instance(t0);
    let mut msg = hello(1, None);
    msg.hdr.originator = addr(LOCAL);
    receive(&mut instance, t0, packet(1, vec![msg]));
    assert!(instance.state.neighbors.is_empty());

    // Packets looped back from a local address are ignored altogether.
    instance
        .process_packet(t0, "eth0", addr(LOCAL), Ok(packet(1, vec![])))
        .unwrap();
    let iface = instance.interfaces.get_by_name("eth0").unwrap();
    assert_eq!(iface.state.statistics.packets_rcvd, 1);
}

#[test]
fn tc_requires_symmetric_sender() {
    let t0 = Instant::now();
    let mut instance = instance(t0);
    receive(&mut instance, t0, packet(1, vec![hello(1, None)]));
    receive(&mut instance, t0, packet(2, vec![tc(1, 1, &["10.0.9.8"])]));
    assert!(edges(&instance).is_empty());
    assert!(instance.state.duplicates.is_empty());
}

#[test]
fn sender_matched_by_receiving_interface() {
    let t0 = Instant::now();
    let config = config(&[("eth0", LOCAL), ("eth1", "10.0.1.1")]);
    let mut instance = Instance::new(config, HopCount, t0).unwrap();
    receive(
        &mut instance,
        t0,
        packet(1, vec![hello(1, Some(NeighborType::Sym))]),
    );

    let neighbors = &instance.state.neighbors;
    let key = LinkKey {
        local_addr: addr(LOCAL),
        remote_addr: addr(NEIGHBOR),
    };
    let nbr = neighbors.get_by_link(&key).unwrap();
    assert_eq!(nbr.main_addr, addr(NEIGHBOR));
    let key = LinkKey {
        local_addr: addr("10.0.1.1"),
        remote_addr: addr(NEIGHBOR),
    };
    assert!(neighbors.get_by_link(&key).is_none());

    // The neighbor has no link on eth1.
    instance
        .process_packet(
            t0,
            "eth1",
            addr(NEIGHBOR),
            Ok(packet(2, vec![tc(10, 1, &["10.0.9.8"])])),
        )
        .unwrap();
    assert!(edges(&instance).is_empty());

    receive(&mut instance, t0, packet(3, vec![tc(10, 1, &["10.0.9.8"])]));
    assert_eq!(edges(&instance), vec![addr("10.0.9.8")]);
}

#[test]
fn duplicate_tc_processed_once() {
    let t0 = Instant::now();
    let mut instance = instance(t0);
    receive(
        &mut instance,
        t0,
        packet(1, vec![hello(1, Some(NeighborType::Sym))]),
    );

    receive(&mut instance, t0, packet(2, vec![tc(10, 1, &["10.0.9.8"])]));
    assert_eq!(edges(&instance), vec![addr("10.0.9.8")]);

    // Same originator and sequence number: dropped whatever the content.
    receive(&mut instance, t0, packet(3, vec![tc(10, 2, &[])]));
    assert_eq!(edges(&instance), vec![addr("10.0.9.8")]);
    assert_eq!(instance.state.duplicates.len(), 1);

    // Stale ANSN.
    receive(&mut instance, t0, packet(4, vec![tc(11, 0, &["10.0.9.7"])]));
    assert_eq!(edges(&instance), vec![addr("10.0.9.8")]);

    // Newer ANSN replaces the advertised set.
    receive(&mut instance, t0, packet(5, vec![tc(12, 2, &["10.0.9.7"])]));
    assert_eq!(edges(&instance), vec![addr("10.0.9.7")]);

    // ANSN wraparound.
    receive(&mut instance, t0, packet(6, vec![tc(13, 0x8000, &[])]));
    assert!(edges(&instance).is_empty());
    receive(&mut instance, t0, packet(7, vec![tc(14, 0xfff0, &[])]));
    receive(&mut instance, t0, packet(8, vec![tc(15, 3, &["10.0.9.6"])]));
    assert_eq!(edges(&instance), vec![addr("10.0.9.6")]);
}

#[test]
fn tc_forwarded_for_mpr_selectors_only() {
    let forwarded = |neighbor_type| {
        let t0 = Instant::now();
        let mut instance = instance(t0);
        receive(&mut instance, t0, packet(1, vec![hello(1, neighbor_type)]));
        receive(
            &mut instance,
            t0,
            packet(2, vec![tc(10, 1, &["10.0.9.8"])]),
        );
        // The same message received twice is forwarded at most once.
        receive(
            &mut instance,
            t0,
            packet(3, vec![tc(10, 1, &["10.0.9.8"])]),
        );

        instance
            .tick(t0)
            .into_iter()
            .flat_map(|output| output.packet.messages)
            .filter(|msg| msg.hdr.originator == addr(REMOTE))
            .collect::<Vec<_>>()
    };

    let msgs = forwarded(Some(NeighborType::Mpr));
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].hdr.ttl, 254);
    assert_eq!(msgs[0].hdr.hop_count, 1);
    assert_eq!(msgs[0].hdr.seqno, SeqNo::new(10));

    let msgs = forwarded(Some(NeighborType::Sym));
    assert!(msgs.is_empty());
}

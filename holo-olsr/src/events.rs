//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::IpAddr;
use std::time::Instant;

use crate::debug::{Debug, DiscardReason};
use crate::error::Error;
use crate::instance::Instance;
use crate::link::LinkKey;
use crate::lq::{Cost, LinkQuality};
use crate::packet::{
    AddressFamily, DecodeResult, Hello, Message, MessageBody, MessageHdr,
    Packet, Tc,
};

// ===== UDP packet receipt =====

pub(crate) fn process_packet<L>(
    instance: &mut Instance<L>,
    now: Instant,
    ifname: &str,
    src: IpAddr,
    packet: DecodeResult<Packet>,
) -> Result<(), Error>
where
    L: LinkQuality,
{
    // Lookup interface.
    let af = instance.config.af();
    let Some(iface) = instance.interfaces.get_mut_by_name(ifname) else {
        return Err(Error::InterfaceUnknown(ifname.to_owned()));
    };
    if !iface.state.active {
        return Ok(());
    }
    let local_addr = iface.address();

    // Validate source address.
    if AddressFamily::of(&src) != af {
        return Err(Error::UdpInvalidSourceAddr(src));
    }

    // Ignore our own packets looped back by the network.
    if instance.state.local_addrs.contains(&src) {
        return Ok(());
    }

    let packet = match packet {
        Ok(packet) => {
            iface.state.statistics.packets_rcvd += 1;
            packet
        }
        Err(error) => {
            iface.state.statistics.bad_packets_rcvd += 1;
            iface.state.statistics.update_discontinuity_time();
            return Err(Error::UdpPacketDecodeError(
                ifname.to_owned(),
                src,
                error,
            ));
        }
    };

    Debug::PacketRx(ifname, &src, &packet).log();

    for msg in &packet.messages {
        process_message(instance, now, ifname, local_addr, src, msg);
    }

    // Account the packet in the link quality of the link it was received
    // on.
    instance.state.changes |= instance.state.neighbors.observe_packet(
        local_addr,
        src,
        packet.seqno,
    );

    Ok(())
}

// ===== message processing =====

fn process_message<L>(
    instance: &mut Instance<L>,
    now: Instant,
    ifname: &str,
    local_addr: IpAddr,
    src: IpAddr,
    msg: &Message,
) where
    L: LinkQuality,
{
    let hdr = &msg.hdr;

    // Discard messages originated by this node.
    if instance.state.local_addrs.contains(&hdr.originator) {
        Debug::MessageDiscard(hdr, DiscardReason::SelfOriginated).log();
        return;
    }
    if hdr.ttl == 0 {
        Debug::MessageDiscard(hdr, DiscardReason::TtlExpired).log();
        return;
    }

    // HELLO messages are link-local and never forwarded.
    if let MessageBody::Hello(hello) = &msg.body {
        process_hello(instance, now, ifname, local_addr, src, hdr, hello);
        return;
    }

    // Other messages are only accepted from symmetric neighbors.
    let key = LinkKey {
        local_addr,
        remote_addr: src,
    };
    let neighbors = &instance.state.neighbors;
    let sender = neighbors
        .get_link(&key)
        .filter(|link| link.is_symmetric())
        .and_then(|_| neighbors.get_by_link(&key))
        .map(|nbr| nbr.main_addr);
    let Some(sender) = sender else {
        Debug::MessageDiscard(hdr, DiscardReason::SenderNotSymmetric).log();
        return;
    };

    // Process the message unless it was already processed.
    let duplicates = &mut instance.state.duplicates;
    if duplicates.should_process(now, &hdr.originator, hdr.seqno) {
        duplicates.mark_processed(now, hdr.originator, hdr.seqno);
        match &msg.body {
            MessageBody::Tc(tc) => process_tc(instance, now, hdr, tc),
            MessageBody::Mid(mid) => {
                let validity = hdr.vtime.to_duration();
                instance.state.changes |=
                    instance.state.aliases.update_from_mid(
                        now,
                        hdr.originator,
                        &mid.addrs,
                        validity,
                    );
            }
            MessageBody::Hna(hna) => {
                let validity = hdr.vtime.to_duration();
                instance.state.changes |=
                    instance.state.topology.update_from_hna(
                        now,
                        hdr.originator,
                        &hna.prefixes,
                        validity,
                    );
            }
            MessageBody::Hello(_) | MessageBody::Unknown(_) => (),
        }
    } else {
        Debug::MessageDiscard(hdr, DiscardReason::Duplicate).log();
    }

    forward_message(instance, now, ifname, sender, msg);
}

fn process_hello<L>(
    instance: &mut Instance<L>,
    now: Instant,
    ifname: &str,
    local_addr: IpAddr,
    src: IpAddr,
    hdr: &MessageHdr,
    hello: &Hello,
) where
    L: LinkQuality,
{
    // The HELLO format must match the active link quality model.
    let (hello_type, _) = instance.message_types();
    if hdr.msg_type != hello_type {
        Debug::MessageDiscard(hdr, DiscardReason::UnexpectedType).log();
        return;
    }

    let state = &mut instance.state;
    let validity = hdr.vtime.to_duration();
    let mut changes = state.neighbors.observe_hello(
        now,
        ifname,
        local_addr,
        src,
        hdr.originator,
        validity,
        hello.htime.to_duration(),
        hello,
    );

    // Two-hop neighbors and MPR selectors are only learned from symmetric
    // neighbors.
    if let Some(nbr) = state.neighbors.get(&hdr.originator)
        && nbr.is_symmetric()
    {
        changes |= state.two_hops.link_hello(
            now,
            nbr,
            &state.neighbors,
            &state.aliases,
            &state.local_addrs,
            hello,
            validity,
        );
        changes |= state.mpr_selectors.process_hello(
            now,
            hdr.originator,
            &state.local_addrs,
            hello,
            validity,
        );
    }

    state.changes |= changes;
}

fn process_tc<L>(
    instance: &mut Instance<L>,
    now: Instant,
    hdr: &MessageHdr,
    tc: &Tc,
) where
    L: LinkQuality,
{
    let (_, tc_type) = instance.message_types();
    if hdr.msg_type != tc_type {
        Debug::MessageDiscard(hdr, DiscardReason::UnexpectedType).log();
        return;
    }

    let state = &mut instance.state;
    let lq_model = state.neighbors.lq_model();

    // Advertised neighbors, with the cost of the edge leading to them.
    let edges = tc
        .neighbors
        .iter()
        .map(|entry| {
            let addr = state.aliases.main_address_of(&entry.addr);
            let cost = if hdr.msg_type.is_lq() {
                lq_model
                    .deserialize(&entry.lq)
                    .map(|wire| lq_model.edge_cost(&wire))
                    .unwrap_or(Cost::BROKEN)
            } else {
                Cost::ONE_HOP
            };
            (addr, cost)
        })
        .collect::<Vec<_>>();

    state.changes |= state.topology.update_from_tc(
        lq_model,
        now,
        hdr.originator,
        tc.ansn,
        &edges,
        &[],
        hdr.vtime.to_duration(),
    );
}

// ===== message forwarding =====

// Default forwarding algorithm (RFC 3626 Section 3.4.1).
//
// Messages are retransmitted only when received from a neighbor that
// selected this node as MPR, and at most once.
fn forward_message<L>(
    instance: &mut Instance<L>,
    now: Instant,
    ifname: &str,
    sender: IpAddr,
    msg: &Message,
) where
    L: LinkQuality,
{
    let hdr = &msg.hdr;
    let state = &mut instance.state;
    if !state
        .duplicates
        .should_forward(now, &hdr.originator, hdr.seqno, ifname)
    {
        return;
    }

    let retransmit = state.mpr_selectors.contains(&sender) && hdr.ttl > 1;
    state.duplicates.mark_forwarded(
        now,
        hdr.originator,
        hdr.seqno,
        ifname,
        retransmit,
    );
    if !retransmit {
        return;
    }

    Debug::MessageForward(hdr).log();
    let msg = msg.forwarded();
    for iface in instance
        .interfaces
        .iter_mut()
        .filter(|iface| iface.state.active)
    {
        iface.state.out_queue.push(msg.clone());
    }
}

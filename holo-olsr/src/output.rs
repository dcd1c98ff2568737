//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::IpAddr;
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};

use crate::instance::{Instance, InstanceState};
use crate::interface::Interfaces;
use crate::link::LinkStatus;
use crate::lq::LinkQuality;
use crate::packet::{
    Hello, Hna, LinkBlock, LinkCode, LinkType, Message, MessageBody,
    MessageHdr, MessageType, Mid, NeighborAddr, NeighborType, Tc, Vtime,
};

// TTL of the flooded messages.
const MAX_TTL: u8 = 255;

// ===== global functions =====

// Queues a HELLO message on every active interface (RFC 3626 Section 6.2).
//
// Every interface gets its own HELLO, listing the links established over
// that interface and, with an unspecified link type, the neighbors only
// reachable through other interfaces.
pub(crate) fn send_hello<L>(instance: &mut Instance<L>)
where
    L: LinkQuality,
{
    let (msg_type, _) = instance.message_types();
    let config = &instance.config;
    let state = &mut instance.state;

    for iface in instance
        .interfaces
        .iter_mut()
        .filter(|iface| iface.state.active)
    {
        let lq_model = state.neighbors.lq_model();
        let mut blocks: Vec<LinkBlock> = vec![];
        for nbr in state.neighbors.iter() {
            let neighbor_type = if nbr.is_mpr {
                NeighborType::Mpr
            } else if nbr.is_symmetric() {
                NeighborType::Sym
            } else {
                NeighborType::NotNeigh
            };

            let mut listed = false;
            for link in nbr
                .links
                .values()
                .filter(|link| link.key.local_addr == iface.address())
            {
                // Links pending on hysteresis aren't advertised.
                if link.status == LinkStatus::Unspecified {
                    continue;
                }
                listed = true;
                let link_code =
                    LinkCode::new(link.advertised_type(), neighbor_type);
                let wire = lq_model.hello_lq(&link.lq);
                let lq = encode_lq(lq_model, Some(wire));
                block_push(&mut blocks, link_code, link.key.remote_addr, lq);
            }

            if !listed && neighbor_type != NeighborType::NotNeigh {
                let link_code = LinkCode::new(LinkType::Unspec, neighbor_type);
                let wire =
                    nbr.best_link().map(|link| lq_model.hello_lq(&link.lq));
                let lq = encode_lq(lq_model, wire);
                block_push(&mut blocks, link_code, nbr.main_addr, lq);
            }
        }

        let hello = Hello {
            htime: Vtime::from_duration(config.hello.interval()),
            willingness: config.willingness,
            links: blocks,
        };
        let msg = new_message(
            state,
            msg_type,
            config.hello.validity(),
            1,
            MessageBody::Hello(hello),
        );
        iface.state.out_queue.push(msg);
    }
}

// Queues a TC message advertising the current advertised neighbor set
// (RFC 3626 Section 9.3).
//
// Once the advertised set becomes empty, empty TCs are still sent for the
// topology holding time so that other nodes can flush the stale
// information sooner.
pub(crate) fn send_tc<L>(instance: &mut Instance<L>, now: Instant)
where
    L: LinkQuality,
{
    let (_, msg_type) = instance.message_types();
    let state = &mut instance.state;
    if state.advertised.is_empty()
        && state.tc_empty_until.is_none_or(|deadline| deadline <= now)
    {
        return;
    }

    let lq_model = state.neighbors.lq_model();
    let neighbors = state
        .advertised
        .iter()
        .map(|addr| {
            let wire = state
                .neighbors
                .best_link_to(addr)
                .map(|link| lq_model.tc_lq(&link.lq));
            NeighborAddr {
                addr: *addr,
                lq: encode_lq(lq_model, wire),
            }
        })
        .collect();
    let tc = Tc {
        ansn: state.ansn,
        neighbors,
    };
    let msg = new_message(
        state,
        msg_type,
        instance.config.tc.validity(),
        MAX_TTL,
        MessageBody::Tc(tc),
    );
    queue_all(&mut instance.interfaces, msg);
}

// Queues a MID message declaring the addresses of the interfaces other
// than the main one (RFC 3626 Section 5.2).
pub(crate) fn send_mid<L>(instance: &mut Instance<L>)
where
    L: LinkQuality,
{
    let state = &mut instance.state;
    let addrs = state
        .local_addrs
        .iter()
        .filter(|addr| **addr != state.main_addr)
        .copied()
        .collect::<Vec<_>>();
    if addrs.is_empty() {
        return;
    }

    let msg = new_message(
        state,
        MessageType::Mid,
        instance.config.mid.validity(),
        MAX_TTL,
        MessageBody::Mid(Mid { addrs }),
    );
    queue_all(&mut instance.interfaces, msg);
}

// Queues an HNA message with the configured local prefixes (RFC 3626
// Section 12.2).
pub(crate) fn send_hna<L>(instance: &mut Instance<L>)
where
    L: LinkQuality,
{
    if instance.config.hna_prefixes.is_empty() {
        return;
    }

    let hna = Hna {
        prefixes: instance.config.hna_prefixes.clone(),
    };
    let msg = new_message(
        &mut instance.state,
        MessageType::Hna,
        instance.config.hna.validity(),
        MAX_TTL,
        MessageBody::Hna(hna),
    );
    queue_all(&mut instance.interfaces, msg);
}

// ===== helper functions =====

fn new_message<L>(
    state: &mut InstanceState<L>,
    msg_type: MessageType,
    validity: Duration,
    ttl: u8,
    body: MessageBody,
) -> Message
where
    L: LinkQuality,
{
    Message {
        hdr: MessageHdr {
            msg_type,
            vtime: Vtime::from_duration(validity),
            originator: state.main_addr,
            ttl,
            hop_count: 0,
            seqno: state.msg_seqno.fetch_increment(),
        },
        body,
    }
}

fn queue_all(interfaces: &mut Interfaces, msg: Message) {
    for iface in interfaces.iter_mut().filter(|iface| iface.state.active) {
        iface.state.out_queue.push(msg.clone());
    }
}

// Adds an address to the link block of the given link code.
fn block_push(
    blocks: &mut Vec<LinkBlock>,
    link_code: LinkCode,
    addr: IpAddr,
    lq: Bytes,
) {
    let entry = NeighborAddr { addr, lq };
    match blocks.iter_mut().find(|block| block.link_code == link_code) {
        Some(block) => block.neighbors.push(entry),
        None => blocks.push(LinkBlock {
            link_code,
            neighbors: vec![entry],
        }),
    }
}

// Encodes the quality pair of an advertised address. Addresses without a
// known quality are advertised with a zeroed pair.
fn encode_lq<L>(lq_model: &L, wire: Option<L::WireLq>) -> Bytes
where
    L: LinkQuality,
{
    let Some(len) = lq_model.wire_len() else {
        return Bytes::new();
    };
    match wire {
        Some(wire) => {
            let mut buf = BytesMut::with_capacity(len);
            lq_model.serialize(&wire, &mut buf);
            buf.freeze()
        }
        None => Bytes::from(vec![0; len]),
    }
}

//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::IpAddr;

use ipnetwork::IpNetwork;
use tracing::{debug, debug_span};

use crate::link::{LinkKey, LinkStatus};
use crate::lq::Cost;
use crate::neighbor::NeighborStatus;
use crate::packet::{MessageHdr, Packet};
use crate::rib::RouteEntry;
use crate::seqno::SeqNo;

// OLSR debug messages.
#[derive(Debug)]
pub enum Debug<'a> {
    InstanceStart(&'a IpAddr),
    InterfaceCreate(&'a str),
    InterfaceDown(&'a str),
    PacketRx(&'a str, &'a IpAddr, &'a Packet),
    PacketTx(&'a str, &'a Packet),
    MessageDiscard(&'a MessageHdr, DiscardReason),
    MessageForward(&'a MessageHdr),
    LinkCreate(&'a LinkKey, &'a str),
    LinkDelete(&'a LinkKey),
    LinkStatusChange(&'a LinkKey, LinkStatus, LinkStatus),
    LinkCostChange(&'a LinkKey, Cost),
    LinkHelloMissed(&'a LinkKey),
    NeighborCreate(&'a IpAddr),
    NeighborDelete(&'a IpAddr),
    NeighborStatusChange(&'a IpAddr, NeighborStatus, NeighborStatus),
    NeighborWillingnessChange(&'a IpAddr, u8, u8),
    TwoHopNeighborCreate(&'a IpAddr),
    TwoHopNeighborDelete(&'a IpAddr),
    MprChange(&'a IpAddr, bool),
    MprCoverageShortfall(&'a IpAddr, usize, usize),
    MprSelectorAdd(&'a IpAddr),
    MprSelectorDelete(&'a IpAddr),
    AliasCreate(&'a IpAddr, &'a IpAddr),
    AliasDelete(&'a IpAddr, &'a IpAddr),
    AnsnChange(SeqNo),
    TopologyNodeCreate(&'a IpAddr),
    TopologyNodeDelete(&'a IpAddr),
    TcStale(&'a IpAddr, SeqNo, SeqNo),
    TcExpire(&'a IpAddr),
    HnaPrefixAdd(&'a IpAddr, &'a IpNetwork),
    HnaPrefixDelete(&'a IpAddr, &'a IpNetwork),
    SpfRun(usize),
    RouteAdd(&'a RouteEntry),
    RouteChange(&'a RouteEntry),
    RouteDelete(&'a RouteEntry),
}

// Reason why a received message was discarded.
#[derive(Clone, Copy, Debug)]
pub enum DiscardReason {
    SelfOriginated,
    TtlExpired,
    SenderNotSymmetric,
    Duplicate,
    UnexpectedType,
}

// ===== impl Debug =====

impl Debug<'_> {
    // Log debug message using the tracing API.
    pub(crate) fn log(&self) {
        match self {
            Debug::InstanceStart(main_addr) => {
                // Parent span(s): olsr-instance
                debug!(%main_addr, "{}", self);
            }
            Debug::InterfaceCreate(name) | Debug::InterfaceDown(name) => {
                // Parent span(s): olsr-instance
                debug_span!("interface", %name).in_scope(|| {
                    debug!("{}", self);
                });
            }
            Debug::PacketRx(ifname, source, packet) => {
                // Parent span(s): olsr-instance
                debug_span!("network").in_scope(|| {
                    debug_span!("input", interface = %ifname, %source)
                        .in_scope(|| {
                            let data =
                                serde_json::to_string(&packet).unwrap_or_default();
                            debug!(%data, "{}", self);
                        });
                });
            }
            Debug::PacketTx(ifname, packet) => {
                // Parent span(s): olsr-instance
                debug_span!("network").in_scope(|| {
                    debug_span!("output", interface = %ifname).in_scope(|| {
                        let data =
                            serde_json::to_string(&packet).unwrap_or_default();
                        debug!(%data, "{}", self);
                    });
                });
            }
            Debug::MessageDiscard(hdr, reason) => {
                // Parent span(s): olsr-instance
                debug!(
                    r#type = %hdr.msg_type,
                    originator = %hdr.originator,
                    seqno = %hdr.seqno,
                    %reason,
                    "{}", self
                );
            }
            Debug::MessageForward(hdr) => {
                // Parent span(s): olsr-instance
                debug!(
                    r#type = %hdr.msg_type,
                    originator = %hdr.originator,
                    seqno = %hdr.seqno,
                    ttl = %hdr.ttl,
                    "{}", self
                );
            }
            Debug::LinkCreate(key, ifname) => {
                // Parent span(s): olsr-instance
                debug_span!("link", local = %key.local_addr, remote = %key.remote_addr)
                    .in_scope(|| {
                        debug!(interface = %ifname, "{}", self);
                    });
            }
            Debug::LinkDelete(key) | Debug::LinkHelloMissed(key) => {
                // Parent span(s): olsr-instance
                debug_span!("link", local = %key.local_addr, remote = %key.remote_addr)
                    .in_scope(|| {
                        debug!("{}", self);
                    });
            }
            Debug::LinkStatusChange(key, old_status, new_status) => {
                // Parent span(s): olsr-instance
                debug_span!("link", local = %key.local_addr, remote = %key.remote_addr)
                    .in_scope(|| {
                        debug!(%old_status, %new_status, "{}", self);
                    });
            }
            Debug::LinkCostChange(key, cost) => {
                // Parent span(s): olsr-instance
                debug_span!("link", local = %key.local_addr, remote = %key.remote_addr)
                    .in_scope(|| {
                        debug!(%cost, "{}", self);
                    });
            }
            Debug::NeighborCreate(addr)
            | Debug::NeighborDelete(addr)
            | Debug::TwoHopNeighborCreate(addr)
            | Debug::TwoHopNeighborDelete(addr)
            | Debug::MprSelectorAdd(addr)
            | Debug::MprSelectorDelete(addr) => {
                // Parent span(s): olsr-instance
                debug_span!("neighbor", address = %addr).in_scope(|| {
                    debug!("{}", self);
                });
            }
            Debug::NeighborStatusChange(addr, old_status, new_status) => {
                // Parent span(s): olsr-instance
                debug_span!("neighbor", address = %addr).in_scope(|| {
                    debug!(%old_status, %new_status, "{}", self);
                });
            }
            Debug::NeighborWillingnessChange(addr, old, new) => {
                // Parent span(s): olsr-instance
                debug_span!("neighbor", address = %addr).in_scope(|| {
                    debug!(%old, %new, "{}", self);
                });
            }
            Debug::MprChange(addr, is_mpr) => {
                // Parent span(s): olsr-instance
                debug_span!("neighbor", address = %addr).in_scope(|| {
                    debug!(%is_mpr, "{}", self);
                });
            }
            Debug::MprCoverageShortfall(addr, required, coverage) => {
                // Parent span(s): olsr-instance
                debug!(two_hop = %addr, %required, %coverage, "{}", self);
            }
            Debug::AliasCreate(alias, main_addr)
            | Debug::AliasDelete(alias, main_addr) => {
                // Parent span(s): olsr-instance
                debug!(%alias, %main_addr, "{}", self);
            }
            Debug::AnsnChange(ansn) => {
                // Parent span(s): olsr-instance
                debug!(%ansn, "{}", self);
            }
            Debug::TopologyNodeCreate(originator)
            | Debug::TopologyNodeDelete(originator)
            | Debug::TcExpire(originator) => {
                // Parent span(s): olsr-instance
                debug!(%originator, "{}", self);
            }
            Debug::TcStale(originator, ansn, last_ansn) => {
                // Parent span(s): olsr-instance
                debug!(%originator, %ansn, %last_ansn, "{}", self);
            }
            Debug::HnaPrefixAdd(originator, prefix)
            | Debug::HnaPrefixDelete(originator, prefix) => {
                // Parent span(s): olsr-instance
                debug!(%originator, %prefix, "{}", self);
            }
            Debug::SpfRun(nodes) => {
                // Parent span(s): olsr-instance
                debug!(%nodes, "{}", self);
            }
            Debug::RouteAdd(route)
            | Debug::RouteChange(route)
            | Debug::RouteDelete(route) => {
                // Parent span(s): olsr-instance
                debug_span!("route", prefix = %route.prefix).in_scope(|| {
                    debug!(
                        nexthop = %route.nexthop,
                        interface = %route.ifname,
                        cost = %route.cost,
                        hops = %route.hops,
                        "{}", self
                    );
                });
            }
        }
    }
}

impl std::fmt::Display for Debug<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Debug::InstanceStart(..) => {
                write!(f, "starting instance")
            }
            Debug::InterfaceCreate(..) => {
                write!(f, "interface created")
            }
            Debug::InterfaceDown(..) => {
                write!(f, "interface down")
            }
            Debug::PacketRx(..) => {
                write!(f, "packet")
            }
            Debug::PacketTx(..) => {
                write!(f, "packet")
            }
            Debug::MessageDiscard(..) => {
                write!(f, "message discarded")
            }
            Debug::MessageForward(..) => {
                write!(f, "message forwarded")
            }
            Debug::LinkCreate(..) => {
                write!(f, "link created")
            }
            Debug::LinkDelete(..) => {
                write!(f, "link deleted")
            }
            Debug::LinkStatusChange(..) => {
                write!(f, "link status change")
            }
            Debug::LinkCostChange(..) => {
                write!(f, "link cost change")
            }
            Debug::LinkHelloMissed(..) => {
                write!(f, "missed HELLO message")
            }
            Debug::NeighborCreate(..) => {
                write!(f, "neighbor created")
            }
            Debug::NeighborDelete(..) => {
                write!(f, "neighbor deleted")
            }
            Debug::NeighborStatusChange(..) => {
                write!(f, "neighbor status change")
            }
            Debug::NeighborWillingnessChange(..) => {
                write!(f, "neighbor willingness change")
            }
            Debug::TwoHopNeighborCreate(..) => {
                write!(f, "two-hop neighbor created")
            }
            Debug::TwoHopNeighborDelete(..) => {
                write!(f, "two-hop neighbor deleted")
            }
            Debug::MprChange(..) => {
                write!(f, "MPR status change")
            }
            Debug::MprCoverageShortfall(..) => {
                write!(f, "two-hop neighbor can't be covered as required")
            }
            Debug::MprSelectorAdd(..) => {
                write!(f, "MPR selector added")
            }
            Debug::MprSelectorDelete(..) => {
                write!(f, "MPR selector deleted")
            }
            Debug::AliasCreate(..) => {
                write!(f, "interface alias created")
            }
            Debug::AliasDelete(..) => {
                write!(f, "interface alias deleted")
            }
            Debug::AnsnChange(..) => {
                write!(f, "advertised neighbor set changed")
            }
            Debug::TopologyNodeCreate(..) => {
                write!(f, "topology node created")
            }
            Debug::TopologyNodeDelete(..) => {
                write!(f, "topology node deleted")
            }
            Debug::TcStale(..) => {
                write!(f, "ignoring out-of-date TC message")
            }
            Debug::TcExpire(..) => {
                write!(f, "topology information expired")
            }
            Debug::HnaPrefixAdd(..) => {
                write!(f, "HNA prefix added")
            }
            Debug::HnaPrefixDelete(..) => {
                write!(f, "HNA prefix deleted")
            }
            Debug::SpfRun(..) => {
                write!(f, "route computation")
            }
            Debug::RouteAdd(..) => {
                write!(f, "route added")
            }
            Debug::RouteChange(..) => {
                write!(f, "route changed")
            }
            Debug::RouteDelete(..) => {
                write!(f, "route deleted")
            }
        }
    }
}

// ===== impl DiscardReason =====

impl std::fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscardReason::SelfOriginated => {
                write!(f, "self-originated")
            }
            DiscardReason::TtlExpired => {
                write!(f, "TTL expired")
            }
            DiscardReason::SenderNotSymmetric => {
                write!(f, "sender isn't a symmetric neighbor")
            }
            DiscardReason::Duplicate => {
                write!(f, "duplicate")
            }
            DiscardReason::UnexpectedType => {
                write!(f, "unexpected message type")
            }
        }
    }
}

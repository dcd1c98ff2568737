//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::IpAddr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::config::HysteresisCfg;
use crate::lq::{Cost, LinkQuality};
use crate::packet::LinkType;
use crate::seqno::SeqNo;

// A link is uniquely identified by the local and remote interface addresses.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub struct LinkKey {
    pub local_addr: IpAddr,
    pub remote_addr: IpAddr,
}

#[derive(Debug)]
pub struct Link<L: LinkQuality> {
    pub key: LinkKey,
    pub ifname: String,
    // Link holding deadlines. A deadline that is unset or in the past is
    // considered expired.
    pub sym_until: Option<Instant>,
    pub asym_until: Option<Instant>,
    pub expires_at: Instant,
    pub lost_until: Option<Instant>,
    pub hysteresis: Hysteresis,
    // Emission interval advertised by the neighbor, used to detect missed
    // HELLO messages.
    pub hello_interval: Duration,
    pub hello_deadline: Option<Instant>,
    // HELLOs found missing since the last received packet, already
    // accounted as lost.
    pub missed_hellos: u16,
    pub last_pkt_seqno: Option<SeqNo>,
    pub lq: L::LinkLq,
    pub cost: Cost,
    pub status: LinkStatus,
}

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub enum LinkStatus {
    Unspecified,
    Asymmetric,
    Symmetric,
    Lost,
}

// RFC 3626 link hysteresis state.
#[derive(Clone, Copy, Debug)]
pub struct Hysteresis {
    pub quality: f32,
    pub pending: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HysteresisTransition {
    None,
    Established,
    Dropped,
}

// ===== impl Link =====

impl<L> Link<L>
where
    L: LinkQuality,
{
    pub(crate) fn new(
        key: LinkKey,
        ifname: &str,
        now: Instant,
        validity: Duration,
        lq_model: &L,
        hyst_cfg: &HysteresisCfg,
    ) -> Link<L> {
        let lq = lq_model.link_lq_new();
        let cost = lq_model.link_cost(&lq);
        Link {
            key,
            ifname: ifname.to_owned(),
            sym_until: None,
            asym_until: None,
            expires_at: now + validity,
            lost_until: None,
            hysteresis: Hysteresis::new(hyst_cfg),
            hello_interval: Duration::ZERO,
            hello_deadline: None,
            missed_hellos: 0,
            last_pkt_seqno: None,
            lq,
            cost,
            status: LinkStatus::Unspecified,
        }
    }

    // Updates the link holding deadlines from a received HELLO (RFC 3626
    // Section 7.1.1).
    //
    // `listed` is the link type the neighbor advertised for our receiving
    // interface address, if any.
    pub(crate) fn sense(
        &mut self,
        now: Instant,
        validity: Duration,
        neighb_hold_time: Duration,
        listed: Option<LinkType>,
    ) {
        let asym_until = now + validity;
        self.asym_until = Some(asym_until);
        match listed {
            Some(LinkType::Lost) => {
                self.sym_until = None;
            }
            Some(LinkType::Sym) | Some(LinkType::Asym) => {
                let sym_until = now + validity;
                self.sym_until = Some(sym_until);
                self.expires_at = sym_until + neighb_hold_time;
            }
            Some(LinkType::Unspec) | None => (),
        }
        self.expires_at = self.expires_at.max(asym_until);
    }

    // Computes the link status at the given time (RFC 3626 Section 14.3).
    pub fn compute_status(&self, now: Instant) -> LinkStatus {
        let running = |deadline: Option<Instant>| {
            deadline.is_some_and(|deadline| deadline > now)
        };

        if running(self.lost_until) {
            LinkStatus::Lost
        } else if self.hysteresis.pending {
            LinkStatus::Unspecified
        } else if running(self.sym_until) {
            LinkStatus::Symmetric
        } else if running(self.asym_until) {
            LinkStatus::Asymmetric
        } else {
            LinkStatus::Lost
        }
    }

    // Accounts for a received or lost HELLO in the hysteresis state.
    pub(crate) fn hysteresis_update(
        &mut self,
        now: Instant,
        cfg: &HysteresisCfg,
        neighb_hold_time: Duration,
        received: bool,
    ) {
        if !cfg.enabled {
            return;
        }
        match self.hysteresis.update(cfg, received) {
            HysteresisTransition::Established => {
                self.lost_until = None;
            }
            HysteresisTransition::Dropped => {
                let lost_until = (now + neighb_hold_time).min(self.expires_at);
                self.lost_until = Some(lost_until);
            }
            HysteresisTransition::None => (),
        }
    }

    // Refreshes the cost of the link, returning whether it changed
    // relevantly.
    //
    // Irrelevant changes aren't stored, so slow drifts still add up to a
    // relevant change eventually.
    pub(crate) fn update_cost(&mut self, lq_model: &L) -> bool {
        let cost = lq_model.link_cost(&self.lq);
        if lq_model.is_relevant_change(self.cost, cost) {
            self.cost = cost;
            return true;
        }
        false
    }

    // Returns the link type to advertise for this link in HELLO messages.
    pub fn advertised_type(&self) -> LinkType {
        match self.status {
            LinkStatus::Unspecified => LinkType::Unspec,
            LinkStatus::Asymmetric => LinkType::Asym,
            LinkStatus::Symmetric => LinkType::Sym,
            LinkStatus::Lost => LinkType::Lost,
        }
    }

    pub fn is_symmetric(&self) -> bool {
        self.status == LinkStatus::Symmetric
    }
}

// ===== impl LinkStatus =====

impl std::fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkStatus::Unspecified => write!(f, "unspecified"),
            LinkStatus::Asymmetric => write!(f, "asymmetric"),
            LinkStatus::Symmetric => write!(f, "symmetric"),
            LinkStatus::Lost => write!(f, "lost"),
        }
    }
}

// ===== impl Hysteresis =====

impl Hysteresis {
    pub(crate) fn new(cfg: &HysteresisCfg) -> Hysteresis {
        // New links start as pending and must build up quality first.
        Hysteresis {
            quality: 0.0,
            pending: cfg.enabled,
        }
    }

    // Applies the RFC 3626 Section 14.1 quality update rule and checks the
    // thresholds. While the quality stays between the low and high
    // thresholds the pending flag never changes.
    pub fn update(
        &mut self,
        cfg: &HysteresisCfg,
        received: bool,
    ) -> HysteresisTransition {
        self.quality *= 1.0 - cfg.scaling;
        if received {
            self.quality += cfg.scaling;
        }

        if self.quality > cfg.thr_high && self.pending {
            self.pending = false;
            HysteresisTransition::Established
        } else if self.quality < cfg.thr_low && !self.pending {
            self.pending = true;
            HysteresisTransition::Dropped
        } else {
            HysteresisTransition::None
        }
    }
}

// ===== unit tests =====

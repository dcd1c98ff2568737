//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

#![allow(clippy::derivable_impls)]

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

use crate::packet::{AddressFamily, Vtime};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstanceCfg {
    pub main_addr: Option<IpAddr>,
    pub willingness: u8,
    pub lq_algorithm: LqAlgorithm,
    pub lq_window: u8,
    pub lq_ewma_alpha: f32,
    pub tc_redundancy: u8,
    pub mpr_coverage: u8,
    pub hysteresis: HysteresisCfg,
    pub default_route_hysteresis: f32,
    // Base scheduling interval, in milliseconds.
    pub poll_interval: u64,
    pub hello: MessageTimingCfg,
    pub tc: MessageTimingCfg,
    pub mid: MessageTimingCfg,
    pub hna: MessageTimingCfg,
    pub hna_prefixes: Vec<IpNetwork>,
    pub interfaces: Vec<InterfaceCfg>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LqAlgorithm {
    HopCount,
    EtxFf,
    EtxEwma,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct HysteresisCfg {
    pub enabled: bool,
    pub scaling: f32,
    pub thr_high: f32,
    pub thr_low: f32,
}

// Emission interval and advertised validity time of a message type, in
// seconds.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MessageTimingCfg {
    pub interval: f32,
    pub validity: f32,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct InterfaceCfg {
    pub name: String,
    pub address: IpAddr,
    // Destination of the outgoing packets. Defaults to the limited
    // broadcast address (IPv4) or to the OLSR multicast group (IPv6).
    #[serde(default)]
    pub broadcast: Option<IpAddr>,
    #[serde(default = "InterfaceCfg::default_mtu")]
    pub mtu: u16,
}

// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    NoInterfaces,
    DuplicateInterface(String),
    AddressFamilyMismatch(IpAddr),
    InvalidWillingness(u8),
    InvalidTcRedundancy(u8),
    InvalidMprCoverage(u8),
    InvalidLqWindow(u8),
    InvalidLqEwmaAlpha(f32),
    InvalidHysteresis,
    InvalidDefaultRouteHysteresis(f32),
    InvalidPollInterval(u64),
    InvalidMessageTiming(&'static str),
    InvalidMtu(String, u16),
}

// ===== impl InstanceCfg =====

impl InstanceCfg {
    pub const WILL_NEVER: u8 = 0;
    pub const WILL_LOW: u8 = 1;
    pub const WILL_DEFAULT: u8 = 3;
    pub const WILL_HIGH: u8 = 6;
    pub const WILL_ALWAYS: u8 = 7;

    // Validates the configuration, which is used as is afterwards.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let Some(first) = self.interfaces.first() else {
            return Err(ConfigError::NoInterfaces);
        };
        let af = AddressFamily::of(&self.main_addr.unwrap_or(first.address));
        for (i, iface) in self.interfaces.iter().enumerate() {
            if self.interfaces[..i].iter().any(|other| other.name == iface.name)
            {
                return Err(ConfigError::DuplicateInterface(
                    iface.name.clone(),
                ));
            }
            let addrs = std::iter::once(iface.address).chain(iface.broadcast);
            for addr in addrs {
                if AddressFamily::of(&addr) != af {
                    return Err(ConfigError::AddressFamilyMismatch(addr));
                }
            }
            if iface.mtu < InterfaceCfg::MIN_MTU {
                return Err(ConfigError::InvalidMtu(
                    iface.name.clone(),
                    iface.mtu,
                ));
            }
        }
        for prefix in &self.hna_prefixes {
            if AddressFamily::of(&prefix.ip()) != af {
                return Err(ConfigError::AddressFamilyMismatch(prefix.ip()));
            }
        }

        if self.willingness > Self::WILL_ALWAYS {
            return Err(ConfigError::InvalidWillingness(self.willingness));
        }
        if self.tc_redundancy > 2 {
            return Err(ConfigError::InvalidTcRedundancy(self.tc_redundancy));
        }
        if self.mpr_coverage == 0 || self.mpr_coverage > 7 {
            return Err(ConfigError::InvalidMprCoverage(self.mpr_coverage));
        }
        if self.lq_window == 0 || self.lq_window > 64 {
            return Err(ConfigError::InvalidLqWindow(self.lq_window));
        }
        if !(self.lq_ewma_alpha > 0.0 && self.lq_ewma_alpha <= 1.0) {
            return Err(ConfigError::InvalidLqEwmaAlpha(self.lq_ewma_alpha));
        }
        if self.hysteresis.enabled && !self.hysteresis.is_valid() {
            return Err(ConfigError::InvalidHysteresis);
        }
        if !(self.default_route_hysteresis >= 1.0) {
            return Err(ConfigError::InvalidDefaultRouteHysteresis(
                self.default_route_hysteresis,
            ));
        }
        if self.poll_interval == 0 {
            return Err(ConfigError::InvalidPollInterval(self.poll_interval));
        }
        for (name, timing) in [
            ("hello", &self.hello),
            ("tc", &self.tc),
            ("mid", &self.mid),
            ("hna", &self.hna),
        ] {
            if !timing.is_valid() {
                return Err(ConfigError::InvalidMessageTiming(name));
            }
        }

        Ok(())
    }

    // Returns the main address of the node, which defaults to the address
    // of the first interface.
    pub fn main_addr(&self) -> Option<IpAddr> {
        self.main_addr
            .or_else(|| self.interfaces.first().map(|iface| iface.address))
    }

    pub fn af(&self) -> AddressFamily {
        self.main_addr()
            .map(|addr| AddressFamily::of(&addr))
            .unwrap_or(AddressFamily::Ipv4)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval)
    }

    // NEIGHB_HOLD_TIME.
    pub fn neighb_hold_time(&self) -> Duration {
        self.hello.validity()
    }

    // TOP_HOLD_TIME.
    pub fn top_hold_time(&self) -> Duration {
        self.tc.validity()
    }
}

impl Default for InstanceCfg {
    fn default() -> InstanceCfg {
        InstanceCfg {
            main_addr: None,
            willingness: InstanceCfg::WILL_DEFAULT,
            lq_algorithm: LqAlgorithm::EtxFf,
            lq_window: 32,
            lq_ewma_alpha: 0.05,
            tc_redundancy: 2,
            mpr_coverage: 1,
            hysteresis: Default::default(),
            default_route_hysteresis: 1.0,
            poll_interval: 50,
            hello: MessageTimingCfg::new(2.0, 6.0),
            tc: MessageTimingCfg::new(5.0, 15.0),
            mid: MessageTimingCfg::new(5.0, 15.0),
            hna: MessageTimingCfg::new(5.0, 15.0),
            hna_prefixes: vec![],
            interfaces: vec![],
        }
    }
}

// ===== impl LqAlgorithm =====

impl std::fmt::Display for LqAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LqAlgorithm::HopCount => write!(f, "hop-count"),
            LqAlgorithm::EtxFf => write!(f, "etx-ff"),
            LqAlgorithm::EtxEwma => write!(f, "etx-ewma"),
        }
    }
}

// ===== impl HysteresisCfg =====

impl HysteresisCfg {
    fn is_valid(&self) -> bool {
        let unit = |value: f32| value > 0.0 && value < 1.0;
        unit(self.scaling)
            && unit(self.thr_high)
            && unit(self.thr_low)
            && self.thr_low < self.thr_high
    }
}

impl Default for HysteresisCfg {
    fn default() -> HysteresisCfg {
        HysteresisCfg {
            enabled: false,
            scaling: 0.5,
            thr_high: 0.8,
            thr_low: 0.3,
        }
    }
}

// ===== impl MessageTimingCfg =====

impl MessageTimingCfg {
    pub const fn new(interval: f32, validity: f32) -> MessageTimingCfg {
        MessageTimingCfg { interval, validity }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs_f32(self.interval)
    }

    pub fn validity(&self) -> Duration {
        Duration::from_secs_f32(self.validity)
    }

    // The validity time must fit in the 8-bit Vtime encoding.
    fn is_valid(&self) -> bool {
        self.interval > 0.0
            && self.validity >= self.interval
            && self.validity <= Vtime::MAX.as_secs_f32()
    }
}

// ===== impl InterfaceCfg =====

impl InterfaceCfg {
    pub const MIN_MTU: u16 = 256;

    fn default_mtu() -> u16 {
        1500
    }

    // Returns the destination address of outgoing packets.
    pub fn destination(&self) -> IpAddr {
        self.broadcast.unwrap_or(match self.address {
            IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::BROADCAST),
            IpAddr::V6(_) => IpAddr::V6(crate::network::ALL_OLSR_ROUTERS_V6),
        })
    }
}

// ===== impl ConfigError =====

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NoInterfaces => {
                write!(f, "no interfaces configured")
            }
            ConfigError::DuplicateInterface(name) => {
                write!(f, "duplicate interface: {name}")
            }
            ConfigError::AddressFamilyMismatch(addr) => {
                write!(f, "address family mismatch: {addr}")
            }
            ConfigError::InvalidWillingness(willingness) => {
                write!(f, "invalid willingness: {willingness}")
            }
            ConfigError::InvalidTcRedundancy(redundancy) => {
                write!(f, "invalid TC redundancy: {redundancy}")
            }
            ConfigError::InvalidMprCoverage(coverage) => {
                write!(f, "invalid MPR coverage: {coverage}")
            }
            ConfigError::InvalidLqWindow(window) => {
                write!(f, "invalid link quality window: {window}")
            }
            ConfigError::InvalidLqEwmaAlpha(alpha) => {
                write!(f, "invalid link quality aging factor: {alpha}")
            }
            ConfigError::InvalidHysteresis => {
                write!(f, "invalid hysteresis parameters")
            }
            ConfigError::InvalidDefaultRouteHysteresis(multiplier) => {
                write!(f, "invalid default route hysteresis: {multiplier}")
            }
            ConfigError::InvalidPollInterval(interval) => {
                write!(f, "invalid poll interval: {interval}")
            }
            ConfigError::InvalidMessageTiming(msg_type) => {
                write!(f, "invalid {msg_type} interval or validity time")
            }
            ConfigError::InvalidMtu(ifname, mtu) => {
                write!(f, "invalid MTU on interface {ifname}: {mtu}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ===== unit tests =====

#[cfg(test)]
mod tests {
    use std::net::Ipv6Addr;

    use super::*;

    fn config() -> InstanceCfg {
        InstanceCfg {
            interfaces: vec![InterfaceCfg {
                name: "eth0".to_owned(),
                address: "10.0.0.1".parse().unwrap(),
                broadcast: None,
                mtu: 1500,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn default_is_valid() {
        let config = config();
        assert!(config.validate().is_ok());
        assert_eq!(config.main_addr(), Some("10.0.0.1".parse().unwrap()));
        assert_eq!(
            config.interfaces[0].destination(),
            IpAddr::V4(Ipv4Addr::BROADCAST)
        );
    }

    #[test]
    fn invalid_values() {
        let mut config = config();
        config.willingness = 8;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWillingness(8))
        ));

        let mut config = self::config();
        config.hysteresis.enabled = true;
        config.hysteresis.thr_low = 0.9;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidHysteresis)
        ));

        let mut config = self::config();
        config.hna_prefixes = vec!["2001:db8::/32".parse().unwrap()];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::AddressFamilyMismatch(_))
        ));

        let config = InstanceCfg::default();
        assert!(matches!(config.validate(), Err(ConfigError::NoInterfaces)));
    }

    #[test]
    fn validity_time_bounds() {
        let mut config = config();
        config.tc = MessageTimingCfg::new(5.0, 3968.0);
        assert!(config.validate().is_ok());
        assert_eq!(config.tc.validity(), Vtime::MAX);

        config.tc = MessageTimingCfg::new(5.0, 4000.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMessageTiming("tc"))
        ));

        let mut config = self::config();
        config.hello = MessageTimingCfg::new(2.0, f32::INFINITY);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMessageTiming("hello"))
        ));
    }

    #[test]
    fn ipv6_destination() {
        let iface = InterfaceCfg {
            name: "wlan0".to_owned(),
            address: "fe80::1".parse().unwrap(),
            broadcast: None,
            mtu: 1500,
        };
        assert_eq!(
            iface.destination(),
            IpAddr::V6(Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 0x6d))
        );
    }
}

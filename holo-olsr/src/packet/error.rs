//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::IpAddr;

use bytes::TryGetError;
use serde::{Deserialize, Serialize};

// Type aliases.
pub type DecodeResult<T> = Result<T, DecodeError>;

// OLSR decode errors.
//
// Any of these errors causes the whole packet to be discarded. Messages
// decoded before the error are never partially applied.
#[derive(Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum DecodeError {
    IncompletePacket,
    InvalidPacketLength(u16),
    InvalidMessageSize(u16),
    InvalidLinkBlockSize(u16),
    InvalidBodyLength(u16),
    InvalidWillingness(u8),
    InvalidHnaPrefix(IpAddr, IpAddr),
    ReadOutOfBounds,
}

// ===== impl DecodeError =====

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::IncompletePacket => {
                write!(f, "incomplete packet")
            }
            DecodeError::InvalidPacketLength(len) => {
                write!(f, "invalid packet length: {len}")
            }
            DecodeError::InvalidMessageSize(size) => {
                write!(f, "invalid message size: {size}")
            }
            DecodeError::InvalidLinkBlockSize(size) => {
                write!(f, "invalid link message size: {size}")
            }
            DecodeError::InvalidBodyLength(len) => {
                write!(f, "invalid message body length: {len}")
            }
            DecodeError::InvalidWillingness(willingness) => {
                write!(f, "invalid willingness: {willingness}")
            }
            DecodeError::InvalidHnaPrefix(network, netmask) => {
                write!(f, "invalid HNA prefix: {network} netmask {netmask}")
            }
            DecodeError::ReadOutOfBounds => {
                write!(f, "attempt to read out of bounds")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<TryGetError> for DecodeError {
    fn from(_error: TryGetError) -> DecodeError {
        DecodeError::ReadOutOfBounds
    }
}

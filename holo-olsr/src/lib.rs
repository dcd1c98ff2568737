//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

#![cfg_attr(
    feature = "testing",
    allow(dead_code, unused_variables, unused_imports)
)]

pub mod alias;
pub mod config;
pub mod debug;
pub mod duplicate;
pub mod error;
pub mod events;
pub mod instance;
pub mod interface;
pub mod link;
pub mod lq;
pub mod mpr;
pub mod neighbor;
pub mod network;
pub mod output;
pub mod packet;
pub mod rib;
pub mod seqno;
pub mod southbound;
pub mod spf;
pub mod task;
pub mod tasks;
pub mod timer;
pub mod topology;
pub mod two_hop;

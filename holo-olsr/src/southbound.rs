//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use tokio::sync::mpsc::UnboundedSender;

use crate::rib::RibChange;

// Consumer of the routing table changes, usually a FIB synchronizer.
pub trait RouteSink: Send {
    fn apply(&mut self, change: &RibChange);
}

// ===== impl UnboundedSender =====

impl RouteSink for UnboundedSender<RibChange> {
    fn apply(&mut self, change: &RibChange) {
        // The receiving end might have been closed during shutdown.
        let _ = self.send(change.clone());
    }
}

//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tokio::net::UdpSocket;
use tokio::sync::mpsc::{self, Sender, UnboundedReceiver, UnboundedSender};
use tracing::{Instrument, debug_span};

use crate::error::Error;
use crate::instance::Instance;
use crate::lq::LinkQuality;
use crate::network;
use crate::packet::DecodeCxt;
use crate::task::Task;

//
// OLSR tasks diagram:
//
//                                 +--------------+
//                  net_rx (Nx) -> |              |
//                                 |   instance   | -> (Nx) net_tx
//                poll_interval -> |              |
//                                 +--------------+
//
// The instance is owned by the event loop. Timers are polled on every
// tick of the poll interval.
//

// OLSR inter-task message types.
pub mod messages {
    // Input messages (child task -> main task).
    pub mod input {
        use std::net::IpAddr;

        use derive_new::new;

        use crate::packet::{DecodeResult, Packet};

        #[derive(Debug, new)]
        pub struct NetRxPacketMsg {
            pub ifname: String,
            pub src: IpAddr,
            pub packet: DecodeResult<Packet>,
        }
    }

    // Output messages (main task -> child task).
    pub mod output {
        use std::net::IpAddr;

        use derive_new::new;
        use serde::Serialize;

        use crate::packet::Packet;

        #[derive(Debug, new, Serialize)]
        pub struct NetTxPacketMsg {
            pub dst: IpAddr,
            pub packet: Packet,
        }
    }
}

// Network tasks of an interface.
#[derive(Debug)]
struct InterfaceNet {
    _net_rx_task: Task<()>,
    _net_tx_task: Task<()>,
    net_txp: UnboundedSender<messages::output::NetTxPacketMsg>,
}

// Capacity of the channel carrying the received packets.
const NET_RX_CHANNEL_SIZE: usize = 64;

// ===== OLSR tasks =====

// Network Rx task.
pub(crate) fn net_rx(
    socket: &Arc<UdpSocket>,
    ifname: &str,
    cxt: DecodeCxt,
    net_rxp: &Sender<messages::input::NetRxPacketMsg>,
) -> Task<()> {
    #[cfg(not(feature = "testing"))]
    {
        let span1 = debug_span!("network");
        let _span1_guard = span1.enter();
        let span2 = debug_span!("input", interface = %ifname);
        let _span2_guard = span2.enter();

        let socket = socket.clone();
        let ifname = ifname.to_owned();
        let net_rxp = net_rxp.clone();
        Task::spawn_supervised(move || {
            let socket = socket.clone();
            let ifname = ifname.clone();
            let net_rxp = net_rxp.clone();
            async move {
                let _ = network::read_loop(socket, ifname, cxt, net_rxp).await;
            }
            .in_current_span()
        })
    }
    #[cfg(feature = "testing")]
    {
        let _ = (socket, ifname, cxt, net_rxp);
        Task::spawn(async move { std::future::pending().await })
    }
}

// Network Tx task.
pub(crate) fn net_tx(
    socket: &Arc<UdpSocket>,
    ifname: &str,
    net_txc: UnboundedReceiver<messages::output::NetTxPacketMsg>,
) -> Task<()> {
    let span1 = debug_span!("network");
    let _span1_guard = span1.enter();
    let span2 = debug_span!("output", interface = %ifname);
    let _span2_guard = span2.enter();

    let socket = socket.clone();
    Task::spawn(
        async move {
            network::write_loop(socket, net_txc).await;
        }
        .in_current_span(),
    )
}

// ===== global functions =====

// Runs the instance until the shutdown future completes.
//
// A socket is opened on every configured interface. Received packets are
// handed to the instance as they arrive, and the instance is ticked at
// the configured poll interval.
pub async fn run<L, F>(
    mut instance: Instance<L>,
    shutdown: F,
) -> Result<(), Error>
where
    L: LinkQuality,
    F: Future<Output = ()>,
{
    let span = debug_span!("olsr-instance");

    // Start the network tasks.
    let (net_rxp, mut net_rxc) = mpsc::channel(NET_RX_CHANNEL_SIZE);
    let mut net = BTreeMap::new();
    for iface in instance.interfaces.iter() {
        let _span_guard = span.enter();
        let socket = network::socket(&iface.config).map_err(|error| {
            Error::InterfaceStartError(iface.name.clone(), error)
        })?;
        let socket = Arc::new(socket);
        let (net_txp, net_txc) = mpsc::unbounded_channel();
        let net_rx_task =
            net_rx(&socket, &iface.name, instance.decode_cxt(), &net_rxp);
        let net_tx_task = net_tx(&socket, &iface.name, net_txc);
        net.insert(
            iface.name.clone(),
            InterfaceNet {
                _net_rx_task: net_rx_task,
                _net_tx_task: net_tx_task,
                net_txp,
            },
        );
    }

    // Main event loop.
    let mut poll_interval =
        tokio::time::interval(instance.config.poll_interval());
    tokio::pin!(shutdown);
    async move {
        loop {
            tokio::select! {
                _ = poll_interval.tick() => {
                    for output in instance.tick(Instant::now()) {
                        let Some(iface_net) = net.get(&output.ifname) else {
                            continue;
                        };
                        let msg = messages::output::NetTxPacketMsg::new(
                            output.dst,
                            output.packet,
                        );
                        let _ = iface_net.net_txp.send(msg);
                    }
                }
                Some(msg) = net_rxc.recv() => {
                    if let Err(error) = instance.process_packet(
                        Instant::now(),
                        &msg.ifname,
                        msg.src,
                        msg.packet,
                    ) {
                        error.log();
                    }
                }
                _ = &mut shutdown => {
                    break;
                }
            }
        }
    }
    .instrument(span)
    .await;

    Ok(())
}

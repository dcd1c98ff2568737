//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::mpsc::error::SendError;
use tokio::sync::mpsc::{Sender, UnboundedReceiver};

use crate::config::InterfaceCfg;
use crate::error::{Error, IoError};
use crate::packet::{DecodeCxt, Packet};
use crate::tasks::messages::input::NetRxPacketMsg;
use crate::tasks::messages::output::NetTxPacketMsg;

// OLSR UDP port (RFC 3626 Section 3.1).
pub const UDP_PORT: u16 = 698;

// Link-local multicast group used for flooding over IPv6.
pub const ALL_OLSR_ROUTERS_V6: Ipv6Addr =
    Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 0x6d);

// Maximum size of a received datagram.
const RX_BUF_SIZE: usize = 65535;

// ===== global functions =====

// Creates the OLSR socket of an interface.
//
// The socket is bound to the interface and to the wildcard address, so it
// receives the broadcast and multicast traffic sent on that link only.
pub(crate) fn socket(iface: &InterfaceCfg) -> Result<UdpSocket, IoError> {
    let domain = match iface.address {
        IpAddr::V4(_) => Domain::IPV4,
        IpAddr::V6(_) => Domain::IPV6,
    };
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))
        .map_err(IoError::UdpSocketError)?;
    socket
        .set_reuse_address(true)
        .map_err(IoError::UdpSocketError)?;
    socket
        .bind_device(Some(iface.name.as_bytes()))
        .map_err(IoError::UdpSocketError)?;

    let bind_addr = match iface.address {
        IpAddr::V4(_) => {
            socket.set_broadcast(true).map_err(IoError::UdpSocketError)?;
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        }
        IpAddr::V6(_) => {
            socket.set_only_v6(true).map_err(IoError::UdpSocketError)?;
            socket
                .set_multicast_loop_v6(false)
                .map_err(IoError::UdpSocketError)?;
            socket
                .join_multicast_v6(&ALL_OLSR_ROUTERS_V6, 0)
                .map_err(IoError::UdpMulticastJoinError)?;
            IpAddr::V6(Ipv6Addr::UNSPECIFIED)
        }
    };
    socket
        .bind(&SocketAddr::new(bind_addr, UDP_PORT).into())
        .map_err(IoError::UdpSocketError)?;
    socket
        .set_nonblocking(true)
        .map_err(IoError::UdpSocketError)?;

    UdpSocket::from_std(socket.into()).map_err(IoError::UdpSocketError)
}

pub(crate) async fn send_packet(
    socket: &UdpSocket,
    dst: IpAddr,
    packet: &Packet,
) -> Result<(), std::io::Error> {
    // Encode packet.
    let buf = packet.encode();

    // Send packet.
    socket.send_to(&buf, SocketAddr::new(dst, UDP_PORT)).await?;

    Ok(())
}

pub(crate) async fn write_loop(
    socket: Arc<UdpSocket>,
    mut net_txc: UnboundedReceiver<NetTxPacketMsg>,
) {
    while let Some(NetTxPacketMsg { dst, packet }) = net_txc.recv().await {
        if let Err(error) = send_packet(&socket, dst, &packet).await {
            IoError::UdpSendError(error).log();
        }
    }
}

pub(crate) async fn read_loop(
    socket: Arc<UdpSocket>,
    ifname: String,
    cxt: DecodeCxt,
    net_rxp: Sender<NetRxPacketMsg>,
) -> Result<(), SendError<NetRxPacketMsg>> {
    let mut buf = vec![0; RX_BUF_SIZE];

    loop {
        // Receive data from the network.
        let (num_bytes, src) = match socket.recv_from(&mut buf).await {
            Ok((num_bytes, src)) => (num_bytes, src),
            Err(error) => {
                IoError::UdpRecvError(error).log();
                continue;
            }
        };

        // Validate packet's source address.
        let src = src.ip();
        if src.is_unspecified() || src.is_multicast() {
            Error::UdpInvalidSourceAddr(src).log();
            continue;
        }

        // Decode packet.
        let packet = Packet::decode(&buf[0..num_bytes], &cxt);
        let msg = NetRxPacketMsg::new(ifname.clone(), src, packet);
        net_rxp.send(msg).await?;
    }
}

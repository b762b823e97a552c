// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Datagram transport used by the client.
//!
//! The orchestrator talks to servers through the [`Network`] and [`Transport`]
//! traits. [`UdpNetwork`] resolves hosts and opens blocking UDP sockets; tests
//! substitute an in-memory implementation.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::AddressFamily;

/// Receive buffer size; large enough for a header, extension fields and MAC.
pub const RECV_BUFFER_LEN: usize = 1024;

/// A connected datagram channel to one server.
pub trait Transport {
    /// The address requests are sent to.
    fn peer(&self) -> SocketAddr;

    /// Send one datagram.
    fn send(&mut self, datagram: &[u8]) -> io::Result<()>;

    /// Wait up to `timeout` for one datagram from the peer.
    ///
    /// Returns the number of bytes written to `buf`. Expiry of the timeout is
    /// reported as [`io::ErrorKind::TimedOut`].
    fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize>;
}

/// Opens transports to named hosts.
pub trait Network {
    /// The transport this network produces.
    type Transport: Transport;

    /// Resolve `host` and open a transport to it.
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        family: AddressFamily,
    ) -> io::Result<Self::Transport>;
}

/// Select the appropriate bind address based on the target address family.
///
/// Returns `0.0.0.0:0` for IPv4 targets and `[::]:0` for IPv6 targets.
pub(crate) fn bind_addr_for(target: &SocketAddr) -> SocketAddr {
    match target {
        SocketAddr::V4(_) => SocketAddr::from(([0, 0, 0, 0], 0)),
        SocketAddr::V6(_) => SocketAddr::from(([0u16; 8], 0)),
    }
}

/// Filter resolved addresses by family, keeping resolver order.
pub(crate) fn prefer_addresses(addrs: Vec<SocketAddr>, family: AddressFamily) -> Vec<SocketAddr> {
    match family {
        AddressFamily::Any => addrs,
        AddressFamily::V4 => addrs.into_iter().filter(SocketAddr::is_ipv4).collect(),
        AddressFamily::V6 => addrs.into_iter().filter(SocketAddr::is_ipv6).collect(),
    }
}

/// Blocking UDP network backed by the system resolver.
#[derive(Clone, Copy, Debug, Default)]
pub struct UdpNetwork;

impl Network for UdpNetwork {
    type Transport = UdpTransport;

    fn connect(
        &mut self,
        host: &str,
        port: u16,
        family: AddressFamily,
    ) -> io::Result<UdpTransport> {
        let resolved = prefer_addresses((host, port).to_socket_addrs()?.collect(), family);
        let Some(&peer) = resolved.first() else {
            return Err(io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "host resolved to no usable address",
            ));
        };

        let socket = UdpSocket::bind(bind_addr_for(&peer))?;
        debug!(host, %peer, local = ?socket.local_addr().ok(), "opened socket");
        Ok(UdpTransport {
            socket,
            peer,
            resolved,
        })
    }
}

/// A UDP socket aimed at one resolved server address.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    peer: SocketAddr,
    resolved: Vec<SocketAddr>,
}

impl UdpTransport {
    /// The local address the socket is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl Transport for UdpTransport {
    fn peer(&self) -> SocketAddr {
        self.peer
    }

    fn send(&mut self, datagram: &[u8]) -> io::Result<()> {
        let sent = self.socket.send_to(datagram, self.peer)?;
        debug!(peer = %self.peer, bytes = sent, "sent");
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(io::ErrorKind::TimedOut.into());
            }
            self.socket.set_read_timeout(Some(remaining))?;

            let (len, from) = match self.socket.recv_from(buf) {
                Ok(received) => received,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Err(io::ErrorKind::TimedOut.into());
                }
                Err(e) => return Err(e),
            };

            // Only the IP is compared; servers may answer from another port.
            if self.resolved.iter().any(|a| a.ip() == from.ip()) {
                debug!(peer = %from, bytes = len, "received");
                return Ok(len);
            }
            debug!(from = %from, "ignoring datagram from unexpected source");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addrs() -> Vec<SocketAddr> {
        vec![
            "192.0.2.1:123".parse().unwrap(),
            "[2001:db8::1]:123".parse().unwrap(),
            "192.0.2.2:123".parse().unwrap(),
        ]
    }

    #[test]
    fn test_bind_addr_for_v4() {
        let target: SocketAddr = "192.0.2.1:123".parse().unwrap();
        assert_eq!(bind_addr_for(&target), "0.0.0.0:0".parse().unwrap());
    }

    #[test]
    fn test_bind_addr_for_v6() {
        let target: SocketAddr = "[2001:db8::1]:123".parse().unwrap();
        assert_eq!(bind_addr_for(&target), "[::]:0".parse().unwrap());
    }

    #[test]
    fn test_prefer_addresses() {
        assert_eq!(prefer_addresses(addrs(), AddressFamily::Any), addrs());
        let v4 = prefer_addresses(addrs(), AddressFamily::V4);
        assert_eq!(v4.len(), 2);
        assert!(v4.iter().all(SocketAddr::is_ipv4));
        let v6 = prefer_addresses(addrs(), AddressFamily::V6);
        assert_eq!(v6, vec!["[2001:db8::1]:123".parse().unwrap()]);
    }

    #[test]
    fn test_connect_without_matching_family() {
        let err = UdpNetwork
            .connect("127.0.0.1", 123, AddressFamily::V6)
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AddrNotAvailable);
    }

    #[test]
    fn test_loopback_exchange() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = server.local_addr().unwrap().port();

        let mut transport = UdpNetwork
            .connect("127.0.0.1", port, AddressFamily::V4)
            .unwrap();
        transport.send(b"ping").unwrap();

        let mut buf = [0u8; 16];
        let (len, from) = server.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..len], b"ping");
        server.send_to(b"pong", from).unwrap();

        let mut reply = [0u8; RECV_BUFFER_LEN];
        let len = transport
            .recv(&mut reply, Duration::from_secs(5))
            .unwrap();
        assert_eq!(&reply[..len], b"pong");
    }

    #[test]
    fn test_recv_times_out() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = server.local_addr().unwrap().port();
        let mut transport = UdpNetwork
            .connect("127.0.0.1", port, AddressFamily::Any)
            .unwrap();

        let mut buf = [0u8; RECV_BUFFER_LEN];
        let err = transport
            .recv(&mut buf, Duration::from_millis(50))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }
}

//! Stop-and-wait RDP transport: thin helpers over a connected [`UdpSocket`]
//! that send the three packet kinds that ever cross the wire, plus a
//! timeout-bounded receive. Retransmission policy lives in the session state
//! machines (`session::client`, `session::server`), not here.

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use crate::wire::{Packet, PACKET_LEN};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const MAX_TIMEOUTS: u32 = 5;

pub struct RdpSocket {
    socket: UdpSocket,
}

impl RdpSocket {
    /// Binds an ephemeral socket and connects it to `peer`. One session owns
    /// one socket for its entire lifetime; nothing is shared across threads.
    /// Only useful when the caller already knows the exact address it will
    /// exchange datagrams with for the rest of the session (the server side:
    /// the listener hands the handler the client's address up front). The
    /// client side does not know this yet — see [`RdpSocket::unconnected`].
    pub fn bind_connected(peer: SocketAddr) -> io::Result<RdpSocket> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect(peer)?;
        socket.set_read_timeout(Some(DEFAULT_TIMEOUT))?;
        Ok(RdpSocket { socket })
    }

    /// Wraps an already-bound socket, connecting it to `peer`. Used by the
    /// server listener, which must bind before it knows who it is talking to.
    pub fn from_bound(socket: UdpSocket, peer: SocketAddr) -> io::Result<RdpSocket> {
        socket.connect(peer)?;
        socket.set_read_timeout(Some(DEFAULT_TIMEOUT))?;
        Ok(RdpSocket { socket })
    }

    /// Binds an ephemeral socket with no fixed peer. Used by the client,
    /// which sends its opening ACK to the server's well-known listening
    /// port but must learn the handler's ephemeral reply address from the
    /// first datagram it gets back (mirrors the source's `recvfrom`-and-
    /// latch-onto-the-reply-address handshake); call [`RdpSocket::connect`]
    /// once that address is known to settle into the steady-state exchange.
    pub fn unconnected() -> io::Result<RdpSocket> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_read_timeout(Some(DEFAULT_TIMEOUT))?;
        Ok(RdpSocket { socket })
    }

    /// Restricts an [`RdpSocket::unconnected`] socket to `peer` once its
    /// address has been learned. Subsequent `send`/`recv` calls no longer
    /// need to name a peer.
    pub fn connect(&self, peer: SocketAddr) -> io::Result<()> {
        self.socket.connect(peer)
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn send_ack(&self, seq: u32) -> io::Result<()> {
        self.send(&Packet::ack(seq))
    }

    pub fn send_error(&self, seq: u32) -> io::Result<()> {
        self.send(&Packet::error(seq))
    }

    pub fn send_data(&self, seq: u32, bytes: &[u8]) -> io::Result<()> {
        self.send(&Packet::data(seq, bytes))
    }

    pub fn send(&self, pkt: &Packet) -> io::Result<()> {
        let buf = pkt.encode();
        let written = self.socket.send(&buf)?;
        if written != PACKET_LEN {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "short write on datagram socket",
            ));
        }
        Ok(())
    }

    /// Sends to `addr` regardless of whether the socket is connected yet.
    /// Used only for the client's opening handshake ACK, before it has
    /// learned the server handler's actual reply address.
    pub fn send_to(&self, pkt: &Packet, addr: SocketAddr) -> io::Result<()> {
        let buf = pkt.encode();
        let written = self.socket.send_to(&buf, addr)?;
        if written != PACKET_LEN {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "short write on datagram socket",
            ));
        }
        Ok(())
    }

    /// Waits up to `timeout` for a datagram. Returns `Ok(None)` on a timeout,
    /// propagates any other I/O error. A zero-length or truncated datagram is
    /// treated as a timeout-equivalent retry signal rather than a decode
    /// error, since the wire codec itself never fails to decode.
    pub fn recv(&self, timeout: Duration) -> io::Result<Option<Packet>> {
        self.socket.set_read_timeout(Some(timeout))?;

        let mut buf = [0u8; PACKET_LEN];
        match self.socket.recv(&mut buf) {
            Ok(n) if n == PACKET_LEN => Ok(Some(Packet::decode(&buf))),
            Ok(_) => Ok(None),
            Err(e) if is_timeout(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Like [`RdpSocket::recv`] but also reports the datagram's source
    /// address. Used only before the client socket is connected, to learn
    /// the server handler's ephemeral address.
    pub fn recv_from(&self, timeout: Duration) -> io::Result<Option<(Packet, SocketAddr)>> {
        self.socket.set_read_timeout(Some(timeout))?;

        let mut buf = [0u8; PACKET_LEN];
        match self.socket.recv_from(&mut buf) {
            Ok((n, from)) if n == PACKET_LEN => Ok(Some((Packet::decode(&buf), from))),
            Ok(_) => Ok(None),
            Err(e) if is_timeout(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

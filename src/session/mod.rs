//! The paired client/server chunk-session state machines. Each session owns
//! one [`crate::transport::RdpSocket`] and drives it to completion on its own
//! thread; see `client` and `server` for the two halves of the protocol.

pub mod client;
pub mod server;

/// What to do with the previously-sent packet when a `recv` times out.
#[derive(Clone)]
pub(crate) enum LastSent {
    Ack(u32),
    Data(crate::wire::Packet),
}

impl LastSent {
    pub(crate) fn retransmit(&self, socket: &crate::transport::RdpSocket) -> std::io::Result<()> {
        match self {
            LastSent::Ack(seq) => socket.send_ack(*seq),
            LastSent::Data(pkt) => socket.send(pkt),
        }
    }
}

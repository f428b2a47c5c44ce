//! Client half of a single chunk session (§4.3). One instance retrieves file
//! bytes `[i*chunksize, (i+1)*chunksize)` from one server into a scratch
//! file named by its chunk index `i`.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;

use crate::error::Error;
use crate::session::LastSent;
use crate::transport::{RdpSocket, DEFAULT_TIMEOUT, MAX_TIMEOUTS};
use crate::wire::{Flag, Packet};

const FILENAME_FIELD_LEN: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClientState {
    Handshake,
    SendConnCount,
    SendOffset,
    RequestFirstData,
    Streaming,
    Done,
}

/// Runs the client side of one chunk session to completion, writing the
/// retrieved bytes to `scratch_path`. Returns `Ok(())` only once every DATA
/// packet for this chunk has been appended; any earlier failure leaves no
/// partial promise of success (the scratch file may still contain a partial
/// prefix on disk, but the caller is told to discard it).
pub fn run(
    peer: SocketAddr,
    filename: &str,
    conn_count: u32,
    chunk_index: u32,
    scratch_path: &Path,
) -> Result<(), Error> {
    let socket = RdpSocket::unconnected()?;

    let mut seqnum: u32 = 1;
    socket.send_to(&Packet::ack(seqnum), peer)?;

    // The listener answers from a fresh ephemeral socket (§4.6), not from
    // `peer` itself; latch onto whatever address the first reply actually
    // came from before settling into the connected steady-state exchange.
    let mut timeouts = 0u32;
    let server = loop {
        match socket.recv_from(DEFAULT_TIMEOUT)? {
            Some((pkt, from)) => {
                if pkt.flag == Flag::Error {
                    log::warn!("chunk {chunk_index}: peer {peer} reported an error");
                    return Err(Error::PeerError);
                }
                break from;
            }
            None => {
                timeouts += 1;
                if timeouts > MAX_TIMEOUTS {
                    log::warn!("chunk {chunk_index}: timed out waiting on {peer}");
                    return Err(Error::SessionTimedOut);
                }
                socket.send_to(&Packet::ack(seqnum), peer)?;
            }
        }
    };
    socket.connect(server)?;
    timeouts = 0;

    let mut last_sent = LastSent::Ack(seqnum);

    let mut state = ClientState::Handshake;
    let mut first_data_frame = true;
    let mut scratch_file: Option<File> = None;

    loop {
        let received = socket.recv(DEFAULT_TIMEOUT)?;

        let pkt = match received {
            Some(pkt) => pkt,
            None => {
                timeouts += 1;
                if timeouts > MAX_TIMEOUTS {
                    log::warn!("chunk {chunk_index}: timed out waiting on {peer}");
                    return Err(Error::SessionTimedOut);
                }
                last_sent.retransmit(&socket)?;
                continue;
            }
        };
        timeouts = 0;

        if pkt.flag == Flag::Error {
            log::warn!("chunk {chunk_index}: peer {peer} reported an error");
            return Err(Error::PeerError);
        }

        match state {
            ClientState::Handshake => {
                seqnum += 1;
                let mut name = filename.as_bytes();
                if name.len() > FILENAME_FIELD_LEN {
                    name = &name[..FILENAME_FIELD_LEN];
                }
                let pkt = crate::wire::Packet::data(seqnum, name);
                socket.send(&pkt)?;
                last_sent = LastSent::Data(pkt);
                state = ClientState::SendConnCount;
            }
            ClientState::SendConnCount => {
                seqnum += 1;
                let pkt = crate::wire::Packet::data(seqnum, conn_count.to_string().as_bytes());
                socket.send(&pkt)?;
                last_sent = LastSent::Data(pkt);
                state = ClientState::SendOffset;
            }
            ClientState::SendOffset => {
                seqnum += 1;
                let pkt = crate::wire::Packet::data(seqnum, chunk_index.to_string().as_bytes());
                socket.send(&pkt)?;
                last_sent = LastSent::Data(pkt);
                state = ClientState::RequestFirstData;
            }
            ClientState::RequestFirstData => {
                seqnum += 1;
                socket.send_ack(seqnum)?;
                last_sent = LastSent::Ack(seqnum);
                state = ClientState::Streaming;
            }
            ClientState::Streaming => {
                if pkt.flag == Flag::Data {
                    let bytes = pkt.data_str();

                    if first_data_frame {
                        scratch_file = Some(
                            OpenOptions::new()
                                .write(true)
                                .create(true)
                                .truncate(true)
                                .open(scratch_path)?,
                        );
                        first_data_frame = false;
                    }
                    let file = scratch_file
                        .as_mut()
                        .expect("scratch file opened on first data frame");
                    file.write_all(bytes)?;

                    seqnum += 1;
                    socket.send_ack(seqnum)?;
                    last_sent = LastSent::Ack(seqnum);
                } else {
                    state = ClientState::Done;
                }
            }
            ClientState::Done => unreachable!("loop exits before re-entering Done"),
        }

        if state == ClientState::Done {
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::Packet;
    use std::fs;
    use std::net::{Ipv4Addr, UdpSocket};
    use std::thread;
    use std::time::Duration;

    fn scratch_path(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("mftp-client-session-test-{tag}"));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir.join("0")
    }

    /// A minimal stand-in peer that drives the handshake far enough to
    /// exercise the client state machine without a full server session.
    fn fake_server(socket: UdpSocket, chunk: &'static [u8]) -> thread::JoinHandle<()> {
        thread::spawn(move || {
            socket.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
            let mut buf = [0u8; crate::wire::PACKET_LEN];

            // initial handshake ACK
            let (n, peer) = socket.recv_from(&mut buf).unwrap();
            assert_eq!(n, buf.len());
            socket.send_to(&Packet::ack(1).encode(), peer).unwrap();

            // filename DATA -> ack
            let (_, _) = socket.recv_from(&mut buf).unwrap();
            socket.send_to(&Packet::ack(2).encode(), peer).unwrap();

            // conn count DATA -> ack
            let (_, _) = socket.recv_from(&mut buf).unwrap();
            socket.send_to(&Packet::ack(3).encode(), peer).unwrap();

            // offset DATA -> ack
            let (_, _) = socket.recv_from(&mut buf).unwrap();
            socket.send_to(&Packet::ack(4).encode(), peer).unwrap();

            // request-first-data ACK -> send the whole chunk as one DATA frame
            let (_, _) = socket.recv_from(&mut buf).unwrap();
            socket
                .send_to(&Packet::data(5, chunk).encode(), peer)
                .unwrap();

            // final client ACK -> terminal ACK signals done
            let (_, _) = socket.recv_from(&mut buf).unwrap();
            socket.send_to(&Packet::ack(6).encode(), peer).unwrap();
        })
    }

    #[test]
    fn retrieves_a_single_frame_chunk() {
        let server_socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let server_addr = server_socket.local_addr().unwrap();
        let handle = fake_server(server_socket, b"hello chunk");

        let scratch = scratch_path("single-frame");
        run(server_addr, "hello.txt", 1, 0, &scratch).unwrap();

        handle.join().unwrap();
        assert_eq!(fs::read(&scratch).unwrap(), b"hello chunk");
    }

    #[test]
    fn peer_error_fails_the_session() {
        let server_socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let server_addr = server_socket.local_addr().unwrap();

        let handle = thread::spawn(move || {
            server_socket
                .set_read_timeout(Some(Duration::from_secs(2)))
                .unwrap();
            let mut buf = [0u8; crate::wire::PACKET_LEN];
            let (_, addr) = server_socket.recv_from(&mut buf).unwrap();
            server_socket
                .send_to(&Packet::error(1).encode(), addr)
                .unwrap();
        });

        let scratch = scratch_path("peer-error");
        let result = run(server_addr, "nope.txt", 1, 0, &scratch);

        handle.join().unwrap();
        assert!(matches!(result, Err(Error::PeerError)));
        assert!(!scratch.exists());
    }

    #[test]
    #[ignore = "takes the full 30s (6 x 5s) retransmission budget to fail"]
    fn dead_peer_times_out_and_fails_within_30s() {
        // A bound-but-silent socket: the client's sends succeed, nothing
        // ever answers, so every recv() times out.
        let dead = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let dead_addr = dead.local_addr().unwrap();

        let scratch = scratch_path("timeout");
        let start = std::time::Instant::now();
        let result = run(dead_addr, "hello.txt", 1, 0, &scratch);

        assert!(matches!(result, Err(Error::SessionTimedOut)));
        assert!(start.elapsed() <= Duration::from_secs(31));
        drop(dead);
    }
}

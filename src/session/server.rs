//! Server half of a single chunk session (§4.4). One instance streams file
//! bytes `[offset*chunksize, offset*chunksize + chunksize]` to one client.

use std::fs::File;
use std::net::{SocketAddr, UdpSocket};
use std::path::Path;

use crate::error::Error;
use crate::fileio;
use crate::session::LastSent;
use crate::transport::{RdpSocket, DEFAULT_TIMEOUT, MAX_TIMEOUTS};

const READ_STRIDE: usize = 1023;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServerState {
    AwaitFilename,
    AwaitConnCount,
    AwaitOffset,
    Streaming,
    Finishing,
    Done,
}

/// Runs the server side of one chunk session to completion, serving files
/// out of `working_dir`. The caller has already accepted the client's
/// handshake datagram and handed us its address; we bind our own ephemeral
/// socket, announce it, and drive the rest of the exchange.
pub fn run(client: SocketAddr, working_dir: &Path) -> Result<(), Error> {
    let bound = UdpSocket::bind("0.0.0.0:0")?;
    let socket = RdpSocket::from_bound(bound, client)?;

    socket.send_ack(1)?;
    let mut last_sent = LastSent::Ack(1);

    let mut state = ServerState::AwaitFilename;
    let mut file: Option<File> = None;
    let mut chunksize: u64 = 0;
    let mut offset: u64 = 0;
    let mut bytes_sent: u64 = 0;
    let mut timeouts = 0u32;

    loop {
        let received = socket.recv(DEFAULT_TIMEOUT)?;

        let pkt = match received {
            Some(pkt) => pkt,
            None => {
                timeouts += 1;
                if timeouts > MAX_TIMEOUTS {
                    log::warn!("session with {client} timed out");
                    return Err(Error::SessionTimedOut);
                }
                last_sent.retransmit(&socket)?;
                continue;
            }
        };
        timeouts = 0;

        match state {
            ServerState::AwaitFilename => {
                let name = String::from_utf8_lossy(pkt.data_str()).into_owned();
                match fileio::locate(working_dir, &name) {
                    Ok(Some(path)) => {
                        file = Some(File::open(path)?);
                        socket.send_ack(pkt.seq)?;
                        last_sent = LastSent::Ack(pkt.seq);
                        state = ServerState::AwaitConnCount;
                    }
                    Ok(None) => {
                        log::warn!("file not found: {name:?}, requested by {client}");
                        socket.send_error(pkt.seq)?;
                        return Err(Error::FileNotFound);
                    }
                    Err(e) => {
                        socket.send_error(pkt.seq)?;
                        return Err(e.into());
                    }
                }
            }
            ServerState::AwaitConnCount => {
                let text = String::from_utf8_lossy(pkt.data_str()).into_owned();
                let conn_count: u64 = match parse_leading_int(&text) {
                    Some(n) if n > 0 => n,
                    _ => {
                        log::warn!("invalid connection count {text:?} from {client}");
                        socket.send_error(pkt.seq)?;
                        return Err(Error::InvalidConnCount(text));
                    }
                };

                let filesize = fileio::file_size(file.as_ref().expect("file set in AwaitFilename"))?;
                chunksize = filesize / conn_count;
                socket.send_ack(pkt.seq)?;
                last_sent = LastSent::Ack(pkt.seq);
                state = ServerState::AwaitOffset;
            }
            ServerState::AwaitOffset => {
                let text = String::from_utf8_lossy(pkt.data_str()).into_owned();
                offset = match parse_leading_int(&text) {
                    Some(n) => n,
                    None => {
                        log::warn!("invalid offset {text:?} from {client}");
                        socket.send_error(pkt.seq)?;
                        return Err(Error::InvalidConnCount(text));
                    }
                };
                bytes_sent = 0;
                socket.send_ack(pkt.seq)?;
                last_sent = LastSent::Ack(pkt.seq);
                state = ServerState::Streaming;
            }
            ServerState::Streaming => {
                if bytes_sent <= chunksize {
                    let file = file.as_mut().expect("file set in AwaitFilename");
                    let position = chunksize * offset + bytes_sent;
                    let slice = fileio::read_chunk(file, position, READ_STRIDE)?;

                    let data_pkt = crate::wire::Packet::data(pkt.seq, &slice);
                    socket.send(&data_pkt)?;
                    last_sent = LastSent::Data(data_pkt);
                    // Fixed stride regardless of how many bytes were actually
                    // read; preserved from the source (§9 open question #1).
                    bytes_sent += READ_STRIDE as u64;
                } else {
                    state = ServerState::Finishing;
                }
            }
            ServerState::Finishing => {
                socket.send_ack(pkt.seq)?;
                last_sent = LastSent::Ack(pkt.seq);
                state = ServerState::Done;
            }
            ServerState::Done => unreachable!("loop exits before re-entering Done"),
        }

        if state == ServerState::Done {
            break;
        }
    }

    Ok(())
}

/// Parses the leading run of ASCII digits in `s`, mirroring the source's use
/// of `strtol`, which stops at the first non-digit rather than rejecting the
/// whole string. Returns `None` if there is no leading digit at all.
fn parse_leading_int(s: &str) -> Option<u64> {
    let digits: String = s.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

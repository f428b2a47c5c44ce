//! Server listener (§4.6): a single well-known socket accepts one
//! session-initiation datagram per client, then hands the client off to a
//! freshly bound ephemeral session socket on its own thread.

use std::net::UdpSocket;
use std::path::{Path, PathBuf};
use std::thread;

use crate::error::Error;
use crate::session::server;

/// Binds `0.0.0.0:port` and serves forever, spawning one detached thread per
/// incoming client. Never returns under normal operation; only a bind
/// failure is reported to the caller.
pub fn serve(port: u16, working_dir: &Path) -> Result<(), Error> {
    let socket = UdpSocket::bind(("0.0.0.0", port)).map_err(|source| Error::BindFailed {
        label: "listener",
        port,
        source,
    })?;
    log::info!("listening on port {port}, serving files from {}", working_dir.display());

    let mut buf = [0u8; crate::wire::PACKET_LEN];
    loop {
        let (_, client) = match socket.recv_from(&mut buf) {
            Ok(pair) => pair,
            Err(e) => {
                log::warn!("failed to receive on listener socket: {e}");
                continue;
            }
        };

        log::info!("accepted session request from {client}");
        let working_dir: PathBuf = working_dir.to_path_buf();
        thread::spawn(move || match server::run(client, &working_dir) {
            Ok(()) => log::info!("session with {client} completed"),
            Err(e) => log::warn!("session with {client} failed: {e}"),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn bind_failure_is_reported_not_panicked() {
        let hog = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let port = hog.local_addr().unwrap().port();

        let dir = std::env::temp_dir();
        let result = serve(port, &dir);
        assert!(matches!(result, Err(Error::BindFailed { .. })));
    }
}

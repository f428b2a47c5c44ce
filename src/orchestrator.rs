//! Client-side fan-out orchestrator (§4.5): assigns one chunk session per
//! cooperating server, repairs any session that failed by retrying it
//! against a server that is known to be reachable, then reassembles the
//! scratch files into the final output file.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::thread;

use crate::error::Error;
use crate::serverdir::{self, ServerEntry};
use crate::session::client;

/// Retrieves `filename` from the servers listed in `server_list_path`,
/// splitting it into `conn_count` chunks, and writes the reassembled result
/// to `filename` in the current directory.
pub fn retrieve(filename: &str, conn_count: u32, server_list_path: &Path) -> Result<(), Error> {
    let servers = serverdir::parse(server_list_path)?;
    if servers.is_empty() {
        return Err(Error::EmptyServerList);
    }

    let scratch_dir = make_scratch_dir(filename)?;
    let result = run_phases(filename, conn_count, &servers, &scratch_dir);
    let _ = fs::remove_dir_all(&scratch_dir);
    result
}

fn run_phases(
    filename: &str,
    conn_count: u32,
    servers: &[ServerEntry],
    scratch_dir: &Path,
) -> Result<(), Error> {
    let assigned = assign_servers(servers, conn_count);
    if assigned.is_empty() {
        log::error!("all servers in the list failed");
        return Err(Error::AllServersFailed);
    }
    let v = assigned.len() as u32;

    // Phase A: fan out one session per assigned server, then join all of them.
    let mut outcomes = phase_a(filename, conn_count, &assigned, scratch_dir);

    // Phase B: repair any failed session against a known-good server.
    phase_b(filename, conn_count, &assigned, scratch_dir, &mut outcomes);

    if outcomes.iter().all(|r| r.is_err()) {
        return Err(Error::AllServersFailed);
    }

    // Phase C: reassemble scratch files in chunk order into the output file.
    reassemble(filename, v, scratch_dir)
}

/// Round-robins chunk indices `0..N` across the server list in file order,
/// stopping once every index has an assignee or the list runs out.
fn assign_servers(servers: &[ServerEntry], conn_count: u32) -> Vec<ServerEntry> {
    servers
        .iter()
        .copied()
        .take(conn_count as usize)
        .collect()
}

fn phase_a(
    filename: &str,
    conn_count: u32,
    assigned: &[ServerEntry],
    scratch_dir: &Path,
) -> Vec<Result<(), Error>> {
    let handles: Vec<_> = assigned
        .iter()
        .enumerate()
        .map(|(index, &(ip, port))| {
            let filename = filename.to_string();
            let scratch_path = scratch_path_for(scratch_dir, index as u32);
            let peer = SocketAddr::from((ip, port));

            thread::spawn(move || client::run(peer, &filename, conn_count, index as u32, &scratch_path))
        })
        .collect();

    handles
        .into_iter()
        .map(|h| h.join().unwrap_or(Err(Error::SessionTimedOut)))
        .collect()
}

fn phase_b(
    filename: &str,
    conn_count: u32,
    assigned: &[ServerEntry],
    scratch_dir: &Path,
    outcomes: &mut [Result<(), Error>],
) {
    let good_server = (0..assigned.len())
        .find(|&i| scratch_path_for(scratch_dir, i as u32).exists())
        .map(|i| assigned[i]);

    let Some((good_ip, good_port)) = good_server else {
        log::warn!("no session produced output; skipping repair phase");
        return;
    };

    for (index, outcome) in outcomes.iter_mut().enumerate() {
        if outcome.is_ok() {
            continue;
        }

        log::info!("retrying chunk {index} against known-good server {good_ip}:{good_port}");
        let scratch_path = scratch_path_for(scratch_dir, index as u32);
        let peer = SocketAddr::from((good_ip, good_port));
        *outcome = client::run(peer, filename, conn_count, index as u32, &scratch_path);
    }
}

fn reassemble(filename: &str, chunk_count: u32, scratch_dir: &Path) -> Result<(), Error> {
    for i in 0..chunk_count {
        let scratch_path = scratch_path_for(scratch_dir, i);
        if !scratch_path.exists() {
            log::warn!("chunk {i} produced no output after repair; output will be incomplete");
            continue;
        }

        let mut out = if i == 0 {
            File::create(filename)?
        } else {
            OpenOptions::new().append(true).open(filename)?
        };
        let mut chunk = File::open(&scratch_path)?;
        io::copy(&mut chunk, &mut out)?;
        drop(chunk);

        let _ = fs::remove_file(&scratch_path);
    }

    // Preserved quirk (§9 open question #3): the source unconditionally
    // appends a trailing newline to the assembled file.
    let mut out = OpenOptions::new().append(true).open(filename)?;
    use std::io::Write;
    out.write_all(b"\n")?;

    Ok(())
}

fn scratch_path_for(scratch_dir: &Path, index: u32) -> PathBuf {
    scratch_dir.join(index.to_string())
}

fn make_scratch_dir(filename: &str) -> io::Result<PathBuf> {
    let dir = std::env::current_dir()?.join(format!(".{filename}.mftp-scratch"));
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

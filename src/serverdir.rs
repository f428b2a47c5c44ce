//! Parses the client's `server-info.txt` directory file: one cooperating
//! server per line, `<dotted-quad-ip> <port>`. Malformed lines are logged and
//! skipped rather than treated as fatal, matching the source's behavior.

use std::net::Ipv4Addr;
use std::path::Path;

pub type ServerEntry = (Ipv4Addr, u16);

pub fn parse(path: &Path) -> std::io::Result<Vec<ServerEntry>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(parse_str(&contents))
}

fn parse_str(contents: &str) -> Vec<ServerEntry> {
    let mut servers = Vec::new();

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_line(line) {
            Some(entry) => servers.push(entry),
            None => log::warn!("invalid line in server-info.txt, disregarding: {line:?}"),
        }
    }

    servers
}

fn parse_line(line: &str) -> Option<ServerEntry> {
    let mut tokens = line.split_whitespace();
    let ip_tok = tokens.next()?;
    let port_tok = tokens.next()?;
    if tokens.next().is_some() {
        return None;
    }

    let ip: Ipv4Addr = ip_tok.parse().ok()?;
    let port: u16 = port_tok.parse().ok()?;
    Some((ip, port))
}

use std::fs;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::path::Path;

use spore_common::Result;
use tracing::{info, warn};

/// Stdout filter when `RUST_LOG` is unset. Targets are crate names with underscores.
pub const DEFAULT_LOG_FILTER: &str = "info,spore_node=debug,spore_consensus=debug,spore_ledger=debug";

/// Appends `:default_port` when `entry` has no port.
pub fn with_default_port(entry: &str, default_port: u16) -> String {
    let entry = entry.trim();
    match entry.rsplit_once(':') {
        Some((_, port)) if port.parse::<u16>().is_ok() => entry.to_string(),
        _ => format!("{}:{}", entry, default_port),
    }
}

fn split_host(address: &str) -> (&str, Option<&str>) {
    match address.rsplit_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (address, None),
    }
}

fn is_loopback_host(host: &str) -> bool {
    host.eq_ignore_ascii_case("localhost") || host.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
}

/// Replaces a `localhost`/`127.x` host in `entry` with the host this node advertises.
///
/// A peer reached through loopback would otherwise be registered under an
/// alias that never matches the address it signs its votes with.
pub fn rewrite_loopback(entry: &str, advertised: &str) -> String {
    let (host, port) = split_host(entry);
    if !is_loopback_host(host) {
        return entry.to_string();
    }
    let (own_host, _) = split_host(advertised);
    match port {
        Some(port) => format!("{}:{}", own_host, port),
        None => own_host.to_string(),
    }
}

/// Reads one `host[:port]` per line. Blank lines and `#` comments are skipped.
///
/// A missing file yields an empty list.
pub fn read_peer_file(path: &Path, default_port: u16) -> Result<Vec<String>> {
    if !path.exists() {
        info!("peer file {} not found, no bootstrap peers from it", path.display());
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)?;
    let peers: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| with_default_port(line, default_port))
        .collect();
    info!("📒 {} bootstrap peers from {}", peers.len(), path.display());
    Ok(peers)
}

/// First line of the password file, or `None` when the file is absent or empty.
pub fn read_password_file(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .next()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty()))
}

/// Outbound interface address, found by "connecting" a UDP socket.
///
/// No packet is sent. Falls back to loopback without a route.
pub fn local_ip() -> IpAddr {
    let detected = UdpSocket::bind("0.0.0.0:0")
        .and_then(|socket| {
            socket.connect("8.8.8.8:80")?;
            socket.local_addr()
        })
        .map(|addr| addr.ip());
    match detected {
        Ok(ip) if !ip.is_unspecified() => ip,
        Ok(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
        Err(e) => {
            warn!("could not detect local ip, using loopback: {}", e);
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}

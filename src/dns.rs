//! DNS settings and the resolver probe behind the "Activate DNS" button.
//!
//! The probe asks the configured server alone for the A records of
//! [`PROBE_NAME`] and accepts it once one comes back. UDP is tried first,
//! TCP when the answer is truncated.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::assets;
use crate::config::{load_json_or_bundled, save_json};
use crate::error::{Result, ShrineError};

pub const PROBE_NAME: &str = "google.com";
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Contents of `dns_config.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsConfig {
    pub dns_active: bool,
    pub dns_server: String,
    pub dns_label: String,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            dns_active: false,
            dns_server: "1.1.1.1".to_string(),
            dns_label: "Cloudflare".to_string(),
        }
    }
}

impl DnsConfig {
    pub fn load(path: &Path) -> Result<Self> {
        load_json_or_bundled(path, assets::DNS_CONFIG)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_json(path, self)
    }

    /// Switches to a user-entered server and persists the change
    pub fn set_custom_server(&mut self, server: &str, path: &Path) -> Result<()> {
        let server = server.trim();
        parse_server(server)?;
        self.dns_server = server.to_string();
        self.dns_label = "Custom".to_string();
        self.save(path)
    }
}

/// Accepts `1.1.1.1`, `1.1.1.1:5353`, `2606:4700::1111` or `[::1]:53`
pub fn parse_server(server: &str) -> Result<SocketAddr> {
    let server = server.trim();
    if let Ok(addr) = server.parse::<SocketAddr>() {
        return Ok(addr);
    }
    server
        .parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, 53))
        .map_err(|_| ShrineError::Dns(format!("not an IP address: {server}")))
}

/// Checks that `server` resolves [`PROBE_NAME`]
pub async fn probe(server: &str) -> Result<Ipv4Addr> {
    probe_addr(parse_server(server)?, PROBE_TIMEOUT).await
}

/// A resolver that talks to `addr` only, skipping the system configuration
fn resolver_for(addr: SocketAddr, timeout: Duration) -> TokioAsyncResolver {
    let servers = NameServerConfigGroup::from_ips_clear(&[addr.ip()], addr.port(), true);
    let config = ResolverConfig::from_parts(None, Vec::new(), servers);
    let mut opts = ResolverOpts::default();
    opts.timeout = timeout;
    opts.attempts = 1;
    opts.cache_size = 0;
    TokioAsyncResolver::tokio(config, opts)
}

pub async fn probe_addr(addr: SocketAddr, timeout: Duration) -> Result<Ipv4Addr> {
    let resolver = resolver_for(addr, timeout);
    debug!(%addr, name = PROBE_NAME, "dns probe sent");

    let lookup = tokio::time::timeout(timeout, resolver.ipv4_lookup(PROBE_NAME))
        .await
        .map_err(|_| ShrineError::Timeout(timeout.as_secs()))?
        .map_err(|e| ShrineError::Dns(e.to_string()))?;
    let ip = lookup
        .iter()
        .next()
        .map(|a| a.0)
        .ok_or_else(|| ShrineError::Dns(format!("no A record for {PROBE_NAME}")))?;
    info!(%addr, %ip, "dns probe answered");
    Ok(ip)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::UdpSocket;

    /// Answers one query the way a resolver would: the question echoed
    /// back, then an A record for the question name. `rcode` other than 0
    /// sends no records.
    fn answer(query: &[u8], rcode: u16, ip: [u8; 4]) -> Vec<u8> {
        let mut end = 12;
        while query[end] != 0 {
            end += 1 + query[end] as usize;
        }
        let mut out = query[..end + 5].to_vec();
        out[2..4].copy_from_slice(&(0x8180u16 | rcode).to_be_bytes());
        out[4..6].copy_from_slice(&1u16.to_be_bytes());
        let answers: u16 = if rcode == 0 { 1 } else { 0 };
        out[6..8].copy_from_slice(&answers.to_be_bytes());
        out[8..12].copy_from_slice(&[0; 4]);
        if rcode == 0 {
            out.extend_from_slice(&[0xC0, 0x0C, 0, 1, 0, 1, 0, 0, 0, 60, 0, 4]);
            out.extend_from_slice(&ip);
        }
        out
    }

    /// A one-shot resolver on localhost replying with `rcode` and `ip`
    async fn local_resolver(rcode: u16, ip: [u8; 4]) -> SocketAddr {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = [0u8; 512];
            let (len, peer) = server.recv_from(&mut buf).await.unwrap();
            let reply = answer(&buf[..len], rcode, ip);
            server.send_to(&reply, peer).await.unwrap();
        });
        addr
    }

    #[test]
    fn server_strings() {
        assert_eq!(parse_server("1.1.1.1").unwrap(), "1.1.1.1:53".parse().unwrap());
        assert_eq!(parse_server(" 9.9.9.9:5353 ").unwrap(), "9.9.9.9:5353".parse().unwrap());
        assert_eq!(parse_server("::1").unwrap(), "[::1]:53".parse().unwrap());
        assert!(parse_server("dns.google").is_err());
    }

    #[test]
    fn custom_server_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dns_config.json");
        let mut cfg = DnsConfig::load(&path).unwrap();
        assert_eq!(cfg, DnsConfig::default());

        cfg.set_custom_server("8.8.8.8", &path).unwrap();
        let back = DnsConfig::load(&path).unwrap();
        assert_eq!(back.dns_server, "8.8.8.8");
        assert_eq!(back.dns_label, "Custom");

        assert!(cfg.set_custom_server("not-an-ip", &path).is_err());
        assert_eq!(DnsConfig::load(&path).unwrap().dns_server, "8.8.8.8");
    }

    #[tokio::test]
    async fn probes_a_local_resolver() {
        let addr = local_resolver(0, [10, 0, 0, 1]).await;
        let ip = probe_addr(addr, Duration::from_secs(2)).await.unwrap();
        assert_eq!(ip, Ipv4Addr::new(10, 0, 0, 1));
    }

    #[tokio::test]
    async fn nxdomain_is_a_dns_error() {
        let addr = local_resolver(3, [0; 4]).await;
        let err = probe_addr(addr, Duration::from_secs(2)).await.unwrap_err();
        assert!(matches!(err, ShrineError::Dns(_)));
    }

    #[tokio::test]
    async fn silent_resolver_times_out() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        let err = probe_addr(addr, Duration::from_millis(100)).await.unwrap_err();
        assert!(matches!(err, ShrineError::Timeout(_) | ShrineError::Dns(_)));
        drop(server);
    }
}

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use spore_common::{Result, SporeError};
use spore_consensus::QuorumSettings;
use spore_p2p::{P2pConfig, QuorumPolicy};

use crate::setup;

pub const DEFAULT_PORT: u16 = 8944;

/// Node configuration, persisted as pretty JSON.
///
/// Missing fields fall back to their defaults, so a config file only needs
/// the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Address peers use to reach this node. Detected when absent.
    pub address: Option<String>,
    pub bootstrap_peers: Vec<String>,
    /// One `host[:port]` per line; missing ports get [`DEFAULT_PORT`].
    pub bootstrap_peer_file: Option<PathBuf>,
    pub max_peer_connections: usize,
    pub password: Option<String>,
    /// First line is used when `password` is not set.
    pub password_file: Option<PathBuf>,
    pub random_seed: u64,
    pub transaction_timeout_ms: u64,
    pub retry_min_wait_ms: u64,
    pub retry_max_wait_ms: u64,
    pub peer_refresh_interval_ms: u64,
    pub connect_timeout_ms: u64,
    pub intersection_probability: f64,
    pub min_quorum_size: usize,
    pub ledger_file: PathBuf,
    /// `None` logs to stdout only.
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            address: None,
            bootstrap_peers: Vec::new(),
            bootstrap_peer_file: Some(PathBuf::from("peers.txt")),
            max_peer_connections: 100,
            password: None,
            password_file: Some(PathBuf::from("password.txt")),
            random_seed: 4517,
            transaction_timeout_ms: 10_000,
            retry_min_wait_ms: 1_000,
            retry_max_wait_ms: 5_000,
            peer_refresh_interval_ms: 10_000,
            connect_timeout_ms: 2_000,
            intersection_probability: 0.99,
            min_quorum_size: 10,
            ledger_file: PathBuf::from("ledger.json"),
            log_file: Some(PathBuf::from("spore.log")),
        }
    }
}

impl Config {
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&data)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.intersection_probability > 0.0 && self.intersection_probability <= 1.0) {
            return Err(SporeError::Config(format!(
                "intersection_probability must be in (0, 1], got {}",
                self.intersection_probability
            )));
        }
        if self.transaction_timeout_ms == 0 {
            return Err(SporeError::Config("transaction_timeout_ms must be positive".into()));
        }
        if self.retry_min_wait_ms > self.retry_max_wait_ms {
            return Err(SporeError::Config(format!(
                "retry_min_wait_ms ({}) exceeds retry_max_wait_ms ({})",
                self.retry_min_wait_ms, self.retry_max_wait_ms
            )));
        }
        if self.peer_refresh_interval_ms == 0 {
            return Err(SporeError::Config("peer_refresh_interval_ms must be positive".into()));
        }
        if self.max_peer_connections == 0 {
            return Err(SporeError::Config("max_peer_connections must be positive".into()));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn advertised_address(&self) -> String {
        match &self.address {
            Some(address) => address.clone(),
            None => format!("{}:{}", setup::local_ip(), self.port),
        }
    }

    /// Configured password, or the first line of the password file.
    pub fn resolve_password(&self) -> Result<Option<String>> {
        if let Some(password) = self.password.as_ref().filter(|p| !p.is_empty()) {
            return Ok(Some(password.clone()));
        }
        match &self.password_file {
            Some(path) => setup::read_password_file(path),
            None => Ok(None),
        }
    }

    /// Bootstrap peers from the config plus the peer file, deduplicated in order.
    ///
    /// Loopback entries are rewritten to the host of `advertised`, so a node
    /// on this machine is known under the same address it advertises.
    pub fn resolve_bootstrap_peers(&self, advertised: &str) -> Result<Vec<String>> {
        let mut peers: Vec<String> = self
            .bootstrap_peers
            .iter()
            .map(|p| setup::with_default_port(p, DEFAULT_PORT))
            .collect();
        if let Some(path) = &self.bootstrap_peer_file {
            peers.extend(setup::read_peer_file(path, DEFAULT_PORT)?);
        }
        for peer in &mut peers {
            *peer = setup::rewrite_loopback(peer, advertised);
        }
        let mut seen = std::collections::HashSet::new();
        peers.retain(|p| seen.insert(p.clone()));
        Ok(peers)
    }

    pub fn quorum_settings(&self) -> QuorumSettings {
        QuorumSettings {
            transaction_timeout: Duration::from_millis(self.transaction_timeout_ms),
            retry_min_wait: Duration::from_millis(self.retry_min_wait_ms),
            retry_max_wait: Duration::from_millis(self.retry_max_wait_ms),
        }
    }

    pub fn quorum_policy(&self) -> QuorumPolicy {
        QuorumPolicy {
            intersection_probability: self.intersection_probability,
            min_quorum_size: self.min_quorum_size,
        }
    }

    pub fn peer_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.peer_refresh_interval_ms)
    }

    pub fn p2p_config(&self) -> P2pConfig {
        P2pConfig {
            listen_addr: self.listen_addr(),
            advertised_addr: self.advertised_address(),
            connect_timeout_ms: self.connect_timeout_ms,
            reply_timeout_ms: self.transaction_timeout_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = Config {
            port: 9000,
            password: Some("secret".into()),
            bootstrap_peers: vec!["10.0.0.2".into()],
            ..Config::default()
        };
        config.save_to_file(&path).unwrap();
        assert_eq!(Config::load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn partial_file_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{ "port": 7000 }"#).unwrap();
        assert_eq!(config.port, 7000);
        assert_eq!(config.min_quorum_size, 10);
        assert_eq!(config.ledger_file, PathBuf::from("ledger.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_inverted_backoff_and_bad_probability() {
        let config = Config {
            retry_min_wait_ms: 10,
            retry_max_wait_ms: 5,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(SporeError::Config(_))));

        let config = Config {
            intersection_probability: 1.5,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn p2p_config_takes_addresses_and_timeouts() {
        let config = Config {
            host: "127.0.0.1".into(),
            port: 9100,
            address: Some("node-a:9100".into()),
            connect_timeout_ms: 750,
            transaction_timeout_ms: 4_000,
            ..Config::default()
        };
        let p2p = config.p2p_config();
        assert_eq!(p2p.listen_addr, "127.0.0.1:9100");
        assert_eq!(p2p.advertised_addr, "node-a:9100");
        assert_eq!(p2p.connect_timeout(), Duration::from_millis(750));
        assert_eq!(p2p.reply_timeout(), Duration::from_millis(4_000));
    }

    #[test]
    fn password_and_peers_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let password_file = dir.path().join("password.txt");
        let peer_file = dir.path().join("peers.txt");
        fs::write(&password_file, "hunter2\nignored\n").unwrap();
        fs::write(&peer_file, "10.0.0.3\n\n10.0.0.4:9000\n10.0.0.2:8944\n").unwrap();

        let config = Config {
            bootstrap_peers: vec!["10.0.0.2".into()],
            bootstrap_peer_file: Some(peer_file),
            password_file: Some(password_file),
            ..Config::default()
        };
        assert_eq!(config.resolve_password().unwrap(), Some("hunter2".to_string()));
        assert_eq!(
            config.resolve_bootstrap_peers("10.0.0.1:8944").unwrap(),
            vec!["10.0.0.2:8944", "10.0.0.3:8944", "10.0.0.4:9000"]
        );

        let local = Config {
            bootstrap_peers: vec!["localhost:8945".into(), "10.0.0.9:8945".into()],
            bootstrap_peer_file: None,
            ..Config::default()
        };
        assert_eq!(
            local.resolve_bootstrap_peers("10.0.0.9:8944").unwrap(),
            vec!["10.0.0.9:8945"],
            "alias collapses onto the advertised address"
        );

        let explicit = Config {
            password: Some("override".into()),
            ..config
        };
        assert_eq!(explicit.resolve_password().unwrap(), Some("override".to_string()));
    }
}

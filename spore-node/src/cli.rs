use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "spore-node")]
#[command(about = "Spore UTXO node")]
pub struct Args {
    /// JSON config file; missing values use defaults
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    pub config: PathBuf,

    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address advertised to peers (host:port)
    #[arg(long)]
    pub address: Option<String>,

    /// Bootstrap peer, repeatable
    #[arg(long = "peer", value_name = "HOST[:PORT]")]
    pub peers: Vec<String>,

    #[arg(long, value_name = "FILE")]
    pub peer_file: Option<PathBuf>,

    #[arg(long)]
    pub max_peers: Option<usize>,

    #[arg(long)]
    pub password: Option<String>,

    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, value_name = "FILE")]
    pub ledger: Option<PathBuf>,

    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Write the effective config to `--config` and exit
    #[arg(long)]
    pub write_config: bool,
}

impl Args {
    /// Command-line values win over the config file.
    pub fn apply(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(address) = &self.address {
            config.address = Some(address.clone());
        }
        config.bootstrap_peers.extend(self.peers.iter().cloned());
        if let Some(path) = &self.peer_file {
            config.bootstrap_peer_file = Some(path.clone());
        }
        if let Some(max) = self.max_peers {
            config.max_peer_connections = max;
        }
        if let Some(password) = &self.password {
            config.password = Some(password.clone());
        }
        if let Some(seed) = self.seed {
            config.random_seed = seed;
        }
        if let Some(ledger) = &self.ledger {
            config.ledger_file = ledger.clone();
        }
        if let Some(log_file) = &self.log_file {
            config.log_file = Some(log_file.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let args = Args::parse_from([
            "spore-node",
            "--port",
            "9001",
            "--peer",
            "10.0.0.2",
            "--peer",
            "10.0.0.3:9000",
            "--password",
            "secret",
            "--seed",
            "7",
        ]);
        let mut config = Config {
            bootstrap_peers: vec!["10.0.0.1".into()],
            ..Config::default()
        };
        args.apply(&mut config);

        assert_eq!(config.port, 9001);
        assert_eq!(config.bootstrap_peers, vec!["10.0.0.1", "10.0.0.2", "10.0.0.3:9000"]);
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert_eq!(config.random_seed, 7);
        assert_eq!(config.ledger_file, PathBuf::from("ledger.json"));
        assert_eq!(args.config, PathBuf::from("config.json"));
        assert!(!args.write_config);
    }
}

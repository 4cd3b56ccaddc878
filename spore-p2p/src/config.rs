use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct P2pConfig {
    /// Socket address the TCP listener binds to.
    pub listen_addr: String,
    /// Address other nodes use to reach this one; the node's identity in peer lists.
    pub advertised_addr: String,
    pub connect_timeout_ms: u64,
    pub reply_timeout_ms: u64,
}

impl P2pConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }
}

impl Default for P2pConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8944".to_string(),
            advertised_addr: "127.0.0.1:8944".to_string(),
            connect_timeout_ms: 2_000,
            reply_timeout_ms: 10_000,
        }
    }
}

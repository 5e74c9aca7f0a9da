//! Configuration management for Embercoin

use serde::Deserialize;
use std::fs;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub mining: MiningConfig,
    #[serde(default)]
    pub mempool: MempoolConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// `host:port` entries seeded into the peer registry at startup.
    #[serde(default)]
    pub bootstrap_peers: Vec<String>,
    /// Bound on every outbound peer call (broadcast and consensus fetch).
    #[serde(default = "default_peer_timeout")]
    pub peer_timeout_secs: u64,
    /// Announce this node to its bootstrap peers on startup.
    #[serde(default)]
    pub announce_on_start: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MiningConfig {
    /// Required count of leading zero hex digits in an accepted block hash.
    #[serde(default = "default_difficulty")]
    pub difficulty: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MempoolConfig {
    #[serde(default = "default_max_txs_per_block")]
    pub max_txs_per_block: usize,
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: usize,
}

impl NetworkConfig {
    pub fn peer_timeout(&self) -> Duration {
        Duration::from_secs(self.peer_timeout_secs)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            host: default_host(),
            port: default_port(),
            bootstrap_peers: Vec::new(),
            peer_timeout_secs: default_peer_timeout(),
            announce_on_start: false,
        }
    }
}

impl Default for MiningConfig {
    fn default() -> Self {
        MiningConfig {
            difficulty: default_difficulty(),
        }
    }
}

impl Default for MempoolConfig {
    fn default() -> Self {
        MempoolConfig {
            max_txs_per_block: default_max_txs_per_block(),
            max_pool_size: default_max_pool_size(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    50000
}

fn default_peer_timeout() -> u64 {
    5
}

fn default_difficulty() -> usize {
    3
}

fn default_max_txs_per_block() -> usize {
    10
}

fn default_max_pool_size() -> usize {
    100
}

/// Load configuration from a TOML file, falling back to full defaults when
/// the file is absent.
pub fn load_config(path: &str) -> Result<Config, Box<dyn std::error::Error>> {
    let config_str = fs::read_to_string(path).unwrap_or_default();
    let config: Config = if config_str.is_empty() {
        Config::default()
    } else {
        toml::from_str(&config_str)?
    };

    // Validate critical values
    if config.mining.difficulty == 0 || config.mining.difficulty > 64 {
        return Err("mining.difficulty must be between 1 and 64".into());
    }

    if config.mempool.max_txs_per_block == 0 {
        return Err("mempool.max_txs_per_block must be at least 1".into());
    }

    if config.mempool.max_pool_size < config.mempool.max_txs_per_block {
        return Err("mempool.max_pool_size must be at least mempool.max_txs_per_block".into());
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_config("definitely-not-here.toml").unwrap();
        assert_eq!(config.network.port, 50000);
        assert_eq!(config.mining.difficulty, 3);
        assert_eq!(config.mempool.max_pool_size, 100);
        assert!(config.network.bootstrap_peers.is_empty());
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: Config = toml::from_str(
            r#"
            [network]
            port = 50002
            bootstrap_peers = ["127.0.0.1:50000"]

            [mining]
            difficulty = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.network.port, 50002);
        assert_eq!(config.network.host, "127.0.0.1");
        assert_eq!(config.network.bootstrap_peers.len(), 1);
        assert_eq!(config.mining.difficulty, 2);
        assert_eq!(config.mempool.max_txs_per_block, 10);
    }
}

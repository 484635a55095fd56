// shard-node/src/config.rs
use serde::{Deserialize, Serialize};
use shard_core::ChainConfig;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    pub network: NetworkConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    pub workload: WorkloadConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub shards: u64,
    pub nodes_per_shard: u64,
    /// Node addresses are `<address_prefix>.<node id>`
    pub address_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadConfig {
    /// Probability that a generated transaction targets another shard
    pub cross_shard_ratio: f64,
    /// Fixed RNG seed for reproducible runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig {
                shards: 2,
                nodes_per_shard: 2,
                address_prefix: "192.168.1".into(),
            },
            chain: ChainConfig::default(),
            workload: WorkloadConfig {
                cross_shard_ratio: 0.3,
                seed: None,
            },
        }
    }
}

impl SimConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.network.shards == 0 {
            anyhow::bail!("network.shards must be at least 1");
        }
        if self.chain.max_block_transactions == 0 {
            anyhow::bail!("chain.max_block_transactions must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.workload.cross_shard_ratio) {
            anyhow::bail!(
                "workload.cross_shard_ratio must be within [0, 1], got {}",
                self.workload.cross_shard_ratio
            );
        }
        Ok(())
    }
}

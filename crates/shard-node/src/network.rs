// shard-node/src/network.rs

//! Registry of the simulated nodes and their shard assignment.
//!
//! Nodes never share state: each owns its chain and pool. The registry only
//! knows which node sits on which shard.

use crate::config::NetworkConfig;
use crate::node::{NodeId, NodeStatus, ShardNode};
use serde::{Deserialize, Serialize};
use shard_core::{BlockNumber, ChainConfig, Clock, ShardError, ShardId};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("Node {0} is already registered")]
    DuplicateNode(NodeId),

    #[error(transparent)]
    Shard(#[from] ShardError),
}

#[derive(Debug, Default)]
pub struct Network {
    nodes: BTreeMap<NodeId, ShardNode>,
    shard_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardInfo {
    pub shard_id: ShardId,
    pub nodes: Vec<NodeStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub shards: Vec<ShardInfo>,
    pub total_nodes: usize,
    pub total_pending: usize,
    pub total_relay: usize,
    pub max_height: BlockNumber,
}

impl fmt::Display for NetworkInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Network: {} shards, {} nodes", self.shards.len(), self.total_nodes)?;
        for shard in &self.shards {
            writeln!(f, "Shard {}: {} nodes", shard.shard_id, shard.nodes.len())?;
            for node in &shard.nodes {
                writeln!(
                    f,
                    "  node {} @ {} height={} pending={} relay={}",
                    node.node_id,
                    node.address,
                    node.height,
                    node.pending_transactions,
                    node.relay_transactions
                )?;
            }
        }
        writeln!(f, "Total pending transactions: {}", self.total_pending)?;
        writeln!(f, "Total relay transactions: {}", self.total_relay)?;
        write!(f, "Highest block: {}", self.max_height)
    }
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `nodes_per_shard` nodes on every shard, numbering node ids
    /// from 1 across the whole network.
    pub fn bootstrap(
        config: &NetworkConfig,
        chain: ChainConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, NetworkError> {
        let mut network = Self {
            nodes: BTreeMap::new(),
            shard_count: config.shards,
        };

        let mut next_id: NodeId = 1;
        for shard_id in 0..config.shards {
            for _ in 0..config.nodes_per_shard {
                let address = format!("{}.{}", config.address_prefix, next_id);
                let node =
                    ShardNode::with_config(next_id, shard_id, address, chain, clock.clone())?;
                network.add_node(node)?;
                next_id += 1;
            }
        }

        info!(shards = config.shards, nodes = network.len(), "network started");
        Ok(network)
    }

    pub fn add_node(&mut self, node: ShardNode) -> Result<(), NetworkError> {
        if self.nodes.contains_key(&node.id()) {
            return Err(NetworkError::DuplicateNode(node.id()));
        }
        self.shard_count = self.shard_count.max(node.shard_id().saturating_add(1));
        self.nodes.insert(node.id(), node);
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Result<&ShardNode, NetworkError> {
        self.nodes.get(&id).ok_or(NetworkError::UnknownNode(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut ShardNode, NetworkError> {
        self.nodes.get_mut(&id).ok_or(NetworkError::UnknownNode(id))
    }

    /// Nodes in id order
    pub fn nodes(&self) -> impl Iterator<Item = &ShardNode> {
        self.nodes.values()
    }

    pub fn nodes_in_shard(&self, shard_id: ShardId) -> Vec<&ShardNode> {
        self.nodes
            .values()
            .filter(|node| node.shard_id() == shard_id)
            .collect()
    }

    /// Remove every node, e.g. to hand them to worker tasks; put them back
    /// with [`Network::add_node`].
    pub fn take_nodes(&mut self) -> Vec<ShardNode> {
        std::mem::take(&mut self.nodes).into_values().collect()
    }

    pub fn shard_count(&self) -> u64 {
        self.shard_count
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Status of every node, grouped by the shards that have nodes
    pub fn info(&self) -> NetworkInfo {
        let mut by_shard: BTreeMap<ShardId, Vec<NodeStatus>> = BTreeMap::new();
        for node in self.nodes() {
            by_shard
                .entry(node.shard_id())
                .or_default()
                .push(node.report_status());
        }

        let statuses = by_shard.values().flatten();
        let total_pending = statuses.clone().map(|s| s.pending_transactions).sum();
        let total_relay = statuses.clone().map(|s| s.relay_transactions).sum();
        let max_height = statuses.map(|s| s.height).max().unwrap_or(0);

        NetworkInfo {
            shards: by_shard
                .into_iter()
                .map(|(shard_id, nodes)| ShardInfo { shard_id, nodes })
                .collect(),
            total_nodes: self.len(),
            total_pending,
            total_relay,
            max_height,
        }
    }
}

// shard-node/src/node.rs
use crate::workload::Workload;
use rand::Rng;
use serde::{Deserialize, Serialize};
use shard_core::{
    clock::format_timestamp, Block, BlockNumber, Chain, ChainConfig, Clock, ShardId, ShardResult,
    Transaction, TransactionPool,
};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

pub type NodeId = u64;

/// A participant of one shard, owning that shard's chain and pool
#[derive(Debug)]
pub struct ShardNode {
    id: NodeId,
    shard_id: ShardId,
    address: String,
    chain: Chain,
}

/// Point-in-time view of a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStatus {
    pub node_id: NodeId,
    pub shard_id: ShardId,
    pub address: String,
    pub height: BlockNumber,
    pub tip_hash: String,
    pub tip_time: String,
    pub pending_transactions: usize,
    pub relay_transactions: usize,
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Node ID: {}", self.node_id)?;
        writeln!(f, "Shard ID: {}", self.shard_id)?;
        writeln!(f, "Address: {}", self.address)?;
        writeln!(f, "Current blockchain height: {}", self.height)?;
        writeln!(f, "Tip: {} ({})", self.tip_hash, self.tip_time)?;
        writeln!(f, "Pending transactions: {}", self.pending_transactions)?;
        write!(f, "Relay transactions: {}", self.relay_transactions)
    }
}

impl ShardNode {
    pub fn new(id: NodeId, shard_id: ShardId, address: impl Into<String>) -> ShardResult<Self> {
        Ok(Self::with_chain(id, address, Chain::new(shard_id)?))
    }

    pub fn with_config(
        id: NodeId,
        shard_id: ShardId,
        address: impl Into<String>,
        config: ChainConfig,
        clock: Arc<dyn Clock>,
    ) -> ShardResult<Self> {
        Ok(Self::with_chain(
            id,
            address,
            Chain::with_config(shard_id, config, clock)?,
        ))
    }

    /// Wrap an existing chain; the node takes the chain's shard
    pub fn with_chain(id: NodeId, address: impl Into<String>, chain: Chain) -> Self {
        Self {
            id,
            shard_id: chain.shard_id(),
            address: address.into(),
            chain,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn shard_id(&self) -> ShardId {
        self.shard_id
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn pool(&self) -> &Arc<TransactionPool> {
        self.chain.pool()
    }

    /// Add transactions to the node's pool
    pub fn add_transactions(&self, txs: Vec<Transaction>) {
        self.chain.pool().insert_batch(txs);
    }

    /// Random transfers originating on this node's shard, stamped with the
    /// chain's clock
    pub fn generate_sample_transactions<R: Rng>(
        &self,
        workload: &Workload,
        rng: &mut R,
        count: usize,
    ) -> ShardResult<Vec<Transaction>> {
        workload.generate(rng, self.shard_id, count, self.chain.clock().now())
    }

    /// Produce a block from the pending queue and append it.
    ///
    /// Taking `&mut self` keeps one miner per node at a time. A rejected
    /// block's transactions go back to the front of the pool.
    pub fn mine(&mut self) -> Option<Block> {
        info!(node = self.id, shard = self.shard_id, "mining a new block");

        let block = match self.chain.generate_block() {
            Ok(block) => block,
            Err(e) => {
                warn!(node = self.id, error = %e, "failed to build block");
                return None;
            }
        };

        self.commit(block)
    }

    fn commit(&mut self, block: Block) -> Option<Block> {
        let number = block.number();
        match self.chain.try_add_block(block) {
            Ok(block) => {
                info!(
                    node = self.id,
                    number,
                    transactions = block.body().len(),
                    volume = %block.total_amount(),
                    "successfully mined block"
                );
                Some(block.clone())
            }
            Err(rejected) => {
                warn!(node = self.id, number, reason = %rejected.reason, "failed to mine block");
                self.chain.pool().requeue_front(rejected.block.into_body());
                None
            }
        }
    }

    /// Read-only snapshot of the node's state
    pub fn report_status(&self) -> NodeStatus {
        let tip = self.chain.tip();
        NodeStatus {
            node_id: self.id,
            shard_id: self.shard_id,
            address: self.address.clone(),
            height: self.chain.height(),
            tip_hash: tip.hash().to_hex(),
            tip_time: format_timestamp(tip.header().timestamp),
            pending_transactions: self.chain.pool().pending_count(),
            relay_transactions: self.chain.pool().relay_count(),
        }
    }
}

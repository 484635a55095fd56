// shard-core/src/chain.rs

use crate::{
    block::{Block, BlockHeader},
    clock::{Clock, SystemClock},
    transaction::Transaction,
    txpool::TransactionPool,
    types::*,
    ShardError, ShardResult,
};
use serde::{Deserialize, Serialize};
use shard_crypto::{concat_hash, Hash};
use std::sync::Arc;
use tracing::{debug, info};

/// Transactions pulled from the pool per generated block
pub const DEFAULT_MAX_BLOCK_TRANSACTIONS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub max_block_transactions: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            max_block_transactions: DEFAULT_MAX_BLOCK_TRANSACTIONS,
        }
    }
}

/// A block that failed append validation, handed back to the caller
#[derive(Debug)]
pub struct RejectedBlock {
    pub block: Block,
    pub reason: ShardError,
}

/// Append-only chain of one shard.
pub struct Chain {
    /// Block 0, kept apart so the chain is never empty
    genesis: Block,
    /// Blocks 1..=height in order
    blocks: Vec<Block>,
    shard_id: ShardId,
    pool: Arc<TransactionPool>,
    config: ChainConfig,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("shard_id", &self.shard_id)
            .field("height", &self.height())
            .field("tip", &self.tip().hash())
            .field("pool", &self.pool)
            .finish()
    }
}

impl Chain {
    /// Create a chain with a fresh genesis block and an empty pool
    pub fn new(shard_id: ShardId) -> ShardResult<Self> {
        Self::with_config(shard_id, ChainConfig::default(), Arc::new(SystemClock))
    }

    pub fn with_config(
        shard_id: ShardId,
        config: ChainConfig,
        clock: Arc<dyn Clock>,
    ) -> ShardResult<Self> {
        let genesis = Block::genesis(shard_id, clock.now())?;
        debug!(shard_id, genesis = %genesis.hash().short(), "chain created");

        Ok(Self {
            genesis,
            blocks: Vec::new(),
            shard_id,
            pool: Arc::new(TransactionPool::new()),
            config,
            clock,
        })
    }

    /// Number of the last block (0 for a genesis-only chain)
    pub fn height(&self) -> BlockNumber {
        self.tip().number()
    }

    /// Last block
    pub fn tip(&self) -> &Block {
        self.blocks.last().unwrap_or(&self.genesis)
    }

    pub fn genesis(&self) -> &Block {
        &self.genesis
    }

    /// All blocks, genesis first
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        std::iter::once(&self.genesis).chain(self.blocks.iter())
    }

    /// Number of blocks including genesis
    pub fn len(&self) -> usize {
        self.blocks.len() + 1
    }

    /// Never true: genesis is always present
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn block_by_number(&self, number: BlockNumber) -> Option<&Block> {
        match number {
            0 => Some(&self.genesis),
            n => usize::try_from(n - 1).ok().and_then(|i| self.blocks.get(i)),
        }
    }

    pub fn shard_id(&self) -> ShardId {
        self.shard_id
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// The chain's pool; clones of the handle may feed it from other threads
    pub fn pool(&self) -> &Arc<TransactionPool> {
        &self.pool
    }

    /// Hash over the concatenated transaction hashes, or `None` for an empty
    /// list. Not a Merkle tree: it must be recomputed over the whole list.
    pub fn compute_transaction_root(transactions: &[Transaction]) -> Option<Hash> {
        if transactions.is_empty() {
            return None;
        }
        Some(concat_hash(transactions.iter().map(Transaction::hash)))
    }

    /// Build the next block from the front of the pending queue.
    ///
    /// Drained transactions stay out of the pool even if the block is later
    /// rejected by `add_block`; restoring them is up to the caller.
    pub fn generate_block(&self) -> ShardResult<Block> {
        let transactions = self.pool.drain_pending(self.config.max_block_transactions);
        let tip = self.tip();

        let header = BlockHeader {
            parent_hash: Some(tip.hash()),
            state_root: None,
            tx_root: Self::compute_transaction_root(&transactions),
            number: tip.number() + 1,
            timestamp: self.clock.now(),
            shard_id: self.shard_id,
        };

        let block = Block::new(header, transactions)?;

        debug!(
            shard_id = self.shard_id,
            number = block.number(),
            transactions = block.body().len(),
            hash = %block.hash().short(),
            "block generated"
        );
        Ok(block)
    }

    /// Check a candidate against the tip: consecutive number, matching
    /// parent hash, and a transaction root that matches the body.
    ///
    /// The block's own content hash and signature are not checked.
    pub fn validate_block(&self, block: &Block) -> ShardResult<()> {
        let tip = self.tip();

        let expected = tip.number() + 1;
        if block.number() != expected {
            return Err(ShardError::NumberMismatch {
                expected,
                actual: block.number(),
            });
        }

        if block.parent_hash() != Some(tip.hash()) {
            return Err(ShardError::ParentHashMismatch {
                expected: tip.hash(),
                actual: block.parent_hash(),
            });
        }

        let computed = Self::compute_transaction_root(block.body());
        if block.header().tx_root != computed {
            return Err(ShardError::TxRootMismatch {
                computed,
                claimed: block.header().tx_root,
            });
        }

        Ok(())
    }

    /// Append a block if it extends the tip; the chain is untouched otherwise
    pub fn add_block(&mut self, block: Block) -> bool {
        self.try_add_block(block).is_ok()
    }

    /// Like [`Chain::add_block`], but returns the appended block or hands a
    /// rejected one back together with the reason.
    pub fn try_add_block(&mut self, block: Block) -> Result<&Block, Box<RejectedBlock>> {
        if let Err(reason) = self.validate_block(&block) {
            debug!(
                shard_id = self.shard_id,
                number = block.number(),
                %reason,
                "block rejected"
            );
            return Err(Box::new(RejectedBlock { block, reason }));
        }

        info!(
            shard_id = self.shard_id,
            number = block.number(),
            transactions = block.body().len(),
            hash = %block.hash().short(),
            "block appended"
        );
        self.blocks.push(block);
        Ok(self.tip())
    }

    /// Verify the entire chain against the append rules
    pub fn verify_chain(&self) -> ShardResult<()> {
        if !self.genesis.is_genesis() || self.genesis.hash() != self.genesis.header().hash()? {
            return Err(ShardError::InvalidChain("malformed genesis block".into()));
        }

        let mut parent = &self.genesis;
        for block in &self.blocks {
            if block.number() != parent.number() + 1 || block.parent_hash() != Some(parent.hash()) {
                return Err(ShardError::InvalidChain(format!(
                    "block {} does not extend block {}",
                    block.number(),
                    parent.number()
                )));
            }
            if block.header().tx_root != Self::compute_transaction_root(block.body()) {
                return Err(ShardError::InvalidChain(format!(
                    "transaction root mismatch at block {}",
                    block.number()
                )));
            }
            parent = block;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use shard_crypto::Hashable;

    const T0: Timestamp = 1_700_000_000_000;

    fn test_chain(shard_id: ShardId) -> (Chain, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(T0));
        let chain = Chain::with_config(shard_id, ChainConfig::default(), clock.clone()).unwrap();
        (chain, clock)
    }

    fn tx(nonce: u64, amount: u64, from: ShardId, to: ShardId) -> Transaction {
        Transaction::new_at("alice", "bob", Amount::from_u64(amount), nonce, from, to, T0).unwrap()
    }

    #[test]
    fn test_blockchain_creation() {
        let (chain, _) = test_chain(0);

        assert_eq!(chain.height(), 0);
        assert_eq!(chain.tip().number(), 0);
        assert!(chain.genesis().is_genesis());
        assert_eq!(chain.tip().hash(), chain.genesis().header().hash().unwrap());
        assert_eq!(chain.pool().pending_count(), 0);
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_genesis_matches_standalone_genesis() {
        let (chain, _) = test_chain(4);
        assert_eq!(chain.genesis(), &Block::genesis(4, T0).unwrap());
    }

    #[test]
    fn test_wall_clock_chain() {
        let chain = Chain::new(1).unwrap();
        assert_eq!(chain.shard_id(), 1);
        assert_eq!(chain.config().max_block_transactions, DEFAULT_MAX_BLOCK_TRANSACTIONS);
    }

    #[test]
    fn test_empty_transaction_root() {
        assert_eq!(Chain::compute_transaction_root(&[]), None);
    }

    #[test]
    fn test_transaction_root_concatenates_hashes() {
        let a = tx(0, 1, 0, 0);
        let b = tx(1, 2, 0, 0);

        let mut joined = a.hash().to_bytes().to_vec();
        joined.extend_from_slice(b.hash().as_bytes());

        let root = Chain::compute_transaction_root(&[a.clone(), b.clone()]);
        assert_eq!(root, Some(joined.hash()));
        assert_ne!(root, Chain::compute_transaction_root(&[b, a]));
    }

    #[test]
    fn test_generate_and_add_block() {
        let (mut chain, clock) = test_chain(0);
        let payment = tx(0, 5, 0, 0);
        chain.pool().insert(payment.clone());
        clock.advance(1_000);

        let block = chain.generate_block().unwrap();
        assert_eq!(block.number(), 1);
        assert_eq!(block.body().len(), 1);
        assert_eq!(block.header().tx_root, Some(payment.hash().as_bytes().hash()));
        assert_eq!(block.parent_hash(), Some(chain.genesis().hash()));
        assert_eq!(block.header().timestamp, T0 + 1_000);
        assert_eq!(chain.pool().pending_count(), 0);

        assert!(chain.add_block(block.clone()));
        assert_eq!(chain.height(), 1);
        assert_eq!(chain.tip(), &block);
        assert!(chain.verify_chain().is_ok());
    }

    #[test]
    fn test_generate_on_empty_pool() {
        let (mut chain, _) = test_chain(0);
        let block = chain.generate_block().unwrap();
        assert!(block.body().is_empty());
        assert_eq!(block.header().tx_root, None);
        assert!(chain.add_block(block));
        assert_eq!(chain.height(), 1);
    }

    #[test]
    fn test_generate_respects_batch_limit_and_skips_relay() {
        let clock = Arc::new(FixedClock::new(T0));
        let config = ChainConfig {
            max_block_transactions: 3,
        };
        let chain = Chain::with_config(0, config, clock).unwrap();
        chain.pool().insert_batch((0..5).map(|n| tx(n, 1, 0, 0)));
        chain.pool().insert(tx(9, 1, 0, 1));

        let block = chain.generate_block().unwrap();
        let nonces: Vec<_> = block.body().iter().map(Transaction::nonce).collect();
        assert_eq!(nonces, vec![0, 1, 2]);
        assert_eq!(chain.pool().pending_count(), 2);
        assert_eq!(chain.pool().relay_count(), 1);
    }

    #[test]
    fn test_default_batch_is_one_hundred() {
        let (chain, _) = test_chain(0);
        chain.pool().insert_batch((0..150).map(|n| tx(n, 1, 0, 0)));

        assert_eq!(chain.generate_block().unwrap().body().len(), 100);
        assert_eq!(chain.pool().pending_count(), 50);
    }

    #[test]
    fn test_reject_wrong_parent() {
        let (mut chain, _) = test_chain(0);
        let header = BlockHeader {
            parent_hash: Some(b"not the tip".hash()),
            state_root: None,
            tx_root: None,
            number: 1,
            timestamp: T0,
            shard_id: 0,
        };
        let block = Block::new(header, Vec::new()).unwrap();

        assert!(matches!(chain.validate_block(&block), Err(ShardError::ParentHashMismatch { .. })));
        assert!(!chain.add_block(block));
        assert_eq!(chain.height(), 0);
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_reject_wrong_number() {
        let (mut chain, _) = test_chain(0);
        let header = BlockHeader {
            parent_hash: Some(chain.tip().hash()),
            state_root: None,
            tx_root: None,
            number: 2,
            timestamp: T0,
            shard_id: 0,
        };
        let block = Block::new(header, Vec::new()).unwrap();

        assert!(matches!(
            chain.validate_block(&block),
            Err(ShardError::NumberMismatch { expected: 1, actual: 2 })
        ));
        assert!(!chain.add_block(block));
        assert_eq!(chain.height(), 0);
    }

    #[test]
    fn test_reject_wrong_tx_root() {
        let (mut chain, _) = test_chain(0);
        let header = BlockHeader {
            parent_hash: Some(chain.tip().hash()),
            state_root: None,
            tx_root: None,
            number: 1,
            timestamp: T0,
            shard_id: 0,
        };
        let block = Block::new(header, vec![tx(0, 5, 0, 0)]).unwrap();

        assert!(matches!(chain.validate_block(&block), Err(ShardError::TxRootMismatch { .. })));
        assert!(!chain.add_block(block));
    }

    #[test]
    fn test_content_hash_not_rechecked() {
        let (mut chain, _) = test_chain(0);
        let header = BlockHeader {
            parent_hash: Some(chain.tip().hash()),
            state_root: None,
            tx_root: None,
            number: 1,
            timestamp: T0,
            shard_id: 7,
        };
        // foreign shard id, but linkage and root are consistent
        assert!(chain.add_block(Block::new(header, Vec::new()).unwrap()));
    }

    #[test]
    fn test_stale_block_returned_on_rejection() {
        let (mut chain, clock) = test_chain(0);
        chain.pool().insert(tx(0, 5, 0, 0));
        let stale = chain.generate_block().unwrap();

        clock.advance(1);
        let competing = chain.generate_block().unwrap();
        assert!(chain.add_block(competing));

        let rejected = chain.try_add_block(stale.clone()).unwrap_err();
        assert_eq!(rejected.block, stale);
        assert!(matches!(rejected.reason, ShardError::NumberMismatch { .. }));
        assert_eq!(chain.height(), 1);

        // drained transactions are not restored by the chain
        assert_eq!(chain.pool().pending_count(), 0);
    }

    #[test]
    fn test_block_by_number_and_iteration() {
        let (mut chain, clock) = test_chain(2);
        for n in 0..3 {
            chain.pool().insert(tx(n, 1, 2, 2));
            clock.advance(10);
            let block = chain.generate_block().unwrap();
            assert!(chain.add_block(block));
        }

        assert_eq!(chain.height(), 3);
        assert_eq!(chain.len(), 4);
        let numbers: Vec<_> = chain.blocks().map(Block::number).collect();
        assert_eq!(numbers, vec![0, 1, 2, 3]);
        assert_eq!(chain.block_by_number(2).map(Block::number), Some(2));
        assert!(chain.block_by_number(4).is_none());
        assert!(chain.verify_chain().is_ok());
    }

    #[test]
    fn test_add_block_invariant_over_random_candidates() {
        let (mut chain, clock) = test_chain(0);
        for step in 0u64..24 {
            clock.advance(1);
            let body = vec![tx(step, step + 1, 0, 0)];
            let tip = chain.tip().clone();
            let right_root = Chain::compute_transaction_root(&body);

            let number = if step % 3 == 1 { tip.number() + 2 } else { tip.number() + 1 };
            let parent = if step % 4 == 2 { Some(b"x".hash()) } else { Some(tip.hash()) };
            let tx_root = if step % 5 == 3 { None } else { right_root };
            let expect_ok =
                number == tip.number() + 1 && parent == Some(tip.hash()) && tx_root == right_root;

            let header = BlockHeader {
                parent_hash: parent,
                state_root: None,
                tx_root,
                number,
                timestamp: clock.now(),
                shard_id: 0,
            };
            let block = Block::new(header, body).unwrap();
            let before = chain.height();

            assert_eq!(chain.add_block(block.clone()), expect_ok, "step {step}");
            if expect_ok {
                assert_eq!(chain.height(), before + 1);
                assert_eq!(chain.tip(), &block);
            } else {
                assert_eq!(chain.height(), before);
                assert_eq!(chain.tip(), &tip);
            }
        }
        assert!(chain.verify_chain().is_ok());
    }
}

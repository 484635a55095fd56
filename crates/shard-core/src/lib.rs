// shard-core/src/lib.rs

//! Core data structures for one shard of the simulator
//!
//! This crate provides:
//! - Transaction type with a content hash fixed at construction
//! - Transaction pool split into local and relay queues
//! - Block and block header types
//! - Per-shard chain with append validation

pub mod block;
pub mod chain;
pub mod clock;
pub mod codec;
pub mod transaction;
pub mod txpool;
pub mod types;

pub use block::{Block, BlockHeader};
pub use chain::{Chain, ChainConfig, RejectedBlock, DEFAULT_MAX_BLOCK_TRANSACTIONS};
pub use clock::{Clock, FixedClock, SystemClock};
pub use transaction::Transaction;
pub use txpool::{PoolMetrics, TransactionPool};
pub use types::*;

use shard_crypto::Hash;

/// Result type for shard operations
pub type ShardResult<T> = Result<T, ShardError>;

/// Errors that can occur in shard operations
#[derive(Debug, thiserror::Error)]
pub enum ShardError {
    #[error("Encoding error: {0}")]
    Encode(String),

    #[error("Decoding error: {0}")]
    Decode(String),

    #[error("Block number mismatch: expected {expected}, got {actual}")]
    NumberMismatch {
        expected: BlockNumber,
        actual: BlockNumber,
    },

    #[error("Parent hash mismatch: expected {expected}, got {actual:?}")]
    ParentHashMismatch {
        expected: Hash,
        actual: Option<Hash>,
    },

    #[error("Transaction root mismatch: computed {computed:?}, header carries {claimed:?}")]
    TxRootMismatch {
        computed: Option<Hash>,
        claimed: Option<Hash>,
    },

    #[error("Invalid chain: {0}")]
    InvalidChain(String),
}

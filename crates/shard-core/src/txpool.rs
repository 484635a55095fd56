// shard-core/src/txpool.rs

use crate::transaction::Transaction;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// Cumulative pool counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolMetrics {
    pub total_inserted: u64,
    pub total_drained_pending: u64,
    pub total_drained_relay: u64,
    pub total_requeued: u64,
}

#[derive(Debug, Default)]
struct Queues {
    /// Same-shard transactions, ready for the local chain
    pending: VecDeque<Transaction>,
    /// Cross-shard transactions, held for a relay layer
    relay: VecDeque<Transaction>,
    metrics: PoolMetrics,
}

impl Queues {
    fn push_back(&mut self, tx: Transaction) {
        if tx.is_cross_shard() {
            self.relay.push_back(tx);
        } else {
            self.pending.push_back(tx);
        }
        self.metrics.total_inserted += 1;
    }
}

/// Transaction pool partitioned by shard locality.
///
/// Both queues live behind one lock, so every operation (batch insertion
/// included) is atomic with respect to every other.
#[derive(Debug, Default)]
pub struct TransactionPool {
    queues: Mutex<Queues>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify and append one transaction
    pub fn insert(&self, tx: Transaction) {
        self.queues.lock().push_back(tx);
    }

    /// Classify and append a batch under a single lock acquisition
    pub fn insert_batch(&self, txs: impl IntoIterator<Item = Transaction>) {
        let mut queues = self.queues.lock();
        let before = queues.metrics.total_inserted;
        for tx in txs {
            queues.push_back(tx);
        }
        debug!(
            inserted = queues.metrics.total_inserted - before,
            pending = queues.pending.len(),
            relay = queues.relay.len(),
            "batch added to pool"
        );
    }

    /// Remove and return up to `limit` same-shard transactions, oldest first
    pub fn drain_pending(&self, limit: usize) -> Vec<Transaction> {
        let mut queues = self.queues.lock();
        let n = limit.min(queues.pending.len());
        queues.metrics.total_drained_pending += n as u64;
        queues.pending.drain(..n).collect()
    }

    /// Remove and return up to `limit` cross-shard transactions, oldest first
    pub fn drain_relay(&self, limit: usize) -> Vec<Transaction> {
        let mut queues = self.queues.lock();
        let n = limit.min(queues.relay.len());
        queues.metrics.total_drained_relay += n as u64;
        queues.relay.drain(..n).collect()
    }

    /// Put previously drained transactions back at the front of their
    /// queues, keeping their relative order.
    pub fn requeue_front(&self, txs: Vec<Transaction>) {
        if txs.is_empty() {
            return;
        }
        let mut queues = self.queues.lock();
        let count = txs.len();
        for tx in txs.into_iter().rev() {
            if tx.is_cross_shard() {
                queues.relay.push_front(tx);
            } else {
                queues.pending.push_front(tx);
            }
        }
        queues.metrics.total_requeued += count as u64;
        debug!(count, "transactions returned to pool");
    }

    pub fn pending_count(&self) -> usize {
        self.queues.lock().pending.len()
    }

    pub fn relay_count(&self) -> usize {
        self.queues.lock().relay.len()
    }

    pub fn is_empty(&self) -> bool {
        let queues = self.queues.lock();
        queues.pending.is_empty() && queues.relay.is_empty()
    }

    pub fn metrics(&self) -> PoolMetrics {
        self.queues.lock().metrics.clone()
    }
}

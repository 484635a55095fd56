// shard-node/src/workload.rs

//! Random transfer generator used to feed node pools.

use rand::Rng;
use shard_core::{Amount, ShardId, ShardResult, Timestamp, Transaction};

/// Number of distinct `account_<n>` identifiers
pub const ACCOUNT_SPACE: u32 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Workload {
    pub num_shards: u64,
    /// Probability of targeting the next shard instead of the local one
    pub cross_shard_ratio: f64,
}

impl Workload {
    pub fn new(num_shards: u64, cross_shard_ratio: f64) -> Self {
        Self {
            num_shards,
            cross_shard_ratio,
        }
    }

    /// Generate `count` transfers originating on `shard_id`
    pub fn generate<R: Rng>(
        &self,
        rng: &mut R,
        shard_id: ShardId,
        count: usize,
        timestamp: Timestamp,
    ) -> ShardResult<Vec<Transaction>> {
        let ratio = if self.cross_shard_ratio.is_finite() {
            self.cross_shard_ratio.clamp(0.0, 1.0)
        } else {
            0.0
        };

        (0..count)
            .map(|_| {
                let sender = format!("account_{}", rng.gen_range(0..ACCOUNT_SPACE));
                let recipient = format!("account_{}", rng.gen_range(0..ACCOUNT_SPACE));
                let amount = Amount::from_u64(rng.gen_range(1..=1_000));
                let nonce = rng.gen_range(0..100);

                let to_shard = if self.num_shards > 1 && rng.gen_bool(ratio) {
                    (shard_id % self.num_shards + 1) % self.num_shards
                } else {
                    shard_id
                };

                Transaction::new_at(
                    sender, recipient, amount, nonce, shard_id, to_shard, timestamp,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::{rngs::StdRng, SeedableRng};

    const T0: Timestamp = 1_700_000_000_000;

    #[test]
    fn test_zero_ratio_stays_local() {
        let mut rng = StdRng::seed_from_u64(1);
        let txs = Workload::new(4, 0.0).generate(&mut rng, 2, 50, T0).unwrap();

        assert_eq!(txs.len(), 50);
        assert!(txs.iter().all(|tx| !tx.is_cross_shard()));
    }

    #[test]
    fn test_full_ratio_targets_next_shard() {
        let mut rng = StdRng::seed_from_u64(2);
        let txs = Workload::new(4, 1.0).generate(&mut rng, 3, 20, T0).unwrap();

        assert!(txs.iter().all(|tx| tx.from_shard() == 3 && tx.to_shard() == 0));
    }

    #[test]
    fn test_single_shard_never_crosses() {
        let mut rng = StdRng::seed_from_u64(3);
        let txs = Workload::new(1, 1.0).generate(&mut rng, 0, 20, T0).unwrap();
        assert!(txs.iter().all(|tx| !tx.is_cross_shard()));
    }

    #[test]
    fn test_highest_shard_id_wraps_without_overflow() {
        let mut rng = StdRng::seed_from_u64(4);
        let txs = Workload::new(u64::MAX, 1.0).generate(&mut rng, u64::MAX - 1, 5, T0).unwrap();
        assert!(txs.iter().all(|tx| tx.to_shard() == 0));

        let txs = Workload::new(u64::MAX, 1.0).generate(&mut rng, u64::MAX, 5, T0).unwrap();
        assert!(txs.iter().all(|tx| tx.to_shard() == 1));
    }

    #[test]
    fn test_same_seed_same_transactions() {
        let workload = Workload::new(2, 0.3);
        let a = workload.generate(&mut StdRng::seed_from_u64(9), 0, 10, T0).unwrap();
        let b = workload.generate(&mut StdRng::seed_from_u64(9), 0, 10, T0).unwrap();
        assert_eq!(a, b);
    }

    proptest! {
        #[test]
        fn generated_fields_stay_in_range(
            seed in any::<u64>(),
            num_shards in 1u64..6,
            ratio in 0.0f64..=1.0,
            count in 0usize..30,
        ) {
            let shard = seed % num_shards;
            let mut rng = StdRng::seed_from_u64(seed);
            let txs = Workload::new(num_shards, ratio)
                .generate(&mut rng, shard, count, T0)
                .unwrap();

            prop_assert_eq!(txs.len(), count);
            for tx in &txs {
                prop_assert_eq!(tx.from_shard(), shard);
                prop_assert!(tx.to_shard() < num_shards);
                prop_assert!(!tx.amount().is_zero());
                prop_assert!(tx.nonce() < 100);
                prop_assert!(tx.sender().starts_with("account_"));
            }
        }
    }
}

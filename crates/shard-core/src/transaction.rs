// shard-core/src/transaction.rs

use crate::{
    clock::{Clock, SystemClock},
    codec,
    types::*,
    ShardResult,
};
use serde::{Deserialize, Serialize};
use shard_crypto::{Hash, HASH_SIZE};

/// Value transfer between two accounts, possibly on different shards.
///
/// The content hash is fixed when the transaction is built and is never
/// recomputed; fields are read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sender account identifier
    sender: String,
    /// Recipient account identifier
    recipient: String,
    /// Transferred value
    amount: Amount,
    /// Per-sender counter (not enforced here)
    nonce: Nonce,
    /// Creation time
    timestamp: Timestamp,
    /// Content hash
    hash: Hash,
    /// Whether a relay layer has forwarded this transaction
    relayed: bool,
    /// Shard the transaction originates from
    from_shard: ShardId,
    /// Shard the recipient lives on
    to_shard: ShardId,
    /// Opaque signature bytes, never populated or checked
    signature: Vec<u8>,
}

/// Every field except the hash, in declaration order
#[derive(Serialize)]
struct TransactionPreimage<'a> {
    sender: &'a str,
    recipient: &'a str,
    amount: &'a Amount,
    nonce: Nonce,
    timestamp: Timestamp,
    relayed: bool,
    from_shard: ShardId,
    to_shard: ShardId,
    signature: &'a [u8],
}

impl Transaction {
    /// Create a transaction stamped with the current wall-clock time
    pub fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: Amount,
        nonce: Nonce,
        from_shard: ShardId,
        to_shard: ShardId,
    ) -> ShardResult<Self> {
        Self::new_at(
            sender,
            recipient,
            amount,
            nonce,
            from_shard,
            to_shard,
            SystemClock.now(),
        )
    }

    /// Create a transaction with an explicit timestamp
    pub fn new_at(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: Amount,
        nonce: Nonce,
        from_shard: ShardId,
        to_shard: ShardId,
        timestamp: Timestamp,
    ) -> ShardResult<Self> {
        let mut tx = Self {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
            nonce,
            timestamp,
            hash: Hash::new([0u8; HASH_SIZE]),
            relayed: false,
            from_shard,
            to_shard,
            signature: Vec::new(),
        };
        tx.hash = tx.compute_hash()?;
        Ok(tx)
    }

    /// Recompute the content hash from the current fields
    pub fn compute_hash(&self) -> ShardResult<Hash> {
        codec::content_hash(&TransactionPreimage {
            sender: &self.sender,
            recipient: &self.recipient,
            amount: &self.amount,
            nonce: self.nonce,
            timestamp: self.timestamp,
            relayed: self.relayed,
            from_shard: self.from_shard,
            to_shard: self.to_shard,
            signature: &self.signature,
        })
    }

    /// Whether the stored hash still matches the fields (useful after decode)
    pub fn verify_hash(&self) -> bool {
        matches!(self.compute_hash(), Ok(h) if h == self.hash)
    }

    /// Origin and destination shards differ
    pub fn is_cross_shard(&self) -> bool {
        self.from_shard != self.to_shard
    }

    pub fn encode(&self) -> ShardResult<Vec<u8>> {
        codec::encode(self)
    }

    pub fn decode(bytes: &[u8]) -> ShardResult<Self> {
        codec::decode(bytes)
    }

    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn amount(&self) -> &Amount {
        &self.amount
    }

    pub fn nonce(&self) -> Nonce {
        self.nonce
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn is_relayed(&self) -> bool {
        self.relayed
    }

    pub fn from_shard(&self) -> ShardId {
        self.from_shard
    }

    pub fn to_shard(&self) -> ShardId {
        self.to_shard
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ShardError;
    use proptest::prelude::*;

    const T0: Timestamp = 1_700_000_000_000;

    fn transfer(amount: u64, to_shard: ShardId, timestamp: Timestamp) -> Transaction {
        Transaction::new_at(
            "account_1",
            "account_2",
            Amount::from_u64(amount),
            3,
            0,
            to_shard,
            timestamp,
        )
        .unwrap()
    }

    fn sample_tx(to_shard: ShardId) -> Transaction {
        transfer(5, to_shard, T0)
    }

    #[test]
    fn test_transaction_creation() {
        let tx = sample_tx(0);

        assert_eq!(tx.sender(), "account_1");
        assert_eq!(tx.recipient(), "account_2");
        assert_eq!(tx.amount(), &Amount::from_u64(5));
        assert_eq!(tx.nonce(), 3);
        assert!(!tx.is_relayed());
        assert!(tx.signature().is_empty());
        assert!(tx.verify_hash());
        assert_eq!(tx.hash(), tx.compute_hash().unwrap());
    }

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(sample_tx(0).hash(), sample_tx(0).hash());
    }

    #[test]
    fn test_hash_depends_on_fields() {
        let base = sample_tx(0);
        let later = transfer(5, 0, T0 + 1);
        let bigger = transfer(6, 0, T0);

        assert_ne!(base.hash(), later.hash());
        assert_ne!(base.hash(), bigger.hash());
        assert_ne!(base.hash(), sample_tx(1).hash());
    }

    #[test]
    fn test_is_cross_shard() {
        assert!(!sample_tx(0).is_cross_shard());
        assert!(sample_tx(2).is_cross_shard());
    }

    #[test]
    fn test_wall_clock_constructor() {
        let tx = Transaction::new("a", "b", Amount::from_u64(1), 0, 1, 1).unwrap();
        assert!(tx.timestamp() > 0);
        assert!(tx.verify_hash());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let bytes = sample_tx(0).encode().unwrap();
        assert!(matches!(
            Transaction::decode(&bytes[..bytes.len() / 2]),
            Err(ShardError::Decode(_))
        ));
        assert!(Transaction::decode(&[]).is_err());
    }

    #[test]
    fn test_tampered_payload_fails_hash_check() {
        let tx = sample_tx(0);
        let mut bytes = tx.encode().unwrap();
        // first byte of the sender string, after its u64 length prefix
        bytes[8] ^= 0x01;

        let decoded = Transaction::decode(&bytes).unwrap();
        assert_eq!(decoded.sender(), "`ccount_1");
        assert_eq!(decoded.hash(), tx.hash());
        assert!(!decoded.verify_hash());
    }

    #[test]
    fn test_decode_rejects_padded_amount() {
        let tx = sample_tx(0);
        // same field layout as the wire format, with the amount as raw digits
        let wire = |digits: Vec<u32>| {
            codec::encode(&(
                tx.sender(),
                tx.recipient(),
                digits,
                tx.nonce(),
                tx.timestamp(),
                tx.hash(),
                tx.is_relayed(),
                tx.from_shard(),
                tx.to_shard(),
                tx.signature(),
            ))
            .unwrap()
        };
        assert_eq!(wire(vec![5]), tx.encode().unwrap());

        // a trailing zero digit still means 5, but is not the canonical form
        assert!(matches!(
            Transaction::decode(&wire(vec![5, 0])),
            Err(ShardError::Decode(_))
        ));
    }

    proptest! {
        #[test]
        fn encode_decode_round_trip(
            sender in "[a-z_0-9]{0,16}",
            recipient in "[a-z_0-9]{0,16}",
            digits in proptest::collection::vec(any::<u32>(), 0..4),
            nonce in any::<u64>(),
            from_shard in 0u64..8,
            to_shard in 0u64..8,
            timestamp in any::<u64>(),
        ) {
            let amount = Amount::new(num_bigint::BigUint::new(digits));
            let tx = Transaction::new_at(
                sender, recipient, amount, nonce, from_shard, to_shard, timestamp,
            )
            .unwrap();
            let decoded = Transaction::decode(&tx.encode().unwrap()).unwrap();
            prop_assert_eq!(&decoded, &tx);
            prop_assert_eq!(decoded.hash(), tx.hash());
            prop_assert!(decoded.verify_hash());
        }
    }
}

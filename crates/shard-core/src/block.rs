// shard-core/src/block.rs
use crate::{codec, transaction::Transaction, types::*, ShardResult};
use serde::{Deserialize, Serialize};
use shard_crypto::Hash;

/// Block header containing linkage and metadata.
///
/// `None` in a hash field is the empty byte string: the genesis parent, the
/// root of an empty body, and the unused state root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Hash of previous block
    pub parent_hash: Option<Hash>,
    /// State root (not tracked by this simulator)
    pub state_root: Option<Hash>,
    /// Hash over the body's transaction hashes
    pub tx_root: Option<Hash>,
    /// Block number/height
    pub number: BlockNumber,
    /// Block timestamp
    pub timestamp: Timestamp,
    /// Shard the block belongs to
    pub shard_id: ShardId,
}

impl BlockHeader {
    /// Calculate header hash; recomputed on every call
    pub fn hash(&self) -> ShardResult<Hash> {
        codec::content_hash(self)
    }
}

/// Complete block structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    header: BlockHeader,
    body: Vec<Transaction>,
    hash: Hash,
    /// Opaque, never populated or checked
    signature: Vec<u8>,
}

/// Block as hashed: empty hash field, empty signature
#[derive(Serialize)]
struct BlockPreimage<'a> {
    header: &'a BlockHeader,
    body: &'a [Transaction],
    hash: Option<Hash>,
    signature: &'a [u8],
}

impl Block {
    /// Seal a header and body into a block, fixing its content hash
    pub fn new(header: BlockHeader, body: Vec<Transaction>) -> ShardResult<Self> {
        let hash = codec::content_hash(&BlockPreimage {
            header: &header,
            body: &body,
            hash: None,
            signature: &[],
        })?;

        Ok(Self {
            header,
            body,
            hash,
            signature: Vec::new(),
        })
    }

    /// Create genesis block.
    ///
    /// Unlike every later block, the genesis hash covers the header only.
    pub fn genesis(shard_id: ShardId, timestamp: Timestamp) -> ShardResult<Self> {
        let header = BlockHeader {
            parent_hash: None,
            state_root: None,
            tx_root: None,
            number: 0,
            timestamp,
            shard_id,
        };
        let hash = header.hash()?;

        Ok(Self {
            header,
            body: Vec::new(),
            hash,
            signature: Vec::new(),
        })
    }

    /// Get block hash
    pub fn hash(&self) -> Hash {
        self.hash
    }

    /// Get block number
    pub fn number(&self) -> BlockNumber {
        self.header.number
    }

    pub fn parent_hash(&self) -> Option<Hash> {
        self.header.parent_hash
    }

    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn body(&self) -> &[Transaction] {
        &self.body
    }

    pub fn into_body(self) -> Vec<Transaction> {
        self.body
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Sum of all transferred amounts in the body
    pub fn total_amount(&self) -> Amount {
        self.body
            .iter()
            .fold(Amount::zero(), |acc, tx| acc + tx.amount())
    }

    /// Check if this is the genesis block
    pub fn is_genesis(&self) -> bool {
        self.header.number == 0 && self.header.parent_hash.is_none()
    }

    pub fn encode(&self) -> ShardResult<Vec<u8>> {
        codec::encode(self)
    }

    pub fn decode(bytes: &[u8]) -> ShardResult<Self> {
        codec::decode(bytes)
    }
}

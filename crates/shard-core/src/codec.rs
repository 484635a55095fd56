// shard-core/src/codec.rs

//! Canonical binary encoding.
//!
//! bincode with fixed-width little-endian integers and u64 length prefixes,
//! the same layout `bincode::serialize` produces. Decoding additionally
//! caps the input size, rejects trailing bytes and rejects any buffer that
//! does not re-encode to itself, so a malformed buffer never yields a
//! partial value and every accepted buffer is the canonical one.

use crate::{ShardError, ShardResult};
use bincode::Options;
use serde::{de::DeserializeOwned, Serialize};
use shard_crypto::{Hash, Hashable};

/// Upper bound on a single decoded value
pub const MAX_DECODE_BYTES: u64 = 32 * 1024 * 1024;

pub fn encode<T: Serialize>(value: &T) -> ShardResult<Vec<u8>> {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .serialize(value)
        .map_err(|e| ShardError::Encode(e.to_string()))
}

pub fn decode<T: Serialize + DeserializeOwned>(bytes: &[u8]) -> ShardResult<T> {
    let value: T = bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_DECODE_BYTES)
        .reject_trailing_bytes()
        .deserialize(bytes)
        .map_err(|e| ShardError::Decode(e.to_string()))?;

    // big integers normalize away leading zero digits on the way in
    if encode(&value)? != bytes {
        return Err(ShardError::Decode("non-canonical encoding".into()));
    }
    Ok(value)
}

/// SHA-256 of the canonical encoding
pub fn content_hash<T: Serialize>(value: &T) -> ShardResult<Hash> {
    Ok(encode(value)?.hash())
}

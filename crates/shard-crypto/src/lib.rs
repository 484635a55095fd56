// shard-crypto/src/lib.rs

//! Hashing primitives for the shard simulator
//!
//! This crate provides:
//! - The 32-byte `Hash` digest type
//! - SHA-256 hashing through the `Hashable` trait
//! - Hex conversion helpers

pub mod hash;

pub use hash::{concat_hash, Hash, Hashable, HASH_SIZE};

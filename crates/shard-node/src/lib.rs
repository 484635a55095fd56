// shard-node/src/lib.rs
pub mod config;
pub mod network;
pub mod node;
pub mod workload;

pub use config::SimConfig;
pub use network::{Network, NetworkError, NetworkInfo};
pub use node::{NodeId, NodeStatus, ShardNode};
pub use workload::Workload;

//! Error types for Embercoin
//!
//! None of these conditions terminate the node. A refused block admission is
//! signaled as a plain `false` by the chain rather than through this enum,
//! and an unreachable peer is skipped silently by gossip; `NetworkError` only
//! surfaces where a caller asked for a specific peer's data.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ChainError {
    #[error("Mempool is full")]
    PoolFull,
    #[error("Transaction already in mempool")]
    DuplicateTransaction,
    #[error("Peer chain failed validation")]
    InvalidPeerChain,
    #[error("Chain is empty; genesis block missing")]
    EmptyChain,
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;

//! Longest-valid-chain consensus
//!
//! Polls every known peer for its chain and replaces the local chain
//! wholesale with the first strictly-longer candidate that validates. The
//! mempool is deliberately left untouched by a replacement: transactions
//! orphaned or re-pended by the switch are not reconciled.

use crate::blockchain::validate_chain;
use crate::error::ChainError;
use crate::network::{ChainSnapshot, Network};
use crate::node::ChainState;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Result of a consensus round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsensusOutcome {
    pub replaced: bool,
    /// Local chain length after the round.
    pub length: usize,
}

/// Consensus engine applying the longest-valid-chain rule.
pub struct Consensus;

impl Consensus {
    /// Poll peers and adopt the longest valid chain that is strictly longer
    /// than the local one.
    ///
    /// Unreachable or malformed peers are skipped silently and not retried
    /// within the call. Peers are visited in registry order; among equally
    /// long qualifying candidates the first one encountered wins, so the
    /// outcome is not deterministic across nodes with differently ordered
    /// registries.
    pub async fn compare_chains(
        state: &Arc<RwLock<ChainState>>,
        network: &Network,
    ) -> ConsensusOutcome {
        let (local_len, difficulty) = {
            let state = state.read().await;
            (state.chain.len(), state.chain.difficulty())
        };

        let mut snapshots = Vec::new();
        for peer in network.peers().await {
            match network.fetch_chain(&peer).await {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(err) => {
                    debug!(peer = %peer, error = %err, "peer skipped during consensus poll")
                }
            }
        }

        let candidate = match select_candidate(snapshots, local_len, difficulty) {
            Some(snapshot) => snapshot,
            None => return ConsensusOutcome { replaced: false, length: local_len },
        };

        let mut state = state.write().await;
        // Re-check under the write lock: mining or a concurrent consensus
        // round may have extended the local chain since the poll started.
        if candidate.chain.len() > state.chain.len() && state.chain.replace(candidate.chain).is_ok()
        {
            let length = state.chain.len();
            info!(length, "adopted longer peer chain");
            ConsensusOutcome { replaced: true, length }
        } else {
            ConsensusOutcome { replaced: false, length: state.chain.len() }
        }
    }
}

/// Pick the longest valid snapshot strictly longer than `local_len`; first
/// encountered wins among equals.
///
/// Lengths are taken from the chains themselves, not from the peer-reported
/// `length` field, so a peer cannot qualify by overstating.
fn select_candidate(
    snapshots: Vec<ChainSnapshot>,
    local_len: usize,
    difficulty: usize,
) -> Option<ChainSnapshot> {
    let mut best: Option<ChainSnapshot> = None;
    let mut best_len = local_len;

    for snapshot in snapshots {
        let length = snapshot.chain.len();
        if length <= best_len {
            continue;
        }
        if !validate_chain(&snapshot.chain, difficulty) {
            debug!(
                length,
                error = %ChainError::InvalidPeerChain,
                "candidate chain discarded"
            );
            continue;
        }
        best_len = length;
        best = Some(snapshot);
    }

    best
}

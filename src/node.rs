//! Node orchestrator
//!
//! Owns the shared chain-and-mempool state and wires the core components
//! together: transaction admission with gossip, background mining, verified
//! removal relays and consensus rounds. All mutation goes through one
//! `RwLock` held only for the short windows of insert, remove, append and
//! replace; the proof-of-work search itself runs outside the lock on a
//! blocking thread.

use crate::blockchain::{Block, Blockchain};
use crate::config::Config;
use crate::consensus::{Consensus, ConsensusOutcome};
use crate::error::{ChainError, Result};
use crate::mempool::Mempool;
use crate::network::{ChainSnapshot, Network, Peer};
use crate::transaction::Transaction;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// The mutable state of a node: its ledger and its pending transactions.
pub struct ChainState {
    pub chain: Blockchain,
    pub mempool: Mempool,
}

pub struct Node {
    pub config: Config,
    pub state: Arc<RwLock<ChainState>>,
    pub network: Arc<Network>,
}

impl Node {
    pub fn new(config: Config) -> Self {
        let local = Peer::new(config.network.host.clone(), config.network.port);
        let network = Network::new(local, config.network.peer_timeout());
        let state = ChainState {
            chain: Blockchain::new(config.mining.difficulty),
            mempool: Mempool::new(config.mempool.max_txs_per_block, config.mempool.max_pool_size),
        };

        Node {
            config,
            state: Arc::new(RwLock::new(state)),
            network: Arc::new(network),
        }
    }

    /// Admit a transaction into the mempool and gossip it to peers.
    ///
    /// A duplicate is not re-broadcast: the rejection doubles as the cycle
    /// breaker that stops a transaction from bouncing between nodes forever.
    /// Returns the insertion index and new pool size.
    pub async fn submit_transaction(&self, tx: Transaction) -> Result<(usize, usize)> {
        let placed = {
            let mut state = self.state.write().await;
            state.mempool.insert_single(tx.clone())?
        };
        info!(id = %tx.id, index = placed.0, pool = placed.1, "transaction pooled");
        self.network
            .broadcast(serde_json::json!({ "transaction": tx }), "add_transaction")
            .await;
        Ok(placed)
    }

    /// Mine one block from the current top mempool candidates.
    ///
    /// The candidates are snapshotted without removal, the nonce search runs
    /// on a blocking thread with no locks held, and admission re-checks the
    /// tip: if the chain advanced during the search (a concurrent miner or a
    /// consensus replacement), the stale block is discarded and `None` is
    /// returned. Only on admission are the included transactions removed
    /// from the pool and announced as verified.
    pub async fn mine(&self) -> Result<Option<Block>> {
        let (candidate, candidates, difficulty) = {
            let state = self.state.read().await;
            let candidates = state.mempool.top_candidates();
            (
                state.chain.next_block(candidates.clone()),
                candidates,
                state.chain.difficulty(),
            )
        };

        let (block, proof) = tokio::task::spawn_blocking(move || {
            let mut block = candidate;
            let proof = Blockchain::search_proof(&mut block, difficulty);
            (block, proof)
        })
        .await
        .map_err(|err| ChainError::InternalError(format!("mining task failed: {err}")))?;

        let admitted = {
            let mut state = self.state.write().await;
            if state.chain.add_block(block.clone(), &proof) {
                Some(state.mempool.remove_verified(&candidates))
            } else {
                None
            }
        };

        match admitted {
            Some(pool_changed) => {
                info!(index = block.index, hash = %proof, "mined block admitted");
                if pool_changed {
                    self.network
                        .broadcast(
                            serde_json::json!({ "transactions": candidates }),
                            "transactions_verified",
                        )
                        .await;
                }
                Ok(Some(block))
            }
            None => {
                warn!(index = block.index, "mined block discarded; chain advanced during search");
                Ok(None)
            }
        }
    }

    /// Drop transactions a peer reports as mined, relaying the announcement
    /// onward only if the local pool actually changed (a pool that already
    /// dropped them has already relayed).
    pub async fn remove_verified(&self, txs: Vec<Transaction>) -> bool {
        let changed = {
            let mut state = self.state.write().await;
            state.mempool.remove_verified(&txs)
        };
        if changed {
            self.network
                .broadcast(
                    serde_json::json!({ "transactions": txs }),
                    "transactions_verified",
                )
                .await;
        }
        changed
    }

    /// Run one longest-valid-chain consensus round against all known peers.
    pub async fn run_consensus(&self) -> ConsensusOutcome {
        Consensus::compare_chains(&self.state, &self.network).await
    }

    pub async fn validate_local_chain(&self) -> bool {
        self.state.read().await.chain.is_valid()
    }

    pub async fn chain_snapshot(&self) -> ChainSnapshot {
        let state = self.state.read().await;
        ChainSnapshot {
            chain: state.chain.blocks().to_vec(),
            length: state.chain.len(),
        }
    }

    pub async fn pending_transactions(&self) -> Vec<Transaction> {
        self.state.read().await.mempool.transactions().to_vec()
    }

    /// Seed configured bootstrap peers, announce ourselves if configured,
    /// then serve the HTTP API until shutdown.
    pub async fn start(self: Arc<Self>) -> std::result::Result<(), Box<dyn std::error::Error>> {
        for entry in &self.config.network.bootstrap_peers {
            match parse_peer_addr(entry) {
                Some(peer) => {
                    self.network.seed(peer).await;
                }
                None => warn!(peer = %entry, "ignoring malformed bootstrap peer; expected host:port"),
            }
        }

        if self.config.network.announce_on_start {
            self.network.announce_self().await;
        }

        let bind = format!(
            "{}:{}",
            self.config.network.host, self.config.network.port
        );
        let listener = tokio::net::TcpListener::bind(&bind)
            .await
            .map_err(|err| format!("API port unavailable on {bind}: {err}"))?;

        info!(%bind, peers = self.network.peer_count().await, "embercoin node listening");
        crate::api::run_api_server(self.clone(), listener).await
    }
}

fn parse_peer_addr(entry: &str) -> Option<Peer> {
    let (host, port) = entry.rsplit_once(':')?;
    let port = port.parse().ok()?;
    Some(Peer::new(host, port))
}

//! Peer registry and gossip for Embercoin
//!
//! The registry is a value-deduplicated set of peers with no ordering
//! guarantee and no removal: peers are added once via discovery and kept for
//! the lifetime of the node. Broadcast is best-effort fan-out: every delivery
//! is an independent, unacknowledged POST with a bounded timeout, and an
//! unreachable peer simply misses the update until some later gossip round.

use crate::blockchain::Block;
use crate::error::{ChainError, Result};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// A node on the network, compared by full value equality.
///
/// Wire field names are fixed: `{host, port, address}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Peer {
    pub host: String,
    pub port: u16,
    /// Opaque node identity token; a uuid4 with dashes stripped.
    pub address: String,
}

impl Peer {
    /// Create a peer with a freshly generated address token.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Peer {
            host: host.into(),
            port,
            address: Uuid::new_v4().simple().to_string(),
        }
    }

    /// Create a peer with a known address token, as received over the wire.
    pub fn with_address(host: impl Into<String>, port: u16, address: impl Into<String>) -> Self {
        Peer {
            host: host.into(),
            port,
            address: address.into(),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl std::fmt::Display for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.base_url(), self.address)
    }
}

/// What a peer reports from its `/get_chain` route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub chain: Vec<Block>,
    pub length: usize,
}

/// The local node's view of the network.
pub struct Network {
    local: Peer,
    peers: RwLock<Vec<Peer>>,
    client: reqwest::Client,
}

impl Network {
    pub fn new(local: Peer, peer_timeout: Duration) -> Self {
        // reqwest::Client::new() is infallible; fall back to it if the
        // builder fails.
        let client = reqwest::Client::builder()
            .timeout(peer_timeout)
            .connect_timeout(peer_timeout.min(Duration::from_secs(2)))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Network {
            local,
            peers: RwLock::new(Vec::new()),
            client,
        }
    }

    /// The identity this node announces to the network.
    pub fn local(&self) -> &Peer {
        &self.local
    }

    pub async fn peers(&self) -> Vec<Peer> {
        self.peers.read().await.clone()
    }

    pub async fn peer_count(&self) -> usize {
        self.peers.read().await.len()
    }

    /// Register a peer discovered through gossip and propagate it onward.
    ///
    /// The full-value duplicate check is the only cycle breaker for
    /// peer-discovery flooding: a peer this node already knows is a no-op and
    /// is not re-announced. Returns whether the peer was new.
    pub async fn add_peer(&self, peer: Peer) -> bool {
        {
            let mut peers = self.peers.write().await;
            if peers.contains(&peer) {
                return false;
            }
            peers.push(peer.clone());
        }
        debug!(peer = %peer, "peer added");
        self.broadcast(serde_json::json!({ "node": peer }), "add_node")
            .await;
        true
    }

    /// Register a configured bootstrap peer without re-announcing it.
    pub async fn seed(&self, peer: Peer) -> bool {
        let mut peers = self.peers.write().await;
        if peers.contains(&peer) {
            return false;
        }
        peers.push(peer);
        true
    }

    /// Broadcast this node's own identity to every known peer, bootstrapping
    /// it into the network given at least one seeded peer.
    pub async fn announce_self(&self) {
        self.broadcast(serde_json::json!({ "node": self.local }), "add_node")
            .await;
    }

    /// POST `payload` to `route` on every known peer.
    ///
    /// Deliveries run concurrently and independently: no ordering across
    /// peers, no retry, no acknowledgement. Failures are logged and
    /// swallowed; the per-call timeout on the shared client bounds how long
    /// an unreachable peer can hold up the round.
    pub async fn broadcast(&self, payload: serde_json::Value, route: &str) {
        let peers = self.peers.read().await.clone();
        let deliveries = peers.into_iter().map(|peer| {
            let url = format!("{}/{}", peer.base_url(), route);
            let request = self.client.post(&url).json(&payload);
            async move {
                match request.send().await {
                    Ok(response) => {
                        debug!(%url, status = %response.status(), "broadcast delivered")
                    }
                    Err(err) => debug!(%url, error = %err, "peer unreachable during broadcast"),
                }
            }
        });
        join_all(deliveries).await;
    }

    /// Fetch a peer's full chain and reported length.
    pub async fn fetch_chain(&self, peer: &Peer) -> Result<ChainSnapshot> {
        let url = format!("{}/get_chain", peer.base_url());
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| ChainError::NetworkError(err.to_string()))?;
        response
            .json()
            .await
            .map_err(|err| ChainError::NetworkError(err.to_string()))
    }
}

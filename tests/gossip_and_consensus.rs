//! Multi-node integration tests: transaction gossip, verified-removal relay
//! and longest-valid-chain consensus between real HTTP nodes.

use axum::routing::get;
use axum::{Json, Router};
use embercoin::api::build_api_router;
use embercoin::blockchain::Blockchain;
use embercoin::config::Config;
use embercoin::node::Node;
use embercoin::transaction::Transaction;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;

/// Bind a node's API on an OS-assigned port and serve it in the background.
async fn spawn_node(difficulty: usize) -> (Arc<Node>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut config = Config::default();
    config.mining.difficulty = difficulty;
    config.network.host = addr.ip().to_string();
    config.network.port = addr.port();

    let node = Arc::new(Node::new(config));
    let router = build_api_router(node.clone());
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (node, addr)
}

fn peer_body(addr: &SocketAddr, address: &str) -> Value {
    json!({
        "node": { "host": addr.ip().to_string(), "port": addr.port(), "address": address }
    })
}

#[tokio::test]
async fn transaction_gossip_reaches_peers_exactly_once() {
    let (node_a, addr_a) = spawn_node(1).await;
    let (node_b, addr_b) = spawn_node(1).await;
    let client = reqwest::Client::new();

    // Introduce the nodes to each other.
    client
        .post(format!("http://{addr_a}/add_node"))
        .json(&peer_body(&addr_b, "node-b"))
        .send()
        .await
        .unwrap();
    client
        .post(format!("http://{addr_b}/add_node"))
        .json(&peer_body(&addr_a, "node-a"))
        .send()
        .await
        .unwrap();

    // Submitting to A must propagate to B; B's echo back to A is rejected as
    // a duplicate, which is what stops the rebroadcast storm.
    let response = client
        .post(format!("http://{addr_a}/add_transaction"))
        .json(&json!({
            "transaction": { "id": "g1", "sender": "alice", "receiver": "bob", "amount": 10.0, "fee": 0.5 }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    let pool_a = node_a.pending_transactions().await;
    let pool_b = node_b.pending_transactions().await;
    assert_eq!(pool_a.len(), 1);
    assert_eq!(pool_b.len(), 1);
    assert_eq!(pool_b[0].id, "g1");
}

#[tokio::test]
async fn mining_announces_verified_transactions_to_peers() {
    let (node_a, addr_a) = spawn_node(1).await;
    let (node_b, addr_b) = spawn_node(1).await;
    let client = reqwest::Client::new();

    client
        .post(format!("http://{addr_a}/add_node"))
        .json(&peer_body(&addr_b, "node-b"))
        .send()
        .await
        .unwrap();
    client
        .post(format!("http://{addr_b}/add_node"))
        .json(&peer_body(&addr_a, "node-a"))
        .send()
        .await
        .unwrap();

    client
        .post(format!("http://{addr_a}/add_transaction"))
        .json(&json!({
            "transaction": { "id": "m1", "sender": "alice", "receiver": "bob", "amount": 10.0, "fee": 0.5 }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(node_b.pending_transactions().await.len(), 1);

    // B mines the gossiped transaction; its removal announcement must empty
    // A's pool as well.
    let response = client
        .get(format!("http://{addr_b}/mine_block"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    assert!(node_b.pending_transactions().await.is_empty());
    assert!(node_a.pending_transactions().await.is_empty());
}

#[tokio::test]
async fn consensus_adopts_a_longer_valid_peer_chain() {
    let (node_a, addr_a) = spawn_node(1).await;
    let (_node_b, addr_b) = spawn_node(1).await;
    let client = reqwest::Client::new();

    client
        .post(format!("http://{addr_a}/add_node"))
        .json(&peer_body(&addr_b, "node-b"))
        .send()
        .await
        .unwrap();

    // Grow B's chain ahead of A's.
    for _ in 0..2 {
        client
            .get(format!("http://{addr_b}/mine_block"))
            .send()
            .await
            .unwrap();
    }

    let response = client
        .get(format!("http://{addr_a}/chain_consensus"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["replaced"], true);
    assert_eq!(json["length"], 3);

    let snapshot = node_a.chain_snapshot().await;
    assert_eq!(snapshot.length, 3);
    assert!(node_a.validate_local_chain().await);
}

#[tokio::test]
async fn consensus_rejects_a_longer_invalid_chain() {
    let (node_a, addr_a) = spawn_node(1).await;
    let client = reqwest::Client::new();

    // A forged peer: serves a five-block chain with one broken link.
    let mut forged = Blockchain::new(1);
    for i in 0..4 {
        let tx = Transaction::with_id(format!("f{i}"), "mallory", "mallory", 1.0, 0.1);
        let mut block = forged.next_block(vec![tx]);
        let proof = forged.proof_of_work(&mut block);
        assert!(forged.add_block(block, &proof));
    }
    let mut blocks = forged.blocks().to_vec();
    blocks[2].previous_hash = "f".repeat(64);
    let payload = json!({ "chain": blocks, "length": blocks.len() });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let forged_addr = listener.local_addr().unwrap();
    let forged_router = Router::new().route(
        "/get_chain",
        get(move || {
            let payload = payload.clone();
            async move { Json(payload) }
        }),
    );
    tokio::spawn(async move {
        axum::serve(listener, forged_router).await.unwrap();
    });

    client
        .post(format!("http://{addr_a}/add_node"))
        .json(&peer_body(&forged_addr, "mallory"))
        .send()
        .await
        .unwrap();

    let response = client
        .get(format!("http://{addr_a}/chain_consensus"))
        .send()
        .await
        .unwrap();
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["replaced"], false);
    assert_eq!(json["length"], 1);
    assert_eq!(node_a.chain_snapshot().await.length, 1);
}

#[tokio::test]
async fn peer_announcement_floods_the_network() {
    // A knows B; a newcomer announcing itself to A must end up known to B
    // through A's re-broadcast.
    let (node_a, addr_a) = spawn_node(1).await;
    let (node_b, addr_b) = spawn_node(1).await;
    let (node_c, addr_c) = spawn_node(1).await;
    let client = reqwest::Client::new();

    client
        .post(format!("http://{addr_a}/add_node"))
        .json(&peer_body(&addr_b, "node-b"))
        .send()
        .await
        .unwrap();

    let response = client
        .post(format!("http://{addr_a}/add_node"))
        .json(&peer_body(&addr_c, "node-c"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    assert_eq!(node_a.network.peer_count().await, 2);
    let b_peers = node_b.network.peers().await;
    assert!(b_peers.iter().any(|p| p.address == "node-c"));
    // The newcomer itself received the re-broadcast of its own identity.
    let c_peers = node_c.network.peers().await;
    assert!(c_peers.iter().any(|p| p.address == "node-c"));
}

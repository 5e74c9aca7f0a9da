//! REST API server for Embercoin
//!
//! Every route is a thin adapter over the node: it decodes a structured
//! request body into the core types, invokes one core operation and encodes
//! the result back with the appropriate status code. Successful reads and
//! idempotent no-ops answer 200; successful creations answer 201.
//!
//! The route names double as the gossip wire protocol: peers broadcast to
//! `/add_transaction`, `/add_node` and `/transactions_verified` and poll
//! `/get_chain` during consensus, so these paths and their body shapes must
//! stay stable.

use axum::{
    extract::{Request, State},
    http::{self, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::error::ChainError;
use crate::network::Peer;
use crate::node::Node;
use crate::transaction::Transaction;

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Chain(ChainError),
    InvalidInput(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Chain(ChainError::InternalError(msg)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
            ApiError::Chain(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        ApiError::Chain(err)
    }
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
struct AddTransactionRequest {
    transaction: IncomingTransaction,
}

/// A submitted transaction; the id is generated here when the client leaves
/// it out (a gossiping peer always sends one).
#[derive(Deserialize)]
struct IncomingTransaction {
    #[serde(default)]
    id: Option<String>,
    sender: String,
    receiver: String,
    amount: f64,
    fee: f64,
}

impl IncomingTransaction {
    fn into_transaction(self) -> Result<Transaction, ApiError> {
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(ApiError::InvalidInput(
                "Transaction amount must be a non-negative number".to_string(),
            ));
        }
        if !self.fee.is_finite() || self.fee < 0.0 {
            return Err(ApiError::InvalidInput(
                "Transaction fee must be a non-negative number".to_string(),
            ));
        }

        Ok(match self.id {
            Some(id) => Transaction::with_id(id, self.sender, self.receiver, self.amount, self.fee),
            None => Transaction::new(self.sender, self.receiver, self.amount, self.fee),
        })
    }
}

#[derive(Deserialize)]
struct AddNodeRequest {
    node: Peer,
}

#[derive(Deserialize)]
struct TransactionsVerifiedRequest {
    transactions: Vec<Transaction>,
}

// ============================================================================
// Middleware
// ============================================================================

/// Request logging middleware: method, path, status, duration.
async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "api.request"
    );

    response
}

// ============================================================================
// API Server
// ============================================================================

/// Build the API router with all endpoints (also used directly by tests).
pub fn build_api_router(node: Arc<Node>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(vec![http::Method::GET, http::Method::POST, http::Method::OPTIONS])
        .allow_headers(vec![http::header::CONTENT_TYPE]);

    Router::new()
        // Chain endpoints
        .route("/get_chain", get(get_chain))
        .route("/mine_block", get(mine_block))
        .route("/validate_chain", get(validate_chain))
        // Transaction endpoints
        .route("/add_transaction", post(add_transaction))
        .route("/get_unverified_transactions", get(get_unverified_transactions))
        .route("/transactions_verified", post(transactions_verified))
        // Network endpoints
        .route("/add_node", post(add_node))
        .route("/connect_to_network", get(connect_to_network))
        .route("/get_nodes", get(get_nodes))
        // Consensus
        .route("/chain_consensus", get(chain_consensus))
        // System
        .route("/health", get(health_check))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(node)
        .layer(cors)
}

/// Serve the API on an already-bound listener until shutdown.
pub async fn run_api_server(
    node: Arc<Node>,
    listener: tokio::net::TcpListener,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_api_router(node);
    axum::serve(listener, app).await?;
    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn health_check(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let height = node.chain_snapshot().await.length;
    Json(serde_json::json!({
        "status": "healthy",
        "height": height,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn get_chain(State(node): State<Arc<Node>>) -> impl IntoResponse {
    Json(node.chain_snapshot().await)
}

async fn mine_block(State(node): State<Arc<Node>>) -> Result<Response, ApiError> {
    match node.mine().await? {
        Some(block) => Ok((
            StatusCode::CREATED,
            Json(serde_json::json!({
                "message": "Block successfully mined",
                "block": block,
            })),
        )
            .into_response()),
        // The chain advanced while the search ran; nothing was created.
        None => Ok(Json(serde_json::json!({
            "message": "Chain advanced during mining; block discarded",
        }))
        .into_response()),
    }
}

async fn validate_chain(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let valid = node.validate_local_chain().await;
    let message = if valid {
        "The chain is valid"
    } else {
        "The chain is invalid"
    };
    Json(serde_json::json!({ "valid": valid, "message": message }))
}

async fn add_transaction(
    State(node): State<Arc<Node>>,
    Json(body): Json<AddTransactionRequest>,
) -> Result<Response, ApiError> {
    let tx = body.transaction.into_transaction()?;
    match node.submit_transaction(tx).await {
        Ok((index, pool_size)) => Ok((
            StatusCode::CREATED,
            Json(serde_json::json!({
                "message": "Transaction successfully added",
                "index": index,
                "pool_size": pool_size,
            })),
        )
            .into_response()),
        // Idempotent no-op: this node has seen (and propagated) it already.
        Err(ChainError::DuplicateTransaction) => Ok(Json(serde_json::json!({
            "message": "Transaction already known",
        }))
        .into_response()),
        // Rejection value, not a fault: the pool never evicts to make room.
        Err(ChainError::PoolFull) => Ok(Json(serde_json::json!({
            "message": "Mempool full; transaction rejected",
        }))
        .into_response()),
        Err(err) => Err(err.into()),
    }
}

async fn get_unverified_transactions(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let transactions = node.pending_transactions().await;
    Json(serde_json::json!({
        "count": transactions.len(),
        "transactions": transactions,
    }))
}

async fn transactions_verified(
    State(node): State<Arc<Node>>,
    Json(body): Json<TransactionsVerifiedRequest>,
) -> impl IntoResponse {
    let removed = node.remove_verified(body.transactions).await;
    Json(serde_json::json!({
        "removed": removed,
        "message": "Verified transactions processed",
    }))
}

async fn add_node(
    State(node): State<Arc<Node>>,
    Json(body): Json<AddNodeRequest>,
) -> impl IntoResponse {
    if node.network.add_peer(body.node).await {
        (
            StatusCode::CREATED,
            Json(serde_json::json!({ "message": "Node successfully connected" })),
        )
            .into_response()
    } else {
        Json(serde_json::json!({ "message": "Node already known" })).into_response()
    }
}

async fn connect_to_network(State(node): State<Arc<Node>>) -> impl IntoResponse {
    node.network.announce_self().await;
    Json(serde_json::json!({
        "message": "Node identity sent to network",
        "peers": node.network.peer_count().await,
    }))
}

async fn get_nodes(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let peers = node.network.peers().await;
    Json(serde_json::json!({
        "count": peers.len(),
        "peers": peers,
    }))
}

async fn chain_consensus(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let outcome = node.run_consensus().await;
    let message = if outcome.replaced {
        "The chain was replaced by a longer valid peer chain"
    } else {
        "The local chain was kept"
    };
    Json(serde_json::json!({
        "replaced": outcome.replaced,
        "length": outcome.length,
        "message": message,
    }))
}

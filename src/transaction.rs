//! Transaction types for Embercoin
//!
//! A transaction is immutable once created. Two different notions of "the
//! same transaction" are in play and must not be conflated:
//!
//! - **Full value equality** (`PartialEq`): every field matches. This is what
//!   mempool admission uses to reject duplicates.
//! - **Identity equality** ([`Transaction::same_id`]): the `id` field alone.
//!   This is what verified-transaction removal uses, since a peer's copy of a
//!   mined transaction is matched by its identifier.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A payment between two parties, prioritised by the fee the sender attaches.
///
/// Wire field names are fixed: `{id, sender, receiver, amount, fee}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    /// Opaque unique token; a uuid4 with dashes stripped.
    pub id: String,
    pub sender: String,
    pub receiver: String,
    pub amount: f64,
    /// Paid to the miner that includes this transaction; determines mempool order.
    pub fee: f64,
}

impl Transaction {
    /// Create a transaction with a freshly generated identifier.
    pub fn new(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: f64,
        fee: f64,
    ) -> Self {
        Transaction {
            id: Uuid::new_v4().simple().to_string(),
            sender: sender.into(),
            receiver: receiver.into(),
            amount,
            fee,
        }
    }

    /// Create a transaction with a caller-provided identifier, as received
    /// from a peer or an API client.
    pub fn with_id(
        id: impl Into<String>,
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: f64,
        fee: f64,
    ) -> Self {
        Transaction {
            id: id.into(),
            sender: sender.into(),
            receiver: receiver.into(),
            amount,
            fee,
        }
    }

    /// Identity comparison: same `id`, regardless of the other fields.
    pub fn same_id(&self, other: &Transaction) -> bool {
        self.id == other.id
    }
}

impl std::fmt::Display for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} sent {} to {} for a fee of {} (id {})",
            self.sender, self.amount, self.receiver, self.fee, self.id
        )
    }
}

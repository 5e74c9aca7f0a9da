//! Transaction mempool
//!
//! Holds pending transactions ordered by fee, descending. The pool is bounded
//! by `max_pool_size`; existing entries are never evicted to make room for new
//! arrivals. Mining candidates are the first `max_per_block` entries, exposed
//! without removal so they stay visible until a block is actually admitted.

use crate::error::{ChainError, Result};
use crate::transaction::Transaction;
use std::collections::HashSet;

pub struct Mempool {
    transactions: Vec<Transaction>,
    /// Maximum number of transactions a mined block may contain.
    max_per_block: usize,
    /// Maximum number of transactions the pool will hold.
    max_pool_size: usize,
}

impl Mempool {
    pub fn new(max_per_block: usize, max_pool_size: usize) -> Self {
        Mempool {
            transactions: Vec::new(),
            max_per_block,
            max_pool_size,
        }
    }

    /// Insert one transaction at its fee-ordered position.
    ///
    /// The scan runs from the front and stops at the first entry whose fee is
    /// less than or equal to the new fee, so among equal fees the most recent
    /// arrival sits ahead of older ones. This differs from the tie-break of
    /// [`insert_multiple`](Self::insert_multiple) and is intentional.
    ///
    /// Returns the insertion index and the new pool size.
    pub fn insert_single(&mut self, tx: Transaction) -> Result<(usize, usize)> {
        if self.transactions.len() + 1 > self.max_pool_size {
            return Err(ChainError::PoolFull);
        }
        if self.transactions.contains(&tx) {
            return Err(ChainError::DuplicateTransaction);
        }

        let index = self
            .transactions
            .iter()
            .position(|existing| tx.fee >= existing.fee)
            .unwrap_or(self.transactions.len());
        self.transactions.insert(index, tx);
        Ok((index, self.transactions.len()))
    }

    /// Insert a batch of transactions and re-sort the whole pool by fee,
    /// descending. The stable sort leaves earlier-pooled entries ahead of the
    /// batch among equal fees, the opposite tie-break of `insert_single`.
    ///
    /// Returns the new pool size.
    pub fn insert_multiple(&mut self, txs: Vec<Transaction>) -> Result<usize> {
        if self.transactions.len() + txs.len() > self.max_pool_size {
            return Err(ChainError::PoolFull);
        }

        self.transactions.extend(txs);
        self.transactions
            .sort_by(|a, b| b.fee.total_cmp(&a.fee));
        Ok(self.transactions.len())
    }

    /// Remove every pooled transaction whose id appears in `txs`.
    ///
    /// Returns whether at least one entry was removed. Callers gate
    /// re-broadcast of the removal event on this, which is what stops a
    /// removal notice from bouncing between peers forever.
    pub fn remove_verified(&mut self, txs: &[Transaction]) -> bool {
        let ids: HashSet<&str> = txs.iter().map(|tx| tx.id.as_str()).collect();
        let before = self.transactions.len();
        self.transactions.retain(|tx| !ids.contains(tx.id.as_str()));
        self.transactions.len() < before
    }

    /// The first `max_per_block` entries, cloned; the pool is not mutated.
    pub fn top_candidates(&self) -> Vec<Transaction> {
        self.transactions
            .iter()
            .take(self.max_per_block)
            .cloned()
            .collect()
    }

    /// Position of a transaction in the pool, matched by id.
    pub fn transaction_index(&self, id: &str) -> Option<usize> {
        self.transactions.iter().position(|tx| tx.id == id)
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}
